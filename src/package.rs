//! Writes an assembled package to disk.
//!
//! ```text
//! <root>/
//! ├── pages/<NN_name>.bmp
//! └── dgus/
//!     ├── DWIN_SET/<mapped>.bmp
//!     ├── ICON/<w>x<h>/<NN>.bmp
//!     ├── ICON/icon_groups_info.txt
//!     ├── templates/<NN_name>.bmp
//!     ├── touch_areas_guide.txt
//!     └── pages_info.txt
//! ```
//!
//! Categories are written in a fixed order. Each category first removes the
//! directory it owns, so nothing from an earlier run into the same root
//! survives next to the new files. Every bitmap is encoded and
//! re-verified before it touches the disk, and every file goes to a
//! temporary file in its target directory that is renamed into place once
//! complete. A failure stops the remaining files of its category; the other
//! categories still run, and the report says exactly what was written.

use crate::bucket::{Buckets, icon_file_name};
use crate::imaging::{self, NormalizedBitmap};
use crate::pages::PageFile;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const PAGES_DIR: &str = "pages";
pub const DGUS_DIR: &str = "dgus";
pub const DWIN_SET_DIR: &str = "DWIN_SET";
pub const ICON_DIR: &str = "ICON";
pub const TEMPLATES_DIR: &str = "templates";

/// A rendered template for one page.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub page: u32,
    /// `NN_name.bmp`
    pub file_name: String,
    pub bitmap: NormalizedBitmap,
}

#[derive(Debug, Clone, Default)]
pub struct Guides {
    pub touch_areas: String,
    pub pages_info: String,
    pub icon_groups: String,
}

/// Everything that ends up on disk, fully built in memory.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub pages: Vec<PageFile>,
    pub buckets: Buckets,
    pub templates: Vec<TemplateFile>,
    pub guides: Guides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCategory {
    Pages,
    DwinSet,
    Icons,
    Templates,
    Guides,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 5] = [
        Self::Pages,
        Self::DwinSet,
        Self::Icons,
        Self::Templates,
        Self::Guides,
    ];

    /// Directory this category owns, relative to the output root.
    fn generated_dir(self) -> Option<PathBuf> {
        let dgus = Path::new(DGUS_DIR);
        match self {
            Self::Pages => Some(PathBuf::from(PAGES_DIR)),
            Self::DwinSet => Some(dgus.join(DWIN_SET_DIR)),
            Self::Icons => Some(dgus.join(ICON_DIR)),
            Self::Templates => Some(dgus.join(TEMPLATES_DIR)),
            Self::Guides => None,
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pages => "pages",
            Self::DwinSet => "DWIN_SET",
            Self::Icons => "icons",
            Self::Templates => "templates",
            Self::Guides => "guides",
        })
    }
}

#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

#[derive(Debug)]
pub struct CategoryReport {
    pub category: ArtifactCategory,
    /// Files written before any failure, relative to the output root.
    pub written: Vec<PathBuf>,
    pub failure: Option<WriteFailure>,
}

#[derive(Debug)]
pub struct WriteReport {
    pub root: PathBuf,
    pub categories: Vec<CategoryReport>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.categories.iter().all(|c| c.failure.is_none())
    }

    pub fn files_written(&self) -> usize {
        self.categories.iter().map(|c| c.written.len()).sum()
    }

    pub fn category(&self, category: ArtifactCategory) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }
}

enum Contents<'a> {
    Bitmap(&'a NormalizedBitmap),
    Text(&'a str),
}

/// Files of one category, as (path relative to root, contents).
fn artifacts(package: &Package, category: ArtifactCategory) -> Vec<(PathBuf, Contents<'_>)> {
    let dgus = Path::new(DGUS_DIR);
    match category {
        ArtifactCategory::Pages => package
            .pages
            .iter()
            .map(|p| (Path::new(PAGES_DIR).join(&p.source_name), Contents::Bitmap(&p.bitmap)))
            .collect(),
        ArtifactCategory::DwinSet => package
            .pages
            .iter()
            .map(|p| (dgus.join(DWIN_SET_DIR).join(&p.target_name), Contents::Bitmap(&p.bitmap)))
            .collect(),
        ArtifactCategory::Icons => package
            .buckets
            .values()
            .flat_map(|b| {
                let dir = dgus.join(ICON_DIR).join(b.label());
                b.assets
                    .iter()
                    .enumerate()
                    .map(move |(i, a)| (dir.join(icon_file_name(i)), Contents::Bitmap(a.bitmap())))
            })
            .chain(std::iter::once((
                dgus.join(ICON_DIR).join("icon_groups_info.txt"),
                Contents::Text(&package.guides.icon_groups),
            )))
            .collect(),
        ArtifactCategory::Templates => package
            .templates
            .iter()
            .map(|t| (dgus.join(TEMPLATES_DIR).join(&t.file_name), Contents::Bitmap(&t.bitmap)))
            .collect(),
        ArtifactCategory::Guides => vec![
            (
                dgus.join("touch_areas_guide.txt"),
                Contents::Text(&package.guides.touch_areas),
            ),
            (
                dgus.join("pages_info.txt"),
                Contents::Text(&package.guides.pages_info),
            ),
        ],
    }
}

fn encode_verified(bitmap: &NormalizedBitmap) -> io::Result<Vec<u8>> {
    let bytes = imaging::encode(bitmap);
    let reread = imaging::verify(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if reread.fingerprint() != bitmap.fingerprint() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "encoded bitmap does not read back identically",
        ));
    }
    Ok(bytes)
}

/// Write `bytes` to `path` via a temporary file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove `path` and everything below it; a missing directory is fine.
fn clear_dir(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn write_category(package: &Package, category: ArtifactCategory, root: &Path) -> CategoryReport {
    let mut report = CategoryReport {
        category,
        written: Vec::new(),
        failure: None,
    };
    if let Some(dir) = category.generated_dir() {
        let path = root.join(dir);
        if let Err(error) = clear_dir(&path) {
            tracing::error!(%category, path = %path.display(), %error, "Clearing previous output failed");
            report.failure = Some(WriteFailure { path, error });
            return report;
        }
    }
    for (relative, contents) in artifacts(package, category) {
        let path = root.join(&relative);
        let result = match contents {
            Contents::Bitmap(bitmap) => encode_verified(bitmap),
            Contents::Text(text) => Ok(text.as_bytes().to_vec()),
        }
        .and_then(|bytes| write_atomic(&path, &bytes));

        match result {
            Ok(()) => {
                tracing::debug!(path = %relative.display(), "Wrote");
                report.written.push(relative);
            }
            Err(error) => {
                tracing::error!(%category, path = %path.display(), %error, "Write failed");
                report.failure = Some(WriteFailure { path, error });
                break;
            }
        }
    }
    report
}

/// Write every category of `package` under `root`.
pub fn write(package: &Package, root: &Path) -> WriteReport {
    let categories = ArtifactCategory::ALL
        .into_iter()
        .map(|category| {
            let report = write_category(package, category, root);
            tracing::info!(
                %category,
                files = report.written.len(),
                ok = report.failure.is_none(),
                "Category written"
            );
            report
        })
        .collect();
    WriteReport {
        root: root.to_path_buf(),
        categories,
    }
}
