//! Checks an existing output tree against the firmware bitmap convention.
//!
//! Every `.bmp` under the root is parsed with [`imaging::verify`]. Files in a
//! `pages/` or `DWIN_SET/` directory are full display pages and must also
//! match the configured resolution.

use crate::imaging;
use crate::package::{DWIN_SET_DIR, PAGES_DIR};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Ok { width: u32, height: u32 },
    Invalid(String),
    WrongResolution { actual: (u32, u32), expected: (u32, u32) },
}

#[derive(Debug, Clone)]
pub struct FileCheck {
    /// Relative to the verified root.
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub files: Vec<FileCheck>,
}

impl VerifyReport {
    pub fn passed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Ok { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.passed()
    }

    pub fn is_ok(&self) -> bool {
        self.failed() == 0
    }
}

fn is_page_file(relative: &Path) -> bool {
    relative
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|dir| dir == PAGES_DIR || dir == DWIN_SET_DIR)
}

fn check_file(path: &Path, relative: &Path, resolution: (u32, u32)) -> FileStatus {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return FileStatus::Invalid(e.to_string()),
    };
    match imaging::verify(&bytes) {
        Err(e) => FileStatus::Invalid(e.to_string()),
        Ok(bmp) if is_page_file(relative) && bmp.size() != resolution => {
            FileStatus::WrongResolution {
                actual: bmp.size(),
                expected: resolution,
            }
        }
        Ok(bmp) => FileStatus::Ok {
            width: bmp.width(),
            height: bmp.height(),
        },
    }
}

/// Verify every `.bmp` under `root`, in path order.
pub fn verify_tree(root: &Path, resolution: (u32, u32)) -> Result<VerifyReport, VerifyError> {
    let mut report = VerifyReport::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| VerifyError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        let is_bmp = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bmp"));
        if !entry.file_type().is_file() || !is_bmp {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        let status = check_file(entry.path(), &relative, resolution);
        if !matches!(status, FileStatus::Ok { .. }) {
            tracing::warn!(path = %relative.display(), ?status, "Verification failed");
        }
        report.files.push(FileCheck {
            path: relative,
            status,
        });
    }
    Ok(report)
}
