//! Raw captures and where they come from.
//!
//! A [`CaptureSource`] hands the pipeline a batch of [`RawCapture`]s: decoded
//! screenshots tagged with a logical name, a page number, an optional state
//! and their placement on the page. The browser side that produces the
//! screenshots is somebody else's job; the shipped [`ManifestSource`] reads
//! them back from disk via a `captures.json` manifest:
//!
//! ```json
//! { "captures": [
//!   { "file": "pages/00_main.png", "kind": "page", "name": "main", "page": 0 },
//!   { "file": "elements/led_on.png", "kind": "element", "name": "led_on",
//!     "page": 0, "state": "on", "rect": { "x": 10, "y": 20, "width": 32, "height": 32 } }
//! ] }
//! ```
//!
//! File paths are relative to the manifest. A malformed manifest is fatal;
//! an individual file that cannot be decoded only rejects that capture.

use crate::imaging::PixelLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILENAME: &str = "captures.json";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Axis-aligned placement in page pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn contained_in(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= width as i64 && self.bottom() <= height as i64
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Page,
    Element,
}

/// One decoded screenshot, immutable once created.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub name: String,
    pub kind: CaptureKind,
    pub page: u32,
    pub state: Option<String>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    /// Top-down rows in `layout`, no padding.
    pub pixels: Vec<u8>,
    pub rect: Rect,
}

impl RawCapture {
    /// Name used in reports: `name` or `name:state`.
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}:{}", self.name, state),
            None => self.name.clone(),
        }
    }
}

/// A capture the source could not produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCapture {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureBatch {
    pub captures: Vec<RawCapture>,
    pub rejected: Vec<RejectedCapture>,
}

impl From<Vec<RawCapture>> for CaptureBatch {
    fn from(captures: Vec<RawCapture>) -> Self {
        Self {
            captures,
            rejected: Vec::new(),
        }
    }
}

/// Producer of raw captures.
pub trait CaptureSource {
    fn load(&self) -> Result<CaptureBatch, CaptureError>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    captures: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    file: PathBuf,
    kind: CaptureKind,
    name: String,
    page: u32,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    rect: Option<Rect>,
}

/// Reads captures listed in a JSON manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, base: &Path, entry: ManifestEntry) -> Result<RawCapture, RejectedCapture> {
        let reject = |reason: String| RejectedCapture {
            name: entry.name.clone(),
            reason,
        };
        let file = base.join(&entry.file);
        let img = image::ImageReader::open(&file)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| reject(format!("{}: {e}", file.display())))?
            .decode()
            .map_err(|e| reject(format!("{}: {e}", file.display())))?;

        let (width, height) = (img.width(), img.height());
        let rect = match (entry.rect, entry.kind) {
            (Some(rect), _) => rect,
            (None, CaptureKind::Page) => Rect::new(0, 0, width, height),
            (None, CaptureKind::Element) => {
                return Err(reject("element capture has no rect".into()));
            }
        };

        Ok(RawCapture {
            layout: PixelLayout::from_color_type(img.color()),
            pixels: img.as_bytes().to_vec(),
            name: entry.name,
            kind: entry.kind,
            page: entry.page,
            state: entry.state,
            width,
            height,
            rect,
        })
    }
}

impl CaptureSource for ManifestSource {
    fn load(&self) -> Result<CaptureBatch, CaptureError> {
        let content = fs::read_to_string(&self.path).map_err(|source| CaptureError::Io {
            path: self.path.clone(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|source| CaptureError::Manifest {
                path: self.path.clone(),
                source,
            })?;
        let base = self.path.parent().unwrap_or(Path::new("."));

        let mut batch = CaptureBatch::default();
        for entry in manifest.captures {
            match self.decode(base, entry) {
                Ok(capture) => batch.captures.push(capture),
                Err(rejected) => {
                    tracing::warn!(name = %rejected.name, reason = %rejected.reason, "Capture rejected");
                    batch.rejected.push(rejected);
                }
            }
        }
        tracing::debug!(
            manifest = %self.path.display(),
            loaded = batch.captures.len(),
            rejected = batch.rejected.len(),
            "Manifest loaded"
        );
        Ok(batch)
    }
}
