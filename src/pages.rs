//! Full-page captures to numbered display-page files.
//!
//! Each captured page is written twice: under its project name
//! (`NN_name.bmp`) in `pages/`, and under the file name the page mapping
//! assigns it in `DWIN_SET/`. Pages are never deduplicated. The mapping is
//! checked as a whole before anything is produced, so a bad mapping yields
//! an error and no page files at all.

use crate::imaging::NormalizedBitmap;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Page {page} was captured but has no entry in the page mapping")]
    MissingMapping { page: u32 },
    #[error("Pages {first} and {second} both map to {target}")]
    DuplicateTarget {
        target: String,
        first: u32,
        second: u32,
    },
    #[error("Page {page} name {name:?} is not a plain file name")]
    InvalidName { page: u32, name: String },
    #[error("Page {page} was captured more than once ({first}, {second})")]
    DuplicatePage {
        page: u32,
        first: String,
        second: String,
    },
}

/// A normalized full-page capture.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub page: u32,
    pub name: String,
    pub bitmap: NormalizedBitmap,
}

#[derive(Debug, Clone)]
pub struct PageFile {
    pub page: u32,
    pub name: String,
    /// `NN_name.bmp`
    pub source_name: String,
    /// Mapped DWIN_SET file name.
    pub target_name: String,
    pub bitmap: NormalizedBitmap,
}

/// Append `.bmp` unless the name already ends with it (any case).
pub fn normalize_target(name: &str) -> String {
    let name = name.trim();
    if name.to_ascii_lowercase().ends_with(".bmp") {
        name.to_string()
    } else {
        format!("{name}.bmp")
    }
}

/// True for a single path component: non-empty, no separators, not `.` or `..`.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

pub fn source_file_name(page: u32, name: &str) -> String {
    format!("{page:02}_{name}.bmp")
}

pub fn assemble(
    captures: Vec<PageCapture>,
    mapping: &BTreeMap<u32, String>,
) -> Result<Vec<PageFile>, AssembleError> {
    let mut targets: HashMap<String, u32> = HashMap::new();
    for (&page, name) in mapping {
        let key = normalize_target(name).to_ascii_lowercase();
        if let Some(&first) = targets.get(&key) {
            return Err(AssembleError::DuplicateTarget {
                target: normalize_target(name),
                first,
                second: page,
            });
        }
        targets.insert(key, page);
    }

    let mut by_page: BTreeMap<u32, PageCapture> = BTreeMap::new();
    for capture in captures {
        if !is_plain_name(&capture.name) {
            return Err(AssembleError::InvalidName {
                page: capture.page,
                name: capture.name,
            });
        }
        if let Some(existing) = by_page.get(&capture.page) {
            let (first, second) = if existing.name <= capture.name {
                (existing.name.clone(), capture.name)
            } else {
                (capture.name, existing.name.clone())
            };
            return Err(AssembleError::DuplicatePage {
                page: capture.page,
                first,
                second,
            });
        }
        by_page.insert(capture.page, capture);
    }

    if let Some(&page) = by_page.keys().find(|p| !mapping.contains_key(p)) {
        return Err(AssembleError::MissingMapping { page });
    }

    Ok(by_page
        .into_values()
        .map(|c| PageFile {
            source_name: source_file_name(c.page, &c.name),
            target_name: normalize_target(&mapping[&c.page]),
            page: c.page,
            name: c.name,
            bitmap: c.bitmap,
        })
        .collect())
}
