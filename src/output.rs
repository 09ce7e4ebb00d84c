//! CLI output formatting.
//!
//! Output is organized around what ended up in the package, not around files:
//! each page is shown by number and name with its DGUS file as context, each
//! icon by its index within a size folder with the names merged into it.
//!
//! ## Pack
//!
//! ```text
//! Pages
//!     00 main → DWIN_SET/00.bmp
//!         Source: 00_main.bmp
//! Icons
//!     32x32 (2 icons)
//!         00 led_alt_on, led_on
//!         01 led_off
//! Warnings
//!     page 00 (main) is 800x480, display is 1024x600
//! Packed 4 captures: 1 page, 3 elements → 2 unique icons in 1 size group
//! ```
//!
//! ## Write
//!
//! ```text
//! Wrote 11 files to out
//!     pages: 2 files
//!     DWIN_SET: FAILED after 0 files
//!         out/dgus/DWIN_SET/00.bmp: Is a directory (os error 21)
//! ```
//!
//! ## Verify
//!
//! ```text
//! dgus/DWIN_SET/00.bmp: ok 1024x600
//! dgus/ICON/8x8/00.bmp: INVALID Color depth 32 bpp (expected 24)
//! Verified 2 files: 1 ok, 1 failed
//! ```
//!
//! Each `format_*` function is pure and returns lines; `print_*` wrappers
//! write them to stdout.

use crate::bucket::icon_file_name;
use crate::package::{DWIN_SET_DIR, Package, WriteReport};
use crate::pipeline::RunSummary;
use crate::verify::{FileStatus, VerifyReport};

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

// ============================================================================
// Pack
// ============================================================================

pub fn format_run_summary(package: &Package, summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if !package.pages.is_empty() {
        lines.push("Pages".to_string());
        for page in &package.pages {
            lines.push(format!(
                "{}{:02} {} \u{2192} {}/{}",
                indent(1),
                page.page,
                page.name,
                DWIN_SET_DIR,
                page.target_name
            ));
            lines.push(format!("{}Source: {}", indent(2), page.source_name));
        }
    }

    if !package.buckets.is_empty() {
        lines.push("Icons".to_string());
        for bucket in package.buckets.values() {
            lines.push(format!(
                "{}{} ({})",
                indent(1),
                bucket.label(),
                plural(bucket.assets.len(), "icon", "icons")
            ));
            for (i, asset) in bucket.assets.iter().enumerate() {
                let file = icon_file_name(i);
                let index = file.trim_end_matches(".bmp");
                lines.push(format!(
                    "{}{} {}",
                    indent(2),
                    index,
                    asset.sorted_members().join(", ")
                ));
            }
        }
    }

    if !summary.failures.is_empty() {
        lines.push("Failures".to_string());
        for failure in &summary.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.name, failure.reason));
        }
    }

    if !summary.conversions.is_empty() {
        lines.push("Conversions".to_string());
        for conversion in &summary.conversions {
            lines.push(format!(
                "{}{}: {} \u{2192} rgb8",
                indent(1),
                conversion.name,
                conversion.from
            ));
        }
    }

    if !summary.warnings.is_empty() {
        lines.push("Warnings".to_string());
        for warning in &summary.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }

    lines.push(format!(
        "Packed {}: {}, {} \u{2192} {} in {}",
        plural(summary.captures, "capture", "captures"),
        plural(summary.pages, "page", "pages"),
        plural(summary.elements, "element", "elements"),
        plural(summary.unique_assets, "unique icon", "unique icons"),
        plural(summary.buckets, "size group", "size groups"),
    ));

    lines
}

pub fn print_run_summary(package: &Package, summary: &RunSummary) {
    for line in format_run_summary(package, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Write
// ============================================================================

pub fn format_write_report(report: &WriteReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Wrote {} to {}",
        plural(report.files_written(), "file", "files"),
        report.root.display()
    )];
    for category in &report.categories {
        match &category.failure {
            None => lines.push(format!(
                "{}{}: {}",
                indent(1),
                category.category,
                plural(category.written.len(), "file", "files")
            )),
            Some(failure) => {
                lines.push(format!(
                    "{}{}: FAILED after {}",
                    indent(1),
                    category.category,
                    plural(category.written.len(), "file", "files")
                ));
                lines.push(format!(
                    "{}{}: {}",
                    indent(2),
                    failure.path.display(),
                    failure.error
                ));
            }
        }
    }
    lines
}

pub fn print_write_report(report: &WriteReport) {
    for line in format_write_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Verify
// ============================================================================

pub fn format_verify_report(report: &VerifyReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .files
        .iter()
        .map(|f| {
            let status = match &f.status {
                FileStatus::Ok { width, height } => format!("ok {width}x{height}"),
                FileStatus::Invalid(reason) => format!("INVALID {reason}"),
                FileStatus::WrongResolution { actual, expected } => format!(
                    "WRONG SIZE {}x{} (display is {}x{})",
                    actual.0, actual.1, expected.0, expected.1
                ),
            };
            format!("{}: {}", f.path.display(), status)
        })
        .collect();
    lines.push(format!(
        "Verified {}: {} ok, {} failed",
        plural(report.files.len(), "file", "files"),
        report.passed(),
        report.failed()
    ));
    lines
}

pub fn print_verify_report(report: &VerifyReport) {
    for line in format_verify_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
