//! Human-readable guide texts shipped next to the DGUS assets.
//!
//! All three are pure functions of the configuration and the assembled
//! package contents, so they are deterministic and easy to test.

use crate::bucket::{Buckets, icon_file_name};
use crate::config::ProjectConfig;
use crate::pages::{PageFile, normalize_target, source_file_name};
use std::collections::BTreeSet;

const WIDE_RULE: usize = 80;
const RULE: usize = 40;

/// Touch-area tables per page, copied verbatim from the configuration.
pub fn touch_areas_guide(config: &ProjectConfig) -> String {
    let mut lines = vec![
        "=".repeat(WIDE_RULE),
        "TOUCH AREAS CONFIGURATION GUIDE for DGUS Tool".to_string(),
        "=".repeat(WIDE_RULE),
        String::new(),
        format!("Project: {}", config.name),
        format!(
            "Resolution: {}x{}",
            config.resolution[0], config.resolution[1]
        ),
        String::new(),
    ];

    for page in config.page_numbers() {
        let name = config.page_name(page);
        let Some(areas) = config.touch_areas_for_page(&name) else {
            continue;
        };
        let heading = config
            .page_title(page)
            .map(str::to_string)
            .unwrap_or_else(|| name.to_uppercase());
        lines.push(format!("PAGE {page:02} ({heading}):"));
        lines.push("-".repeat(WIDE_RULE));
        lines.push(
            "| Element       | Coordinates | Size      | Action                    |".to_string(),
        );
        lines.push(
            "|---------------|-------------|-----------|---------------------------|".to_string(),
        );
        for (element, r) in areas {
            lines.push(format!(
                "| {element:<13} | ({:4},{:4})  | {:3}x{:3}   | {:<25} |",
                r.x, r.y, r.width, r.height, ""
            ));
        }
        lines.push(String::new());
    }

    lines.extend([
        "=".repeat(WIDE_RULE),
        "VARIABLE ICON ARCHITECTURE".to_string(),
        "=".repeat(WIDE_RULE),
        String::new(),
        "For multi-state elements (buttons, indicators):".to_string(),
        "1. Use the clean page image as the background".to_string(),
        "2. Add a Variable Icon control at the element position".to_string(),
        "3. Point it at the element's size folder under ICON/".to_string(),
        "4. Add a Touch Area for interaction".to_string(),
        String::new(),
        "Element states:".to_string(),
    ]);
    for (element, states) in &config.element_states {
        lines.push(format!("  - {element}: {}", states.states.join(", ")));
    }
    lines.push(String::new());
    lines.push("=".repeat(WIDE_RULE));

    join(lines)
}

/// Page list with source and DGUS file names, plus element states.
///
/// Lists every configured page and every captured one.
pub fn pages_info(config: &ProjectConfig, pages: &[PageFile]) -> String {
    let mut lines = vec![
        "DWIN DGUS Page Configuration".to_string(),
        "=".repeat(RULE),
        String::new(),
        format!("Project: {}", config.name),
        format!(
            "Resolution: {}x{}",
            config.resolution[0], config.resolution[1]
        ),
        format!("Color Depth: {}-bit BMP", config.bmp_depth),
        String::new(),
        "Pages:".to_string(),
        "-".repeat(RULE),
    ];

    let mapping = config.page_mapping();
    let numbers: BTreeSet<u32> = config
        .page_numbers()
        .into_iter()
        .chain(pages.iter().map(|p| p.page))
        .collect();

    for page in numbers {
        let captured = pages.iter().find(|p| p.page == page);
        let (source, dgus) = match captured {
            Some(p) => (p.source_name.clone(), p.target_name.clone()),
            None => (
                source_file_name(page, &config.page_name(page)),
                mapping
                    .get(&page)
                    .map(|t| normalize_target(t))
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
        };
        let heading = match (config.page_title(page), captured) {
            (Some(title), _) => title.to_string(),
            (None, Some(p)) => p.name.clone(),
            (None, None) => config.page_name(page),
        };
        lines.push(format!("Page {page:02}: {heading}"));
        lines.push(format!("  Source: {source}"));
        lines.push(format!("  DGUS:   {dgus}"));
        if captured.is_none() {
            lines.push("  (not captured)".to_string());
        }
        lines.push(String::new());
    }

    lines.push("Element States:".to_string());
    lines.push("-".repeat(RULE));
    for (element, states) in &config.element_states {
        let page = states
            .page
            .map(|p| format!(" (page {p:02})"))
            .unwrap_or_default();
        lines.push(format!("  {element}{page}: {}", states.states.join(", ")));
    }

    join(lines)
}

/// Every size folder with its icons and the names merged into each.
pub fn icon_groups_info(buckets: &Buckets) -> String {
    let mut lines = vec![
        "DGUS ICON Groups Information".to_string(),
        "=".repeat(60),
        String::new(),
        "Unique elements grouped by exact size, one folder per size.".to_string(),
        "Folder names are <width>x<height>; files are numbered 00.bmp, 01.bmp, ...".to_string(),
        "For a Variable Icon, use the folder of the element size and its index.".to_string(),
        String::new(),
    ];

    for bucket in buckets.values() {
        lines.push(format!(
            "Folder {}/ ({} icons)",
            bucket.label(),
            bucket.assets.len()
        ));
        lines.push("-".repeat(RULE));
        for (i, asset) in bucket.assets.iter().enumerate() {
            lines.push(format!(
                "  {} <- {}",
                icon_file_name(i),
                asset.sorted_members().join(", ")
            ));
        }
        lines.push(String::new());
    }

    join(lines)
}

fn join(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
