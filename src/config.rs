//! Project configuration module.
//!
//! Handles loading and validating the project `dgus-pack.toml`. Every table
//! carries serde defaults, so a project file only needs the keys it wants to
//! change.
//!
//! ## Configuration Options
//!
//! ```toml
//! name = "Demo HMI"          # Shown in the guide texts
//! resolution = [1024, 768]   # Display resolution, page captures must match
//! bmp_depth = 24             # Only 24 is accepted by the display firmware
//! background = [26, 26, 26]  # Opaque color transparent pixels are composited over
//!
//! [pages.0]
//! name = "main"              # Page file stem: 00_main.bmp
//! title = "Main screen"      # Optional, used in guides and templates
//!
//! [page_mapping]
//! 0 = "00.bmp"               # Page number → DWIN_SET file name
//!
//! [touch_areas.main.btn_start]
//! x = 10
//! y = 20
//! width = 120
//! height = 48
//!
//! [element_states.led_power]
//! page = 0
//! states = ["off", "on"]
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::capture::Rect;
use crate::pages::is_plain_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default project file name looked up by the CLI.
pub const CONFIG_FILENAME: &str = "dgus-pack.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `dgus-pack.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name for display purposes.
    pub name: String,
    /// Target display resolution as `[width, height]`.
    pub resolution: [u32; 2],
    /// Output color depth. The firmware only accepts 24.
    pub bmp_depth: u16,
    /// RGB color that alpha is composited over during normalization.
    pub background: [u8; 3],
    /// Page number (as a string key) → page description.
    pub pages: BTreeMap<String, PageConfig>,
    /// Page number (as a string key) → DWIN_SET output file name.
    pub page_mapping: BTreeMap<String, String>,
    /// Page name → element name → touch rectangle, copied verbatim into guides.
    pub touch_areas: BTreeMap<String, BTreeMap<String, Rect>>,
    /// Element name → states captured for it.
    pub element_states: BTreeMap<String, ElementStates>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed Project".to_string(),
            resolution: [1024, 768],
            bmp_depth: 24,
            background: [26, 26, 26],
            pages: BTreeMap::new(),
            page_mapping: BTreeMap::new(),
            touch_areas: BTreeMap::new(),
            element_states: BTreeMap::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// One display page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    pub name: String,
    #[serde(default)]
    pub title: String,
}

/// States captured for a multi-state element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ElementStates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub states: Vec<String>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel normalization workers.
    /// When absent, defaults to the number of CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

impl ProjectConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bmp_depth != 24 {
            return Err(ConfigError::Validation(format!(
                "bmp_depth must be 24 (got {})",
                self.bmp_depth
            )));
        }
        if self.resolution[0] == 0 || self.resolution[1] == 0 {
            return Err(ConfigError::Validation(
                "resolution values must be non-zero".into(),
            ));
        }
        check_page_keys("pages", self.pages.keys())?;
        check_page_keys("page_mapping", self.page_mapping.keys())?;
        for (key, page) in &self.pages {
            if !is_plain_name(&page.name) {
                return Err(ConfigError::Validation(format!(
                    "pages.{key}.name must be a plain file name (got {:?})",
                    page.name
                )));
            }
        }
        for (key, target) in &self.page_mapping {
            if !is_plain_name(target.trim()) {
                return Err(ConfigError::Validation(format!(
                    "page_mapping.{key} must be a plain file name (got {target:?})"
                )));
            }
        }
        Ok(())
    }

    /// Sorted page numbers declared under `[pages]`.
    pub fn page_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self
            .pages
            .keys()
            .filter_map(|k| k.parse().ok())
            .collect();
        numbers.sort_unstable();
        numbers
    }

    /// Page name, or `page{N}` when the page is not configured.
    pub fn page_name(&self, page: u32) -> String {
        self.pages
            .get(&page.to_string())
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("page{page}"))
    }

    /// Page title if one is configured and non-empty.
    pub fn page_title(&self, page: u32) -> Option<&str> {
        self.pages
            .get(&page.to_string())
            .map(|p| p.title.as_str())
            .filter(|t| !t.is_empty())
    }

    /// The page mapping keyed by page number.
    pub fn page_mapping(&self) -> BTreeMap<u32, String> {
        self.page_mapping
            .iter()
            .filter_map(|(k, v)| k.parse().ok().map(|n| (n, v.trim().to_string())))
            .collect()
    }

    /// Touch areas configured for a page, by page name.
    pub fn touch_areas_for_page(&self, page_name: &str) -> Option<&BTreeMap<String, Rect>> {
        self.touch_areas.get(page_name).filter(|areas| !areas.is_empty())
    }
}

fn parse_page_key(table: &str, key: &str) -> Result<u32, ConfigError> {
    key.parse().map_err(|_| {
        ConfigError::Validation(format!("{table} keys must be page numbers (got {key:?})"))
    })
}

/// Every key parses as a page number and no two keys name the same page.
fn check_page_keys<'a>(
    table: &str,
    keys: impl IntoIterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    let mut seen: HashMap<u32, &str> = HashMap::new();
    for key in keys {
        let page = parse_page_key(table, key)?;
        if let Some(first) = seen.insert(page, key) {
            return Err(ConfigError::Validation(format!(
                "{table} keys {first:?} and {key:?} both name page {page}"
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse project TOML and validate it.
pub fn parse_config(text: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load the project file at `path`, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    parse_config(&fs::read_to_string(path)?)
}

/// Returns a fully-commented stock `dgus-pack.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# dgus-pack Project Configuration
# ================================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Project name, shown in the generated guides.
name = "Unnamed Project"

# Display resolution [width, height]. Page captures of a different size
# are packaged but reported as a resolution mismatch.
resolution = [1024, 768]

# Output color depth. The display firmware only accepts 24-bit BMP.
bmp_depth = 24

# Opaque RGB color that transparent capture pixels are composited over.
background = [26, 26, 26]

# ---------------------------------------------------------------------------
# Pages: page number -> name (file stem NN_name.bmp) and optional title
# ---------------------------------------------------------------------------
# [pages.0]
# name = "main"
# title = "Main screen"

# ---------------------------------------------------------------------------
# Page mapping: page number -> file name inside dgus/DWIN_SET/
# Every captured page must have an entry; two pages may not share a file.
# ---------------------------------------------------------------------------
# [page_mapping]
# 0 = "00.bmp"

# ---------------------------------------------------------------------------
# Touch areas per page name, copied verbatim into touch_areas_guide.txt.
# Also used for the template overlay when a page has no element captures.
# ---------------------------------------------------------------------------
# [touch_areas.main.btn_start]
# x = 10
# y = 20
# width = 120
# height = 48

# ---------------------------------------------------------------------------
# Multi-state elements, listed in the guides.
# ---------------------------------------------------------------------------
# [element_states.led_power]
# page = 0
# states = ["off", "on"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel normalization workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ProjectConfig::default();
        assert_eq!(config.name, "Unnamed Project");
        assert_eq!(config.resolution, [1024, 768]);
        assert_eq!(config.bmp_depth, 24);
        assert_eq!(config.background, [26, 26, 26]);
        assert!(config.pages.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
name = "Oven Panel"

[pages.0]
name = "main"

[pages.1]
name = "settings"
title = "Settings"

[page_mapping]
0 = "00.bmp"
1 = "01.bmp"
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.name, "Oven Panel");
        // Defaults preserved
        assert_eq!(config.resolution, [1024, 768]);
        assert_eq!(config.page_numbers(), vec![0, 1]);
        assert_eq!(config.page_name(1), "settings");
        assert_eq!(config.page_title(0), None);
        assert_eq!(config.page_title(1), Some("Settings"));
    }

    #[test]
    fn page_numbers_sort_numerically() {
        let toml = r#"
[pages.10]
name = "ten"
[pages.2]
name = "two"
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.page_numbers(), vec![2, 10]);
    }

    #[test]
    fn unknown_page_falls_back_to_generated_name() {
        let config = ProjectConfig::default();
        assert_eq!(config.page_name(7), "page7");
    }

    #[test]
    fn page_mapping_is_keyed_by_number() {
        let toml = r#"
[page_mapping]
0 = "00.bmp"
3 = " 03.bmp "
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        let mapping = config.page_mapping();
        assert_eq!(mapping.get(&0).map(String::as_str), Some("00.bmp"));
        assert_eq!(mapping.get(&3).map(String::as_str), Some("03.bmp"));
    }

    #[test]
    fn touch_areas_parse_into_rects() {
        let toml = r#"
[touch_areas.main.btn_start]
x = 10
y = 20
width = 120
height = 48
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        let areas = config.touch_areas_for_page("main").unwrap();
        assert_eq!(areas["btn_start"], Rect::new(10, 20, 120, 48));
        assert!(config.touch_areas_for_page("settings").is_none());
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r#"
name = "x"
colour_depth = 16
"#;
        let result: Result<ProjectConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_non_24_bit_depth() {
        let config = ProjectConfig {
            bmp_depth: 16,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_resolution() {
        let config = ProjectConfig {
            resolution: [0, 600],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_numeric_mapping_key() {
        let mut config = ProjectConfig::default();
        config
            .page_mapping
            .insert("main".to_string(), "00.bmp".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("page numbers"));
    }

    #[test]
    fn validate_rejects_mapping_with_path_separator() {
        let mut config = ProjectConfig::default();
        config
            .page_mapping
            .insert("0".to_string(), "../00.bmp".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_two_keys_for_one_page() {
        let err = parse_config(
            r#"
[page_mapping]
0 = "00.bmp"
00 = "home.bmp"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both name page 0"), "{err}");

        let err = parse_config("[pages.1]\nname = \"a\"\n[pages.01]\nname = \"b\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn validate_rejects_page_name_with_path_components() {
        let err = parse_config("[pages.0]\nname = \"../main\"\n").unwrap_err();
        assert!(err.to_string().contains("pages.0.name"), "{err}");
    }

    #[test]
    fn nested_tables_keep_defaults_for_missing_keys() {
        let config = parse_config("[processing]\n").unwrap();
        assert_eq!(config.processing.max_processes, None);
        assert_eq!(config.resolution, [1024, 768]);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config.resolution, [1024, 768]);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
resolution = [800, 480]

[processing]
max_processes = 2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.resolution, [800, 480]);
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.background, [26, 26, 26]);
    }

    #[test]
    fn load_config_surfaces_validation_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "bmp_depth = 32\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: ProjectConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = ProjectConfig::default();
        assert_eq!(config.name, defaults.name);
        assert_eq!(config.resolution, defaults.resolution);
        assert_eq!(config.background, defaults.background);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert!(effective_threads(&config) >= 1);
    }
}
