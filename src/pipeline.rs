//! Capture batch to in-memory package.
//!
//! ```text
//! RawCapture* ──par──▶ normalize ──sort──▶ dedup ──▶ bucket ─┐
//!                                    └───▶ assemble pages ────┼──▶ Package
//!                                          render templates ──┘
//! ```
//!
//! Normalization is the only per-capture work and runs on the rayon pool.
//! Its results are sorted by (kind, page, name, state) before anything
//! order-sensitive happens, so the package does not depend on the order the
//! source produced captures in. Per-capture failures are collected in the
//! [`RunSummary`]; a broken page mapping aborts the run.

use crate::bucket::{self, SizeKey};
use crate::capture::{CaptureBatch, CaptureError, CaptureKind, CaptureSource, RawCapture, Rect};
use crate::config::ProjectConfig;
use crate::dedup::ContentDeduplicator;
use crate::guides;
use crate::imaging::{self, CodecError, NormalizedBitmap, OutOfBoundsWarning, PixelLayout, PlacedElement};
use crate::package::{Guides, Package, TemplateFile};
use crate::pages::{self, AssembleError, PageCapture, PageFile};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Page assembly failed: {0}")]
    Assemble(#[from] AssembleError),
    #[error("Template rendering failed for page {page}: {source}")]
    Template { page: u32, source: CodecError },
}

/// A capture that did not make it into the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub name: String,
    pub reason: String,
}

/// A capture whose source layout had to be converted to 24-bit RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub name: String,
    pub from: PixelLayout,
}

/// Several logical names sharing one icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedGroup {
    pub size: SizeKey,
    pub index: usize,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    OutOfBounds {
        page: u32,
        warning: OutOfBoundsWarning,
    },
    ResolutionMismatch {
        page: u32,
        name: String,
        actual: (u32, u32),
        expected: (u32, u32),
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { page, warning } => write!(f, "page {page:02}: {warning}"),
            Self::ResolutionMismatch {
                page,
                name,
                actual,
                expected,
            } => write!(
                f,
                "page {page:02} ({name}) is {}x{}, display is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub captures: usize,
    pub pages: usize,
    pub elements: usize,
    pub unique_assets: usize,
    pub buckets: usize,
    pub failures: Vec<AssetFailure>,
    pub conversions: Vec<Conversion>,
    pub merged: Vec<MergedGroup>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub package: Package,
    pub summary: RunSummary,
}

/// A capture after normalization, without its raw pixels.
struct Normalized {
    name: String,
    label: String,
    kind: CaptureKind,
    page: u32,
    state: Option<String>,
    layout: PixelLayout,
    rect: Rect,
    bitmap: NormalizedBitmap,
}

fn normalize_one(capture: RawCapture, background: [u8; 3]) -> Result<Normalized, AssetFailure> {
    let label = capture.label();
    match imaging::normalize(
        &capture.pixels,
        capture.width,
        capture.height,
        capture.layout,
        background,
    ) {
        Ok(bitmap) => Ok(Normalized {
            name: capture.name,
            label,
            kind: capture.kind,
            page: capture.page,
            state: capture.state,
            layout: capture.layout,
            rect: capture.rect,
            bitmap,
        }),
        Err(e) => Err(AssetFailure {
            name: label,
            reason: e.to_string(),
        }),
    }
}

/// Load captures from `source` and run them through the pipeline.
pub fn run_source(
    source: &impl CaptureSource,
    config: &ProjectConfig,
) -> Result<PipelineOutput, PipelineError> {
    let batch = source.load()?;
    run(batch, config)
}

pub fn run(batch: CaptureBatch, config: &ProjectConfig) -> Result<PipelineOutput, PipelineError> {
    let mut summary = RunSummary {
        captures: batch.captures.len() + batch.rejected.len(),
        failures: batch
            .rejected
            .into_iter()
            .map(|r| AssetFailure {
                name: r.name,
                reason: r.reason,
            })
            .collect(),
        ..Default::default()
    };

    let background = config.background;
    let results: Vec<Result<Normalized, AssetFailure>> = batch
        .captures
        .into_par_iter()
        .map(|capture| normalize_one(capture, background))
        .collect();

    let mut normalized = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(n) => normalized.push(n),
            Err(failure) => {
                tracing::warn!(name = %failure.name, reason = %failure.reason, "Capture failed to normalize");
                summary.failures.push(failure);
            }
        }
    }
    normalized.sort_by(|a, b| {
        (a.kind, a.page, &a.name, &a.state).cmp(&(b.kind, b.page, &b.name, &b.state))
    });
    summary.failures.sort_by(|a, b| a.name.cmp(&b.name));

    summary.conversions = normalized
        .iter()
        .filter(|n| n.layout != PixelLayout::Rgb8)
        .map(|n| Conversion {
            name: n.label.clone(),
            from: n.layout,
        })
        .collect();

    // Element placements per page, first capture per name
    let mut placements: BTreeMap<u32, BTreeMap<String, Rect>> = BTreeMap::new();
    let mut page_captures = Vec::new();
    let mut dedup = ContentDeduplicator::new();
    for n in normalized {
        match n.kind {
            CaptureKind::Page => page_captures.push(PageCapture {
                page: n.page,
                name: n.name,
                bitmap: n.bitmap,
            }),
            CaptureKind::Element => {
                summary.elements += 1;
                placements
                    .entry(n.page)
                    .or_default()
                    .entry(n.name)
                    .or_insert(n.rect);
                dedup.add(&n.label, n.bitmap);
            }
        }
    }
    summary.unique_assets = dedup.len();

    let buckets = bucket::bucket(dedup.into_assets());
    summary.buckets = buckets.len();
    for b in buckets.values() {
        for (index, asset) in b.assets.iter().enumerate() {
            if asset.members().len() > 1 {
                summary.merged.push(MergedGroup {
                    size: b.key,
                    index,
                    members: asset.sorted_members().into_iter().map(String::from).collect(),
                });
            }
        }
    }

    let page_files = pages::assemble(page_captures, &config.page_mapping())?;
    summary.pages = page_files.len();

    let expected = (config.resolution[0], config.resolution[1]);
    for file in &page_files {
        let actual = file.bitmap.size();
        if actual != expected {
            summary.warnings.push(Warning::ResolutionMismatch {
                page: file.page,
                name: file.name.clone(),
                actual,
                expected,
            });
        }
    }

    let rendered: Vec<(TemplateFile, Vec<OutOfBoundsWarning>)> = page_files
        .par_iter()
        .map(|file| render_template(file, placements.get(&file.page), config))
        .collect::<Result<_, _>>()?;
    let mut templates = Vec::with_capacity(rendered.len());
    for (template, warnings) in rendered {
        summary
            .warnings
            .extend(warnings.into_iter().map(|warning| Warning::OutOfBounds {
                page: template.page,
                warning,
            }));
        templates.push(template);
    }

    let guides = Guides {
        touch_areas: guides::touch_areas_guide(config),
        pages_info: guides::pages_info(config, &page_files),
        icon_groups: guides::icon_groups_info(&buckets),
    };

    tracing::info!(
        captures = summary.captures,
        pages = summary.pages,
        elements = summary.elements,
        unique = summary.unique_assets,
        failures = summary.failures.len(),
        warnings = summary.warnings.len(),
        "Package assembled"
    );

    Ok(PipelineOutput {
        package: Package {
            pages: page_files,
            buckets,
            templates,
            guides,
        },
        summary,
    })
}

fn render_template(
    file: &PageFile,
    captured: Option<&BTreeMap<String, Rect>>,
    config: &ProjectConfig,
) -> Result<(TemplateFile, Vec<OutOfBoundsWarning>), PipelineError> {
    let areas = captured.filter(|m| !m.is_empty()).or_else(|| {
        config
            .touch_areas_for_page(&config.page_name(file.page))
            .or_else(|| config.touch_areas_for_page(&file.name))
    });
    let elements: Vec<PlacedElement> = areas
        .into_iter()
        .flatten()
        .map(|(name, rect)| PlacedElement {
            name: name.clone(),
            rect: *rect,
        })
        .collect();
    if elements.is_empty() {
        tracing::debug!(page = file.page, "No element placements, template shows the bare page");
    }

    let title = format!(
        "Page {}: {}",
        file.page,
        config.page_title(file.page).unwrap_or(&file.name)
    );
    let rendered = imaging::render(&file.bitmap, &elements, Some(&title))
        .map_err(|source| PipelineError::Template {
            page: file.page,
            source,
        })?;

    Ok((
        TemplateFile {
            page: file.page,
            file_name: file.source_name.clone(),
            bitmap: rendered.bitmap,
        },
        rendered.warnings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{element_capture, page_capture, test_config};

    fn run_ok(captures: Vec<RawCapture>) -> PipelineOutput {
        run(CaptureBatch::from(captures), &test_config()).unwrap()
    }

    // =========================================================================
    // Dedup and bucketing
    // =========================================================================

    #[test]
    fn identical_elements_share_one_icon() {
        let out = run_ok(vec![
            page_capture(0, "main"),
            element_capture("led_on", 0, 32, 32, [0, 255, 0]),
            element_capture("led_alt_on", 0, 32, 32, [0, 255, 0]),
            element_capture("arrow", 0, 16, 16, [200, 200, 200]),
        ]);
        assert_eq!(out.summary.elements, 3);
        assert_eq!(out.summary.unique_assets, 2);
        assert_eq!(out.summary.buckets, 2);
        assert_eq!(
            out.summary.merged,
            vec![MergedGroup {
                size: SizeKey { width: 32, height: 32 },
                index: 0,
                members: vec!["led_alt_on".into(), "led_on".into()],
            }]
        );
        assert_eq!(
            bucket::locate(&out.package.buckets, "arrow"),
            Some((SizeKey { width: 16, height: 16 }, 0))
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let captures = vec![
            page_capture(0, "main"),
            element_capture("b", 0, 8, 8, [2, 0, 0]),
            element_capture("a", 0, 8, 8, [1, 0, 0]),
            element_capture("c", 0, 8, 8, [3, 0, 0]),
            element_capture("d", 0, 8, 8, [1, 0, 0]),
        ];
        let mut reversed = captures.clone();
        reversed.reverse();

        let forward = run_ok(captures);
        let backward = run_ok(reversed);
        for name in ["a", "b", "c", "d"] {
            assert_eq!(
                bucket::locate(&forward.package.buckets, name),
                bucket::locate(&backward.package.buckets, name)
            );
        }
        assert_eq!(forward.summary, backward.summary);
        assert_eq!(
            forward.package.templates[0].bitmap,
            backward.package.templates[0].bitmap
        );
    }

    #[test]
    fn states_are_distinct_members() {
        let mut on = element_capture("led_power", 0, 8, 8, [0, 255, 0]);
        on.state = Some("on".into());
        let mut off = element_capture("led_power", 0, 8, 8, [0, 40, 0]);
        off.state = Some("off".into());
        let out = run_ok(vec![page_capture(0, "main"), on, off]);
        assert!(bucket::locate(&out.package.buckets, "led_power:on").is_some());
        assert!(bucket::locate(&out.package.buckets, "led_power:off").is_some());
    }

    // =========================================================================
    // Failures and conversions
    // =========================================================================

    #[test]
    fn bad_capture_is_isolated() {
        let mut broken = element_capture("broken", 0, 8, 8, [0, 0, 0]);
        broken.pixels.truncate(10);
        let mut deep = element_capture("deep", 0, 8, 8, [0, 0, 0]);
        deep.layout = PixelLayout::Rgb16;
        let out = run_ok(vec![
            page_capture(0, "main"),
            broken,
            deep,
            element_capture("fine", 0, 8, 8, [1, 2, 3]),
        ]);
        assert_eq!(out.summary.captures, 4);
        assert_eq!(out.summary.unique_assets, 1);
        let names: Vec<&str> = out.summary.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["broken", "deep"]);
        assert!(out.summary.failures[1].reason.contains("rgb16"));
    }

    #[test]
    fn rejected_captures_are_reported() {
        let batch = CaptureBatch {
            captures: vec![page_capture(0, "main")],
            rejected: vec![crate::capture::RejectedCapture {
                name: "lost".into(),
                reason: "file not found".into(),
            }],
        };
        let out = run(batch, &test_config()).unwrap();
        assert_eq!(out.summary.captures, 2);
        assert_eq!(out.summary.failures[0].name, "lost");
    }

    #[test]
    fn alpha_sources_are_recorded_as_conversions() {
        let mut rgba = element_capture("glow", 0, 2, 2, [0, 0, 0]);
        rgba.layout = PixelLayout::Rgba8;
        rgba.pixels = vec![255, 0, 0, 128].repeat(4);
        let out = run_ok(vec![page_capture(0, "main"), rgba]);
        assert_eq!(
            out.summary.conversions,
            vec![Conversion {
                name: "glow".into(),
                from: PixelLayout::Rgba8,
            }]
        );
    }

    // =========================================================================
    // Pages and templates
    // =========================================================================

    #[test]
    fn unmapped_page_aborts() {
        let err = run(
            CaptureBatch::from(vec![page_capture(0, "main"), page_capture(2, "extra")]),
            &test_config(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Assemble(AssembleError::MissingMapping { page: 2 })
        ));
    }

    #[test]
    fn page_name_with_path_components_aborts() {
        let err = run(
            CaptureBatch::from(vec![page_capture(0, "x/../../../escaped")]),
            &test_config(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Assemble(AssembleError::InvalidName { page: 0, .. })
        ));
    }

    #[test]
    fn every_page_gets_a_template() {
        let out = run_ok(vec![page_capture(0, "main"), page_capture(1, "settings")]);
        let names: Vec<&str> = out
            .package
            .templates
            .iter()
            .map(|t| t.file_name.as_str())
            .collect();
        assert_eq!(names, ["00_main.bmp", "01_settings.bmp"]);
    }

    #[test]
    fn template_falls_back_to_configured_touch_areas() {
        // No element captures; test config has btn_start at (10,20) on "main"
        let out = run_ok(vec![page_capture(0, "main")]);
        let template = &out.package.templates[0].bitmap;
        assert_eq!(template.pixel(10, 20), imaging::BUTTON_COLOR);
    }

    #[test]
    fn out_of_bounds_element_warns() {
        let mut wide = element_capture("btn_wide", 0, 8, 8, [5, 5, 5]);
        wide.rect = Rect::new(60, 40, 20, 20);
        let out = run_ok(vec![page_capture(0, "main"), wide]);
        assert!(out.summary.warnings.iter().any(|w| matches!(
            w,
            Warning::OutOfBounds { page: 0, warning } if warning.element == "btn_wide"
        )));
    }

    #[test]
    fn page_size_mismatch_warns() {
        let mut small = page_capture(0, "main");
        small.width = 32;
        small.height = 24;
        small.pixels = vec![0; 32 * 24 * 3];
        let out = run_ok(vec![small]);
        let mismatches: Vec<&Warning> = out
            .summary
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::ResolutionMismatch { .. }))
            .collect();
        assert_eq!(
            mismatches,
            vec![&Warning::ResolutionMismatch {
                page: 0,
                name: "main".into(),
                actual: (32, 24),
                expected: (64, 48),
            }]
        );
    }

    #[test]
    fn guides_are_filled_in() {
        let out = run_ok(vec![
            page_capture(0, "main"),
            element_capture("led_on", 0, 8, 8, [0, 255, 0]),
        ]);
        assert!(out.package.guides.pages_info.contains("00_main.bmp"));
        assert!(out.package.guides.touch_areas.contains("btn_start"));
        assert!(out.package.guides.icon_groups.contains("00.bmp <- led_on"));
    }
}
