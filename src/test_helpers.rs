//! Shared test utilities for the dgus-pack test suite.
//!
//! Builders for bitmaps, raw captures and a small project configuration
//! (64x48 display, two pages) that unit tests across modules share.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let config = test_config();
//! let batch = CaptureBatch::from(vec![
//!     page_capture(0, "main"),
//!     element_capture("led_on", 0, 8, 8, [0, 255, 0]),
//! ]);
//! let out = pipeline::run(batch, &config).unwrap();
//! ```

use crate::capture::{CaptureKind, RawCapture, Rect};
use crate::config::{ProjectConfig, parse_config};
use crate::imaging::{self, NormalizedBitmap, PixelLayout};

pub const TEST_WIDTH: u32 = 64;
pub const TEST_HEIGHT: u32 = 48;

const TEST_CONFIG: &str = r#"
name = "Test HMI"
resolution = [64, 48]

[pages.0]
name = "main"
title = "Main screen"

[pages.1]
name = "settings"

[page_mapping]
0 = "00.bmp"
1 = "01.bmp"

[touch_areas.main.btn_start]
x = 10
y = 20
width = 120
height = 48

[element_states.led_power]
page = 0
states = ["off", "on"]
"#;

// =========================================================================
// Config
// =========================================================================

pub fn test_config() -> ProjectConfig {
    parse_config(TEST_CONFIG).unwrap()
}

// =========================================================================
// Bitmaps and captures
// =========================================================================

fn solid_pixels(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    color.repeat((width * height) as usize)
}

/// A normalized bitmap filled with one color.
pub fn solid_bitmap(width: u32, height: u32, color: [u8; 3]) -> NormalizedBitmap {
    imaging::normalize(
        &solid_pixels(width, height, color),
        width,
        height,
        PixelLayout::Rgb8,
        [0, 0, 0],
    )
    .unwrap()
}

/// A full-page RGB capture at the test resolution, shaded by page number.
pub fn page_capture(page: u32, name: &str) -> RawCapture {
    let shade = 40 + (page as u8).wrapping_mul(20);
    RawCapture {
        name: name.to_string(),
        kind: CaptureKind::Page,
        page,
        state: None,
        width: TEST_WIDTH,
        height: TEST_HEIGHT,
        layout: PixelLayout::Rgb8,
        pixels: solid_pixels(TEST_WIDTH, TEST_HEIGHT, [shade; 3]),
        rect: Rect::new(0, 0, TEST_WIDTH, TEST_HEIGHT),
    }
}

/// A solid RGB element capture placed at (4, 4).
pub fn element_capture(name: &str, page: u32, width: u32, height: u32, color: [u8; 3]) -> RawCapture {
    RawCapture {
        name: name.to_string(),
        kind: CaptureKind::Element,
        page,
        state: None,
        width,
        height,
        layout: PixelLayout::Rgb8,
        pixels: solid_pixels(width, height, color),
        rect: Rect::new(4, 4, width, height),
    }
}
