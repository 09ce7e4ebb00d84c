//! Template rendering: a page image annotated with every element's placement.
//!
//! Elements are outlined in a color chosen from their name and labeled with
//! their name and geometry. Larger elements are drawn first so the labels of
//! small ones end up on top. A title banner and a color legend go in the
//! top-left corner. All drawing is clipped to the page; elements that do not
//! fit are still drawn and reported as [`OutOfBoundsWarning`].

use super::codec::{CodecError, NormalizedBitmap};
use super::font::{self, GLYPH_HEIGHT};
use crate::capture::Rect;
use image::{Rgb, RgbImage};
use std::fmt;

const OUTLINE: i64 = 2;
const LABEL_PADDING: i64 = 2;
const LINE_GAP: i64 = 2;
const LABEL_HEIGHT: i64 = LABEL_PADDING * 2 + GLYPH_HEIGHT as i64 * 2 + LINE_GAP;

const TITLE_ORIGIN: (i64, i64) = (5, 5);
const LEGEND_TOP: i64 = 30;
const LEGEND_ROW: i64 = 12;
const SWATCH: i64 = 8;

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];
pub const BUTTON_COLOR: [u8; 3] = [255, 0, 0];
pub const INDICATOR_COLOR: [u8; 3] = [0, 255, 0];
pub const DISPLAY_COLOR: [u8; 3] = [0, 0, 255];
pub const OTHER_COLOR: [u8; 3] = [255, 0, 255];

/// An element placement to annotate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedElement {
    pub name: String,
    pub rect: Rect,
}

/// An element that is empty or does not fit inside the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfBoundsWarning {
    pub element: String,
    pub rect: Rect,
    pub page_width: u32,
    pub page_height: u32,
}

impl fmt::Display for OutOfBoundsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.rect;
        if r.is_empty() {
            write!(
                f,
                "element '{}' has zero area ({},{}) {}x{}",
                self.element, r.x, r.y, r.width, r.height
            )
        } else {
            write!(
                f,
                "element '{}' at ({},{}) {}x{} extends outside the {}x{} page",
                self.element, r.x, r.y, r.width, r.height, self.page_width, self.page_height
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub bitmap: NormalizedBitmap,
    pub warnings: Vec<OutOfBoundsWarning>,
}

/// Outline color for an element, chosen by naming convention.
pub fn element_color(name: &str) -> [u8; 3] {
    let name = name.to_ascii_lowercase();
    if name.starts_with("btn_") || name.contains("button") {
        BUTTON_COLOR
    } else if name.starts_with("led_") || name.contains("indicator") {
        INDICATOR_COLOR
    } else if name.contains("display") || name.contains("status") || name.starts_with("temp_") {
        DISPLAY_COLOR
    } else {
        OTHER_COLOR
    }
}

/// Annotate a copy of `page` with the given elements.
pub fn render(
    page: &NormalizedBitmap,
    elements: &[PlacedElement],
    title: Option<&str>,
) -> Result<Rendered, CodecError> {
    let mut canvas = page.to_rgb_image();
    let (page_width, page_height) = page.size();
    let mut warnings = Vec::new();

    let mut order: Vec<&PlacedElement> = elements.iter().collect();
    order.sort_by(|a, b| {
        b.rect
            .area()
            .cmp(&a.rect.area())
            .then_with(|| a.name.cmp(&b.name))
    });

    for element in order {
        let rect = element.rect;
        if rect.is_empty() || !rect.contained_in(page_width, page_height) {
            warnings.push(OutOfBoundsWarning {
                element: element.name.clone(),
                rect,
                page_width,
                page_height,
            });
        }
        if rect.is_empty() {
            continue;
        }
        let color = element_color(&element.name);
        draw_outline(&mut canvas, &rect, color);
        draw_label(&mut canvas, element, color);
    }

    if let Some(title) = title {
        draw_title(&mut canvas, title);
    }
    draw_legend(&mut canvas);

    Ok(Rendered {
        bitmap: NormalizedBitmap::from_rgb_image(&canvas)?,
        warnings,
    })
}

/// Fill the half-open box `[x0, x1) x [y0, y1)`, clipped to the canvas.
fn fill(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3]) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(canvas.width() as i64);
    let y1 = y1.min(canvas.height() as i64);
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
}

fn draw_outline(canvas: &mut RgbImage, rect: &Rect, color: [u8; 3]) {
    let (x0, y0) = (rect.x as i64, rect.y as i64);
    let (x1, y1) = (rect.right(), rect.bottom());
    fill(canvas, x0, y0, x1, y0 + OUTLINE, color);
    fill(canvas, x0, y1 - OUTLINE, x1, y1, color);
    fill(canvas, x0, y0, x0 + OUTLINE, y1, color);
    fill(canvas, x1 - OUTLINE, y0, x1, y1, color);
}

fn draw_label(canvas: &mut RgbImage, element: &PlacedElement, color: [u8; 3]) {
    let rect = &element.rect;
    let geometry = format!("({},{}) {}x{}", rect.x, rect.y, rect.width, rect.height);
    let width = font::text_width(&element.name).max(font::text_width(&geometry)) as i64
        + LABEL_PADDING * 2;

    let x = rect.x as i64;
    let above = rect.y as i64 - LABEL_HEIGHT;
    let y = if above >= 0 { above } else { rect.bottom() };

    fill(canvas, x, y, x + width, y + LABEL_HEIGHT, BLACK);
    let text_x = x + LABEL_PADDING;
    let text_y = y + LABEL_PADDING;
    font::draw_text(canvas, text_x, text_y, &element.name, color);
    font::draw_text(
        canvas,
        text_x,
        text_y + GLYPH_HEIGHT as i64 + LINE_GAP,
        &geometry,
        WHITE,
    );
}

fn draw_title(canvas: &mut RgbImage, title: &str) {
    let (x, y) = TITLE_ORIGIN;
    let width = font::text_width(title) as i64 + LABEL_PADDING * 2;
    let height = GLYPH_HEIGHT as i64 + LABEL_PADDING * 2;
    fill(canvas, x, y, x + width, y + height, BLACK);
    font::draw_text(canvas, x + LABEL_PADDING, y + LABEL_PADDING, title, WHITE);
}

fn draw_legend(canvas: &mut RgbImage) {
    let x = TITLE_ORIGIN.0;
    let entries = [
        ("Buttons", BUTTON_COLOR),
        ("Indicators", INDICATOR_COLOR),
        ("Displays", DISPLAY_COLOR),
    ];
    for (i, (label, color)) in entries.into_iter().enumerate() {
        let y = LEGEND_TOP + i as i64 * LEGEND_ROW;
        fill(canvas, x, y, x + SWATCH, y + SWATCH, color);
        font::draw_text(canvas, x + SWATCH + 3, y, label, WHITE);
    }
}
