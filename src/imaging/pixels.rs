//! Source pixel layouts and their expansion to opaque RGB.
//!
//! Captures arrive in whatever layout the producer decoded. Only 8-bit
//! channels are accepted: gray is replicated into RGB and alpha is composited
//! over the configured background. Wider channels would need a lossy
//! downconversion, so they are rejected instead.

use std::fmt;

/// Pixel layout of a raw capture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    Gray8,
    GrayAlpha8,
    Rgb8,
    Rgba8,
    Gray16,
    GrayAlpha16,
    Rgb16,
    Rgba16,
    Rgb32F,
    Rgba32F,
    /// Any layout the decoder reports that has no named variant.
    Other { bits_per_pixel: u16 },
}

impl PixelLayout {
    pub fn bits_per_pixel(self) -> u16 {
        match self {
            Self::Gray8 => 8,
            Self::GrayAlpha8 | Self::Gray16 => 16,
            Self::Rgb8 => 24,
            Self::Rgba8 | Self::GrayAlpha16 => 32,
            Self::Rgb16 => 48,
            Self::Rgba16 => 64,
            Self::Rgb32F => 96,
            Self::Rgba32F => 128,
            Self::Other { bits_per_pixel } => bits_per_pixel,
        }
    }

    /// Bytes per pixel for the layouts the codec can upconvert, `None` otherwise.
    pub fn supported_bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Gray8 => Some(1),
            Self::GrayAlpha8 => Some(2),
            Self::Rgb8 => Some(3),
            Self::Rgba8 => Some(4),
            _ => None,
        }
    }

    /// Map a decoder color type onto a layout.
    pub fn from_color_type(color: image::ColorType) -> Self {
        use image::ColorType;
        match color {
            ColorType::L8 => Self::Gray8,
            ColorType::La8 => Self::GrayAlpha8,
            ColorType::Rgb8 => Self::Rgb8,
            ColorType::Rgba8 => Self::Rgba8,
            ColorType::L16 => Self::Gray16,
            ColorType::La16 => Self::GrayAlpha16,
            ColorType::Rgb16 => Self::Rgb16,
            ColorType::Rgba16 => Self::Rgba16,
            ColorType::Rgb32F => Self::Rgb32F,
            ColorType::Rgba32F => Self::Rgba32F,
            other => Self::Other {
                bits_per_pixel: other.bits_per_pixel(),
            },
        }
    }

    /// Expand one source pixel to opaque RGB.
    ///
    /// `src` must hold exactly [`supported_bytes_per_pixel`](Self::supported_bytes_per_pixel)
    /// bytes; unsupported layouts return the background.
    pub fn to_rgb(self, src: &[u8], background: [u8; 3]) -> [u8; 3] {
        match self {
            Self::Gray8 => [src[0]; 3],
            Self::GrayAlpha8 => composite([src[0]; 3], src[1], background),
            Self::Rgb8 => [src[0], src[1], src[2]],
            Self::Rgba8 => composite([src[0], src[1], src[2]], src[3], background),
            _ => background,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray8 => write!(f, "gray8"),
            Self::GrayAlpha8 => write!(f, "gray-alpha8"),
            Self::Rgb8 => write!(f, "rgb8"),
            Self::Rgba8 => write!(f, "rgba8"),
            Self::Gray16 => write!(f, "gray16"),
            Self::GrayAlpha16 => write!(f, "gray-alpha16"),
            Self::Rgb16 => write!(f, "rgb16"),
            Self::Rgba16 => write!(f, "rgba16"),
            Self::Rgb32F => write!(f, "rgb32f"),
            Self::Rgba32F => write!(f, "rgba32f"),
            Self::Other { bits_per_pixel } => write!(f, "{bits_per_pixel}-bit"),
        }
    }
}

/// Alpha-composite `color` over an opaque `background`, rounding to nearest.
pub fn composite(color: [u8; 3], alpha: u8, background: [u8; 3]) -> [u8; 3] {
    let a = alpha as u32;
    std::array::from_fn(|i| {
        ((color[i] as u32 * a + background[i] as u32 * (255 - a) + 127) / 255) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: [u8; 3] = [26, 26, 26];

    #[test]
    fn composite_extremes() {
        assert_eq!(composite([200, 100, 50], 255, BG), [200, 100, 50]);
        assert_eq!(composite([200, 100, 50], 0, BG), BG);
    }

    #[test]
    fn composite_half_alpha_rounds() {
        // (255*128 + 0*127 + 127) / 255 = 128.49.. → 128
        assert_eq!(composite([255, 255, 255], 128, [0, 0, 0]), [128, 128, 128]);
    }

    #[test]
    fn gray_expands_to_rgb() {
        assert_eq!(PixelLayout::Gray8.to_rgb(&[77], BG), [77, 77, 77]);
        assert_eq!(PixelLayout::GrayAlpha8.to_rgb(&[77, 255], BG), [77, 77, 77]);
    }

    #[test]
    fn rgba_transparent_pixel_becomes_background() {
        assert_eq!(PixelLayout::Rgba8.to_rgb(&[1, 2, 3, 0], BG), BG);
    }

    #[test]
    fn only_8_bit_layouts_are_supported() {
        assert_eq!(PixelLayout::Rgb8.supported_bytes_per_pixel(), Some(3));
        assert_eq!(PixelLayout::Rgba8.supported_bytes_per_pixel(), Some(4));
        assert_eq!(PixelLayout::Rgb16.supported_bytes_per_pixel(), None);
        assert_eq!(PixelLayout::Rgba32F.supported_bytes_per_pixel(), None);
    }

    #[test]
    fn bits_per_pixel_matches_layout() {
        assert_eq!(PixelLayout::Rgb8.bits_per_pixel(), 24);
        assert_eq!(PixelLayout::Rgba8.bits_per_pixel(), 32);
        assert_eq!(PixelLayout::Rgb16.bits_per_pixel(), 48);
    }

    #[test]
    fn color_type_mapping() {
        assert_eq!(
            PixelLayout::from_color_type(image::ColorType::Rgba8),
            PixelLayout::Rgba8
        );
        assert_eq!(
            PixelLayout::from_color_type(image::ColorType::L16),
            PixelLayout::Gray16
        );
    }
}
