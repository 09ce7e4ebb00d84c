//! 24-bit BMP codec for the display firmware.
//!
//! The firmware accepts exactly one bitmap convention, and every image the
//! package contains goes through [`normalize`] and [`encode`]:
//!
//! | Field | Value |
//! |---|---|
//! | File header | `BM`, total file size, pixel offset 54 |
//! | Info header | `BITMAPINFOHEADER` (40 bytes) |
//! | Depth | 24 bits per pixel, no palette, no alpha |
//! | Compression | `BI_RGB` (none) |
//! | Orientation | bottom-up (positive height) |
//! | Byte order | B, G, R |
//! | Row stride | `3 * width` rounded up to a multiple of 4, zero padded |
//!
//! [`verify`] parses an encoded file back and rejects anything that deviates.
//! A [`NormalizedBitmap`] holds the pixel array exactly as it appears in the
//! file, so the fingerprint of a bitmap and of its verified re-read are equal.

use super::pixels::PixelLayout;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Output depth in bits per pixel.
pub const BITS_PER_PIXEL: u16 = 24;

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
const PIXEL_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN;
/// 72 DPI.
const PIXELS_PER_METER: i32 = 2835;
const BI_RGB: u32 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed image: {0}")]
    MalformedImage(String),
    #[error("Unsupported source depth: {layout} ({} bpp) cannot be upconverted to 24 bpp", .layout.bits_per_pixel())]
    UnsupportedDepth { layout: PixelLayout },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("File too short for BMP headers ({0} bytes)")]
    TooShort(usize),
    #[error("Bad signature {0:?} (expected \"BM\")")]
    BadSignature([u8; 2]),
    #[error("Declared file size {declared} does not match actual size {actual}")]
    FileSizeMismatch { declared: u32, actual: usize },
    #[error("Pixel data offset {0} is outside the file")]
    PixelDataOffset(u32),
    #[error("Info header size {0} (expected 40)")]
    InfoHeader(u32),
    #[error("Invalid dimensions {width}x{height}")]
    Dimensions { width: i32, height: i32 },
    #[error("Top-down row order (negative height)")]
    TopDown,
    #[error("Plane count {0} (expected 1)")]
    Planes(u16),
    #[error("Color depth {0} bpp (expected 24)")]
    Depth(u16),
    #[error("Compression method {0} (expected uncompressed)")]
    Compression(u32),
    #[error("Pixel data truncated: expected {expected} bytes, found {actual}")]
    TruncatedPixels { expected: usize, actual: usize },
}

/// SHA-256 content hash of a normalized bitmap, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn compute(width: u32, height: u32, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"bmp24\0");
        hasher.update(width.to_le_bytes());
        hasher.update(height.to_le_bytes());
        hasher.update(data);
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bitmap in the firmware's pixel convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBitmap {
    width: u32,
    height: u32,
    stride: usize,
    /// Bottom-up BGR rows, each padded to `stride` bytes.
    data: Vec<u8>,
    fingerprint: Fingerprint,
}

impl NormalizedBitmap {
    fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        let fingerprint = Fingerprint::compute(width, height, &data);
        Self {
            width,
            height,
            stride: row_stride(width),
            data,
            fingerprint,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn depth(&self) -> u16 {
        BITS_PER_PIXEL
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// RGB value at `(x, y)`, with `y` counted from the top.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let row = (self.height - 1 - y) as usize;
        let i = row * self.stride + x as usize * 3;
        [self.data[i + 2], self.data[i + 1], self.data[i]]
    }

    /// Copy into a top-down RGB canvas.
    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| image::Rgb(self.pixel(x, y)))
    }

    /// Normalize a top-down RGB canvas.
    pub fn from_rgb_image(canvas: &image::RgbImage) -> Result<Self, CodecError> {
        normalize(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            PixelLayout::Rgb8,
            [0, 0, 0],
        )
    }
}

/// Row length in bytes: 3 bytes per pixel, rounded up to 4.
pub fn row_stride(width: u32) -> usize {
    (width as usize * 3 + 3) & !3
}

/// Convert a top-down raw pixel buffer into the firmware convention.
///
/// Alpha is composited over `background`; gray is replicated into RGB.
pub fn normalize(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    background: [u8; 3],
) -> Result<NormalizedBitmap, CodecError> {
    if width == 0 || height == 0 {
        return Err(CodecError::MalformedImage(format!(
            "non-positive dimensions {width}x{height}"
        )));
    }
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(CodecError::MalformedImage(format!(
            "dimensions {width}x{height} exceed the BMP range"
        )));
    }
    if pixels.is_empty() {
        return Err(CodecError::MalformedImage("empty pixel data".into()));
    }
    let bpp = layout
        .supported_bytes_per_pixel()
        .ok_or(CodecError::UnsupportedDepth { layout })?;

    let src_row = width as usize * bpp;
    let expected = src_row
        .checked_mul(height as usize)
        .ok_or_else(|| CodecError::MalformedImage("pixel buffer size overflows".into()))?;
    if pixels.len() < expected {
        return Err(CodecError::MalformedImage(format!(
            "truncated rows: expected {expected} bytes for {width}x{height} {layout}, got {}",
            pixels.len()
        )));
    }
    if pixels.len() > expected {
        return Err(CodecError::MalformedImage(format!(
            "{} trailing bytes after {width}x{height} {layout} pixel data",
            pixels.len() - expected
        )));
    }

    let stride = row_stride(width);
    let mut data = vec![0u8; stride * height as usize];
    for (y, src) in pixels.chunks_exact(src_row).enumerate() {
        let dst_row = height as usize - 1 - y;
        let dst = &mut data[dst_row * stride..dst_row * stride + width as usize * 3];
        for (px, out) in src.chunks_exact(bpp).zip(dst.chunks_exact_mut(3)) {
            let [r, g, b] = layout.to_rgb(px, background);
            out.copy_from_slice(&[b, g, r]);
        }
    }

    Ok(NormalizedBitmap::from_parts(width, height, data))
}

/// Serialize a bitmap as a complete BMP file.
pub fn encode(bitmap: &NormalizedBitmap) -> Vec<u8> {
    let image_size = bitmap.data.len();
    let file_size = PIXEL_OFFSET + image_size;
    let mut out = Vec::with_capacity(file_size);

    // BITMAPFILEHEADER
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(PIXEL_OFFSET as u32).to_le_bytes());

    // BITMAPINFOHEADER
    out.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
    out.extend_from_slice(&(bitmap.width as i32).to_le_bytes());
    out.extend_from_slice(&(bitmap.height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&BI_RGB.to_le_bytes());
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    out.extend_from_slice(&bitmap.data);
    out
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    u32_at(bytes, offset) as i32
}

/// Parse an encoded BMP and check it against the firmware convention.
pub fn verify(bytes: &[u8]) -> Result<NormalizedBitmap, VerificationError> {
    if bytes.len() < PIXEL_OFFSET {
        return Err(VerificationError::TooShort(bytes.len()));
    }
    if &bytes[0..2] != b"BM" {
        return Err(VerificationError::BadSignature([bytes[0], bytes[1]]));
    }
    let declared = u32_at(bytes, 2);
    if declared as usize != bytes.len() {
        return Err(VerificationError::FileSizeMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    let offset = u32_at(bytes, 10);
    if (offset as usize) < PIXEL_OFFSET || offset as usize > bytes.len() {
        return Err(VerificationError::PixelDataOffset(offset));
    }
    let info_len = u32_at(bytes, 14);
    if info_len as usize != INFO_HEADER_LEN {
        return Err(VerificationError::InfoHeader(info_len));
    }
    let width = i32_at(bytes, 18);
    let height = i32_at(bytes, 22);
    if height < 0 {
        return Err(VerificationError::TopDown);
    }
    if width <= 0 || height == 0 {
        return Err(VerificationError::Dimensions { width, height });
    }
    let planes = u16_at(bytes, 26);
    if planes != 1 {
        return Err(VerificationError::Planes(planes));
    }
    let depth = u16_at(bytes, 28);
    if depth != BITS_PER_PIXEL {
        return Err(VerificationError::Depth(depth));
    }
    let compression = u32_at(bytes, 30);
    if compression != BI_RGB {
        return Err(VerificationError::Compression(compression));
    }

    let (width, height) = (width as u32, height as u32);
    let expected = row_stride(width) * height as usize;
    let pixel_data = &bytes[offset as usize..];
    if pixel_data.len() < expected {
        return Err(VerificationError::TruncatedPixels {
            expected,
            actual: pixel_data.len(),
        });
    }

    Ok(NormalizedBitmap::from_parts(
        width,
        height,
        pixel_data[..expected].to_vec(),
    ))
}
