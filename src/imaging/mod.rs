//! Image handling for the display firmware.
//!
//! | Concern | Module |
//! |---|---|
//! | **Source layouts** | [`pixels`]: 8-bit gray/RGB with or without alpha |
//! | **24-bit BMP** | [`codec`]: normalize, encode, verify |
//! | **Label text** | [`font`]: built-in 5x7 bitmap font |
//! | **Templates** | [`overlay`]: element outlines and labels on a page |
//!
//! Decoding of PNG/JPEG screenshots is left to the `image` crate; everything
//! written to the package goes through [`codec`].

pub mod codec;
pub mod font;
pub mod overlay;
pub mod pixels;

pub use codec::{
    CodecError, Fingerprint, NormalizedBitmap, VerificationError, encode, normalize, row_stride,
    verify,
};
pub use overlay::{
    BUTTON_COLOR, DISPLAY_COLOR, INDICATOR_COLOR, OTHER_COLOR, OutOfBoundsWarning, PlacedElement,
    Rendered, element_color, render,
};
pub use pixels::PixelLayout;
