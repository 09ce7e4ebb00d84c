//! # dgus-pack
//!
//! Packages screenshots of an HTML interface mockup into the asset set a DWIN
//! DGUS display project expects: full-page bitmaps, numbered icon folders,
//! annotated templates and text guides for laying out touch areas.
//!
//! # Architecture: One Pass, In Memory, Then Disk
//!
//! ```text
//! captures.json ──▶ capture ──▶ pipeline ──▶ Package ──▶ package::write ──▶ out/
//!                               │ normalize (parallel)
//!                               │ dedup → bucket
//!                               │ assemble pages
//!                               │ render templates
//!                               └ guides
//! ```
//!
//! The whole package is built in memory before the first byte is written.
//! A configuration problem (an unmapped page, two pages mapped to one file)
//! therefore stops the run with an empty output directory instead of a half
//! written one. Problems with individual captures do not stop anything; they
//! are collected in the run summary.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`capture`] | `RawCapture`, the `CaptureSource` trait, the `captures.json` reader |
//! | [`config`] | `dgus-pack.toml` loading, merging with stock defaults, validation |
//! | [`imaging`] | 24-bit BMP codec, pixel layouts, template overlay drawing |
//! | [`dedup`] | Collapses pixel-identical element captures into canonical assets |
//! | [`bucket`] | Groups canonical assets by size and numbers them for variable icons |
//! | [`pages`] | Maps page captures to DWIN_SET file names |
//! | [`guides`] | Touch-area, page and icon-group text guides |
//! | [`package`] | Lays the package out on disk, one category at a time |
//! | [`pipeline`] | Runs all of the above and produces the run summary |
//! | [`verify`] | Re-checks an existing output tree |
//! | [`output`] | CLI output formatting |
//!
//! # Determinism
//!
//! The same set of captures produces the same bytes, whatever order the
//! capture source yields them in. Normalization runs in parallel, but its
//! results are sorted before deduplication, icons are numbered by name rather
//! than arrival, and every map that reaches the output is a `BTreeMap`.

pub mod bucket;
pub mod capture;
pub mod config;
pub mod dedup;
pub mod guides;
pub mod imaging;
pub mod output;
pub mod package;
pub mod pages;
pub mod pipeline;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_helpers;
