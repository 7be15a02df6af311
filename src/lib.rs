//! # Photokit
//!
//! A declarative image transform pipeline for web and marketing exports.
//! One options document describes everything that happens to an image;
//! every source in a batch runs through the same fixed stage order:
//!
//! ```text
//! source bytes
//!   → background removal (optional)
//!   → geometry        resize with a fit mode, or aspect-ratio crop
//!   → orientation     rotate, flip vertical, flop horizontal
//!   → color           brightness and saturation, then contrast
//!   → corner mask     rounded corners cut into the alpha channel
//!   → overlays        border, image watermark, text watermark
//!   → encode          flattened first when the format has no alpha
//!   → name + write    custom/batch-indexed or timestamped, written atomically
//!   → variants        preset and custom sizes derived from the written file
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Runs the stages for one image or a parallel batch |
//! | [`config`] | `ProcessingOptions`: the TOML options document, defaults and validation |
//! | [`imaging`] | Raster session, geometry math, SVG overlays and the encoding backend |
//! | [`background`] | Background removal seam and its HTTP implementation |
//! | [`naming`] | Output filename rules and the injectable clock |
//! | [`slug`] | SEO filename slugs |
//! | [`presets`] | Built-in variant sizes |
//! | [`variants`] | Auxiliary size exports |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Session Per Image
//!
//! Each image is decoded once into a [`imaging::RasterSession`] that every
//! stage consumes and returns. Sessions are never shared, so a batch
//! parallelizes with rayon; the only batch-wide state is the set of output
//! names already claimed. One image's failure cannot disturb another's.
//!
//! ## No External Tools
//!
//! Decoding, resizing and encoding use the `image` crate, except lossy WebP,
//! which uses libwebp compiled in by the `webp` crate. Rotation by
//! arbitrary angles uses `imageproc`; masks, borders and text are drawn as
//! SVG and rasterized by `resvg`. Nothing shells out to ImageMagick or any
//! other system tool.
//!
//! ## Soft And Hard Failures
//!
//! A failed decode, geometry, encode or write fails the image. Background
//! removal, a missing watermark file, an unknown preset and a failed variant
//! are logged with `tracing` and skipped.

pub mod background;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod presets;
pub mod process;
pub mod slug;
pub mod variants;
