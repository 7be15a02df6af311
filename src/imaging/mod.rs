//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Resize / crop / pad** | Lanczos3 via `image::imageops` |
//! | **Arbitrary rotation** | `imageproc` projective warp |
//! | **Masks, borders, text** | SVG markup rasterized with `resvg` |
//! | **Encode** | `image` codecs (JPEG, PNG, AVIF, TIFF, BMP, GIF); lossy WebP via `webp` (libwebp) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and color math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Overlays / SVG**: The ordered overlay queue and the markup behind it
//! - **Session**: [`RasterSession`], one decoded image and its pixel operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Pipeline stages combining calculations, overlays and backend

pub mod backend;
mod calculations;
pub mod operations;
pub mod overlay;
mod params;
pub mod rust_backend;
pub mod session;
pub mod svg;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    CropRatio, GeometryError, GeometryRequest, contrast_transform, modulation_for,
    resolve_geometry, text_font_size, watermark_bounds,
};
pub use overlay::{BlendMode, Overlay, OverlayKind, Placement, WatermarkPosition};
pub use params::{
    Color, ColorParseError, EncodeParams, FitMode, LinearTransform, Modulation, OutputFormat,
    Quality, ResizeParams, VariantParams,
};
pub use rust_backend::{RustBackend, is_supported_input, supported_input_extensions, write_atomic};
pub use session::RasterSession;
