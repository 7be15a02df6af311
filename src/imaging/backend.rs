//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between the pipeline and pixel
//! work: decode bytes into a [`RasterSession`], rasterize SVG overlays, and
//! export resized variants of a written file.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::VariantParams;
use super::session::RasterSession;
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<Dimensions> for (u32, u32) {
    fn from(d: Dimensions) -> Self {
        (d.width, d.height)
    }
}

/// Trait for image processing backends.
///
/// Sessions are per image, so a backend only needs to be `Sync` to be shared
/// across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode encoded image bytes into a fresh session.
    fn open(&self, bytes: &[u8]) -> Result<RasterSession, BackendError>;

    /// Rasterize a self-contained SVG document at its declared size.
    fn rasterize_svg(&self, markup: &str) -> Result<RgbaImage, BackendError>;

    /// Read `params.source`, resize and re-encode it to `params.output`.
    fn export_variant(&self, params: &VariantParams) -> Result<Dimensions, BackendError>;
}
