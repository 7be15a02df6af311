//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image::load_from_memory` |
//! | SVG overlays | `usvg` parse + `resvg::render` into a `tiny_skia::Pixmap` |
//! | Pixel operations | [`RasterSession`] |
//! | File writes | `tempfile::NamedTempFile::persist` (atomic rename) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::VariantParams;
use super::session::RasterSession;
use image::{ImageFormat, RgbaImage};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// Extensions whose decoders are compiled in.
///
/// The `image` crate's `"avif"` feature only enables the encoder, so AVIF is
/// an output format here but never an input.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// System fonts, loaded once and shared by every SVG parse.
static FONT_DB: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts for svg text");
    Arc::new(db)
});

/// Write `bytes` to `path` through a temp file in the same directory, so a
/// reader never observes a partially written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

/// Pure Rust backend using the `image` and `resvg` crates.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn open(&self, bytes: &[u8]) -> Result<RasterSession, BackendError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {e}")))?;
        Ok(RasterSession::new(image))
    }

    fn rasterize_svg(&self, markup: &str) -> Result<RgbaImage, BackendError> {
        let options = usvg::Options {
            fontdb: Arc::clone(&FONT_DB),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(markup, &options)
            .map_err(|e| BackendError::ProcessingFailed(format!("Invalid SVG overlay: {e}")))?;

        let size = tree.size().to_int_size();
        let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
            .ok_or_else(|| BackendError::ProcessingFailed("Failed to allocate svg pixmap".into()))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::default(),
            &mut pixmap.as_mut(),
        );

        // tiny-skia stores premultiplied alpha; image expects straight alpha.
        let straight: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        RgbaImage::from_raw(size.width(), size.height(), straight).ok_or_else(|| {
            BackendError::ProcessingFailed("SVG raster buffer size mismatch".into())
        })
    }

    fn export_variant(&self, params: &VariantParams) -> Result<Dimensions, BackendError> {
        let bytes = std::fs::read(&params.source)?;
        let session = self.open(&bytes)?.resize(&params.resize);
        let dims = session.dimensions();
        let encoded = session.encode(&params.encode)?;
        write_atomic(&params.output, &encoded)?;
        Ok(dims)
    }
}
