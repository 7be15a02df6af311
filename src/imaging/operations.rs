//! Pipeline stages.
//!
//! Each stage takes the current [`RasterSession`] (or the overlay queue) plus
//! the slice of configuration it cares about and returns the updated state,
//! so the order of stages is visible at the call site in
//! [`process`](crate::process) and each one is testable on its own.
//!
//! Dimensions are always read from the session at the time the stage runs,
//! so masks and watermarks are sized to the post-resize image.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    GeometryError, GeometryRequest, contrast_transform, modulation_for, resolve_geometry,
    text_font_size, watermark_bounds, watermark_needs_resize,
};
use super::overlay::{BlendMode, Overlay, OverlayKind, Placement, WatermarkPosition};
use super::params::{EncodeParams, FitMode, ResizeParams};
use super::session::RasterSession;
use super::svg;
use crate::config::{BorderConfig, ColorConfig, OrientationConfig, OutputConfig, WatermarkConfig};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Resize/crop to the resolved geometry, or leave the session untouched.
pub fn apply_geometry(
    session: RasterSession,
    request: &GeometryRequest,
) -> std::result::Result<RasterSession, GeometryError> {
    let natural = session.dimensions().into();
    match resolve_geometry(request, natural)? {
        Some(params) => {
            tracing::debug!(
                width = ?params.width,
                height = ?params.height,
                fit = %params.fit,
                "resize"
            );
            Ok(session.resize(&params))
        }
        None => Ok(session),
    }
}

/// Rotate, then flip vertically, then flip horizontally.
pub fn apply_orientation(session: RasterSession, orientation: &OrientationConfig) -> RasterSession {
    let mut session = session;
    if orientation.rotate != 0 {
        tracing::debug!(degrees = orientation.rotate, "rotate");
        session = session.rotate(orientation.rotate);
    }
    if orientation.flip_vertical {
        session = session.flip();
    }
    if orientation.flip_horizontal {
        session = session.flop();
    }
    session
}

/// Brightness/saturation as one modulation, then mid-gray contrast.
pub fn apply_color(session: RasterSession, color: &ColorConfig) -> Result<RasterSession> {
    let mut session = session;
    if let Some(modulation) = modulation_for(color.brightness, color.saturation) {
        tracing::debug!(?modulation, "modulate");
        session = session.modulate(modulation)?;
    }
    if color.contrast != 1.0 {
        let transform = contrast_transform(color.contrast);
        tracing::debug!(?transform, "contrast");
        session = session.linear(transform)?;
    }
    Ok(session)
}

/// Clip the image to a rounded rectangle. Runs immediately, before any
/// queued overlay, so only the base image is clipped.
pub fn apply_corner_mask(
    backend: &impl ImageBackend,
    session: RasterSession,
    radius: u32,
) -> Result<RasterSession> {
    if radius == 0 {
        return Ok(session);
    }
    let Dimensions { width, height } = session.dimensions();
    let layer = backend.rasterize_svg(&svg::rounded_mask(width, height, radius))?;
    Ok(session.composite(&[Overlay {
        kind: OverlayKind::CornerMask,
        layer,
        blend: BlendMode::DestIn,
        placement: Placement::Center,
    }]))
}

/// Border stroke overlay, when a border width is configured.
pub fn border_overlay(
    backend: &impl ImageBackend,
    base: Dimensions,
    border: &BorderConfig,
) -> Result<Option<Overlay>> {
    if border.width == 0 {
        return Ok(None);
    }
    let markup = svg::border_stroke(
        base.width,
        base.height,
        border.radius,
        border.width,
        border.color,
    );
    Ok(Some(Overlay {
        kind: OverlayKind::Border,
        layer: backend.rasterize_svg(&markup)?,
        blend: BlendMode::Over,
        placement: Placement::Center,
    }))
}

/// Load a watermark image, shrinking it into the 40% box when it is too big.
pub fn image_watermark_overlay(
    backend: &impl ImageBackend,
    path: &Path,
    base: Dimensions,
    position: WatermarkPosition,
) -> Result<Overlay> {
    let bytes = std::fs::read(path)?;
    let mut mark = backend.open(&bytes)?;
    let mark_size = mark.dimensions().into();
    let base_size = base.into();
    if watermark_needs_resize(mark_size, base_size) {
        let (max_w, max_h) = watermark_bounds(base_size);
        mark = mark.resize(&ResizeParams {
            width: Some(max_w),
            height: Some(max_h),
            fit: FitMode::Inside,
            without_enlargement: true,
        });
    }
    Ok(Overlay {
        kind: OverlayKind::ImageWatermark,
        layer: mark.into_rgba(),
        blend: BlendMode::Over,
        placement: position.into(),
    })
}

/// Render watermark text into a canvas the size of the base image.
pub fn text_watermark_overlay(
    backend: &impl ImageBackend,
    base: Dimensions,
    text: &str,
    watermark: &WatermarkConfig,
) -> Result<Overlay> {
    let font_size = text_font_size(base.into(), watermark.font_size_percent);
    let markup = svg::text_watermark(
        base.width,
        base.height,
        text,
        font_size,
        watermark.color,
        watermark.effective_opacity(),
    );
    Ok(Overlay {
        kind: OverlayKind::TextWatermark,
        layer: backend.rasterize_svg(&markup)?,
        blend: BlendMode::Over,
        placement: watermark.position.into(),
    })
}

/// Build the overlay queue in paint order: border, image watermark, text.
///
/// A missing or unreadable watermark image is skipped with a warning. Border
/// and text rasterization failures propagate.
pub fn collect_overlays(
    backend: &impl ImageBackend,
    base: Dimensions,
    border: &BorderConfig,
    watermark: &WatermarkConfig,
) -> Result<Vec<Overlay>> {
    let mut overlays = Vec::new();
    overlays.extend(border_overlay(backend, base, border)?);

    if let Some(path) = &watermark.image {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "watermark image not found, skipping");
        } else {
            match image_watermark_overlay(backend, path, base, watermark.position) {
                Ok(overlay) => overlays.push(overlay),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "watermark image skipped")
                }
            }
        }
    }

    if let Some(text) = watermark.text() {
        overlays.push(text_watermark_overlay(backend, base, text, watermark)?);
    }

    Ok(overlays)
}

/// Flatten when the format has no alpha channel, then encode.
pub fn encode_output(session: RasterSession, output: &OutputConfig) -> Result<Vec<u8>> {
    let session = if output.format.requires_flatten() {
        session.flatten(output.flatten_background)
    } else {
        session
    };
    session.encode(&EncodeParams {
        format: output.format,
        quality: output.quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::calculations::CropRatio;
    use crate::imaging::params::{Color, OutputFormat};
    use crate::imaging::rust_backend::RustBackend;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RasterSession {
        RasterSession::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba(rgba),
        )))
    }

    fn size(session: &RasterSession) -> (u32, u32) {
        session.dimensions().into()
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    #[test]
    fn geometry_without_resize_or_crop_is_noop() {
        let session = apply_geometry(solid(300, 200, [0; 4]), &GeometryRequest::default()).unwrap();
        assert_eq!(size(&session), (300, 200));
    }

    #[test]
    fn square_crop_uses_shorter_side() {
        let request = GeometryRequest {
            crop: Some(CropRatio::Square),
            ..Default::default()
        };
        let session = apply_geometry(solid(200, 100, [0; 4]), &request).unwrap();
        assert_eq!(size(&session), (100, 100));
    }

    #[test]
    fn widescreen_crop_from_width() {
        let request = GeometryRequest {
            width: Some(160),
            crop: Some(CropRatio::Widescreen),
            ..Default::default()
        };
        let session = apply_geometry(solid(400, 400, [0; 4]), &request).unwrap();
        assert_eq!(size(&session), (160, 90));
    }

    // =========================================================================
    // Orientation and color
    // =========================================================================

    #[test]
    fn orientation_rotates_then_flips() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let orientation = OrientationConfig {
            rotate: 90,
            flip_horizontal: true,
            flip_vertical: true,
        };
        let session = apply_orientation(
            RasterSession::new(DynamicImage::ImageRgba8(img)),
            &orientation,
        );
        assert_eq!(size(&session), (2, 3));
        // (0,0) -> rotate 90 -> (1,0) -> flip v -> (1,2) -> flop -> (0,2)
        assert_eq!(session.into_rgba().get_pixel(0, 2).0, [255, 0, 0, 255]);
    }

    #[test]
    fn zero_rotation_without_flips_is_identity() {
        let session = apply_orientation(solid(5, 4, [1, 2, 3, 4]), &OrientationConfig::default());
        assert_eq!(session.into_rgba().get_pixel(0, 0).0, [1, 2, 3, 4]);
    }

    #[test]
    fn identity_color_leaves_pixels() {
        let session = apply_color(solid(1, 1, [10, 20, 30, 255]), &ColorConfig::default()).unwrap();
        assert_eq!(session.into_rgba().get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn zero_contrast_flattens_to_mid_gray() {
        let color = ColorConfig {
            contrast: 0.0,
            ..Default::default()
        };
        let session = apply_color(solid(1, 1, [10, 200, 30, 255]), &color).unwrap();
        assert_eq!(session.into_rgba().get_pixel(0, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn negative_brightness_is_an_error() {
        let color = ColorConfig {
            brightness: -2.0,
            ..Default::default()
        };
        assert!(apply_color(solid(1, 1, [0; 4]), &color).is_err());
    }

    // =========================================================================
    // Masks and overlays
    // =========================================================================

    #[test]
    fn zero_radius_skips_mask() {
        let backend = MockBackend::new();
        apply_corner_mask(&backend, solid(10, 10, [0; 4]), 0).unwrap();
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn corner_mask_clears_corners() {
        let session =
            apply_corner_mask(&RustBackend::new(), solid(100, 80, [0, 0, 255, 255]), 30).unwrap();
        let rgba = session.into_rgba();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
        assert_eq!(rgba.get_pixel(50, 40).0[3], 255);
    }

    #[test]
    fn mask_uses_current_dimensions() {
        let backend = MockBackend::new();
        apply_corner_mask(&backend, solid(320, 180, [0; 4]), 8).unwrap();
        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::RasterizeSvg(svg)
            if svg.contains(r#"width="320" height="180""#)));
    }

    #[test]
    fn overlays_are_queued_border_first() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mark = tmp.path().join("logo.png");
        std::fs::write(&mark, b"mock bytes").unwrap();

        let backend = MockBackend::with_size(10, 10);
        let border = BorderConfig {
            width: 4,
            ..Default::default()
        };
        let watermark = WatermarkConfig {
            image: Some(mark),
            text: Some("Sample".into()),
            position: WatermarkPosition::Tile,
            ..Default::default()
        };
        let base = Dimensions {
            width: 200,
            height: 100,
        };

        let overlays = collect_overlays(&backend, base, &border, &watermark).unwrap();
        let kinds: Vec<_> = overlays.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OverlayKind::Border,
                OverlayKind::ImageWatermark,
                OverlayKind::TextWatermark
            ]
        );
        assert_eq!(overlays[0].placement, Placement::Center);
        assert_eq!(overlays[1].placement, Placement::Tile);
        assert_eq!(overlays[2].placement, Placement::Tile);
    }

    #[test]
    fn missing_watermark_image_is_skipped() {
        let backend = MockBackend::new();
        let watermark = WatermarkConfig {
            image: Some("/nonexistent/logo.png".into()),
            ..Default::default()
        };
        let base = Dimensions {
            width: 100,
            height: 100,
        };
        let overlays =
            collect_overlays(&backend, base, &BorderConfig::default(), &watermark).unwrap();
        assert!(overlays.is_empty());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn undecodable_watermark_image_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mark = tmp.path().join("empty.png");
        std::fs::write(&mark, b"").unwrap();

        let watermark = WatermarkConfig {
            image: Some(mark),
            ..Default::default()
        };
        let base = Dimensions {
            width: 100,
            height: 100,
        };
        let overlays =
            collect_overlays(&MockBackend::new(), base, &BorderConfig::default(), &watermark)
                .unwrap();
        assert!(overlays.is_empty());
    }

    #[test]
    fn large_watermark_is_shrunk_into_box() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mark = tmp.path().join("logo.png");
        std::fs::write(&mark, b"mock bytes").unwrap();

        let backend = MockBackend::with_size(100, 50);
        let base = Dimensions {
            width: 200,
            height: 200,
        };
        let overlay =
            image_watermark_overlay(&backend, &mark, base, WatermarkPosition::Southeast).unwrap();
        assert_eq!(overlay.layer.dimensions(), (80, 40));
        assert_eq!(overlay.placement, Placement::Southeast);
    }

    #[test]
    fn small_watermark_keeps_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mark = tmp.path().join("logo.png");
        std::fs::write(&mark, b"mock bytes").unwrap();

        let backend = MockBackend::with_size(30, 20);
        let base = Dimensions {
            width: 200,
            height: 200,
        };
        let overlay =
            image_watermark_overlay(&backend, &mark, base, WatermarkPosition::Center).unwrap();
        assert_eq!(overlay.layer.dimensions(), (30, 20));
    }

    #[test]
    fn text_watermark_markup_uses_font_percent() {
        let backend = MockBackend::new();
        let watermark = WatermarkConfig {
            font_size_percent: 10.0,
            ..Default::default()
        };
        let base = Dimensions {
            width: 800,
            height: 600,
        };
        text_watermark_overlay(&backend, base, "Hi & bye", &watermark).unwrap();
        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::RasterizeSvg(svg)
            if svg.contains(r#"font-size="60px""#) && svg.contains("Hi &amp; bye")));
    }

    // =========================================================================
    // Encode
    // =========================================================================

    #[test]
    fn jpeg_output_is_flattened_onto_background() {
        let output = OutputConfig {
            format: OutputFormat::Jpeg,
            flatten_background: Color::WHITE,
            ..Default::default()
        };
        let bytes = encode_output(solid(16, 16, [0, 0, 0, 0]), &output).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
        let pixel = decoded.to_rgb8().get_pixel(8, 8).0;
        assert!(pixel.iter().all(|&c| c > 245), "expected white, got {pixel:?}");
    }

    #[test]
    fn png_output_keeps_alpha() {
        let output = OutputConfig {
            format: OutputFormat::Png,
            ..Default::default()
        };
        let bytes = encode_output(solid(4, 4, [0, 0, 0, 0]), &output).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 0);
    }
}
