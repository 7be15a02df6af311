//! Per-image raster session.
//!
//! A [`RasterSession`] owns one decoded image for the lifetime of a single
//! pipeline run. Every operation consumes the session and returns the
//! transformed one, so stages chain with `?` and a session is never shared
//! between images.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Quarter-turn rotate, flip, flop | `DynamicImage::rotate90` / `flipv` / `fliph` |
//! | Arbitrary rotate | `imageproc::geometric_transformations::warp_into` |
//! | Composite (`over`) | `image::imageops::overlay` |
//! | Encode | `image` codecs (`JpegEncoder`, `AvifEncoder` speed 6); lossy WebP through libwebp (`webp::Encoder`) |

use super::backend::{BackendError, Dimensions};
use super::calculations::{ResizePlan, plan_resize, rotated_bounds};
use super::overlay::{BlendMode, Overlay};
use super::params::{Color, EncodeParams, LinearTransform, Modulation, OutputFormat, ResizeParams};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use std::io::Cursor;

const AVIF_SPEED: u8 = 6;

pub struct RasterSession {
    image: DynamicImage,
}

impl RasterSession {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image.into_rgba8()
    }

    /// Resize according to `params`: scale with Lanczos3, then center-crop
    /// (`cover`) or pad with opaque black (`contain`) to the final canvas.
    pub fn resize(self, params: &ResizeParams) -> Self {
        let source = (self.image.width(), self.image.height());
        let ResizePlan { scaled, canvas } = plan_resize(source, params);

        let image = if scaled != source {
            self.image
                .resize_exact(scaled.0, scaled.1, FilterType::Lanczos3)
        } else {
            self.image
        };

        let image = if canvas == scaled {
            image
        } else if canvas.0 <= scaled.0 && canvas.1 <= scaled.1 {
            let x = (scaled.0 - canvas.0) / 2;
            let y = (scaled.1 - canvas.1) / 2;
            image.crop_imm(x, y, canvas.0, canvas.1)
        } else if canvas.0 >= scaled.0 && canvas.1 >= scaled.1 {
            let mut padded = RgbaImage::from_pixel(canvas.0, canvas.1, Rgba([0, 0, 0, 255]));
            let x = ((canvas.0 - scaled.0) / 2) as i64;
            let y = ((canvas.1 - scaled.1) / 2) as i64;
            image::imageops::overlay(&mut padded, &image.to_rgba8(), x, y);
            DynamicImage::ImageRgba8(padded)
        } else {
            image.resize_exact(canvas.0, canvas.1, FilterType::Lanczos3)
        };

        Self { image }
    }

    /// Rotate clockwise. Quarter turns are exact; any other angle expands
    /// the canvas to the rotated bounds and fills the corners transparent.
    pub fn rotate(self, degrees: i32) -> Self {
        let normalized = degrees.rem_euclid(360);
        let image = match normalized {
            0 => self.image,
            90 => self.image.rotate90(),
            180 => self.image.rotate180(),
            270 => self.image.rotate270(),
            _ => {
                let rgba = self.image.into_rgba8();
                let (w, h) = rgba.dimensions();
                let (out_w, out_h) = rotated_bounds((w, h), normalized);
                let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
                    * Projection::rotate((normalized as f32).to_radians())
                    * Projection::translate(-(w as f32) / 2.0, -(h as f32) / 2.0);
                let mut out = RgbaImage::new(out_w, out_h);
                warp_into(
                    &rgba,
                    &projection,
                    Interpolation::Bilinear,
                    Rgba([0, 0, 0, 0]),
                    &mut out,
                );
                DynamicImage::ImageRgba8(out)
            }
        };
        Self { image }
    }

    /// Mirror top-to-bottom.
    pub fn flip(self) -> Self {
        Self {
            image: self.image.flipv(),
        }
    }

    /// Mirror left-to-right.
    pub fn flop(self) -> Self {
        Self {
            image: self.image.fliph(),
        }
    }

    /// Scale brightness and saturation. Saturation moves each channel
    /// toward or away from the pixel's Rec.601 luma.
    pub fn modulate(self, modulation: Modulation) -> Result<Self, BackendError> {
        let Modulation {
            brightness,
            saturation,
        } = modulation;
        for (name, factor) in [("brightness", brightness), ("saturation", saturation)] {
            if !factor.is_finite() || factor < 0.0 {
                return Err(BackendError::ProcessingFailed(format!(
                    "{name} must be a non-negative number, got {factor}"
                )));
            }
        }

        Ok(self.map_rgb(|[r, g, b]| {
            let luma = 0.299 * r + 0.587 * g + 0.114 * b;
            [r, g, b].map(|c| (luma + (c - luma) * saturation) * brightness)
        }))
    }

    /// Apply `multiplier * c + offset` to the color channels. Alpha is kept.
    pub fn linear(self, transform: LinearTransform) -> Result<Self, BackendError> {
        let LinearTransform { multiplier, offset } = transform;
        if !multiplier.is_finite() || !offset.is_finite() {
            return Err(BackendError::ProcessingFailed(format!(
                "linear transform must be finite, got {multiplier} * c + {offset}"
            )));
        }
        Ok(self.map_rgb(|rgb| rgb.map(|c| multiplier * c + offset)))
    }

    fn map_rgb(self, f: impl Fn([f32; 3]) -> [f32; 3]) -> Self {
        let mut rgba = self.image.into_rgba8();
        for pixel in rgba.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let [r, g, b] = f([r as f32, g as f32, b as f32]).map(to_channel);
            pixel.0 = [r, g, b, a];
        }
        Self {
            image: DynamicImage::ImageRgba8(rgba),
        }
    }

    /// Paint every overlay in order.
    pub fn composite(self, overlays: &[Overlay]) -> Self {
        if overlays.is_empty() {
            return self;
        }
        let mut base = self.image.into_rgba8();
        let size = base.dimensions();
        for overlay in overlays {
            match overlay.blend {
                BlendMode::Over => {
                    for (x, y) in overlay.offsets(size) {
                        image::imageops::overlay(&mut base, &overlay.layer, x, y);
                    }
                }
                BlendMode::DestIn => dest_in(&mut base, overlay),
            }
        }
        Self {
            image: DynamicImage::ImageRgba8(base),
        }
    }

    /// Replace transparency with `background`. Opaque images pass through.
    pub fn flatten(self, background: Color) -> Self {
        if !self.has_alpha() {
            return self;
        }
        let rgba = self.image.into_rgba8();
        let bg = [background.r, background.g, background.b].map(|c| c as f32);
        let rgb = image::RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = a as f32 / 255.0;
            let mix = |c: u8, bg: f32| to_channel(c as f32 * alpha + bg * (1.0 - alpha));
            image::Rgb([mix(r, bg[0]), mix(g, bg[1]), mix(b, bg[2])])
        });
        Self {
            image: DynamicImage::ImageRgb8(rgb),
        }
    }

    /// Encode to an in-memory buffer.
    pub fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let quality = params.quality.value() as u8;
        let mut buffer = Cursor::new(Vec::new());
        let image = match params.format {
            // JPEG has no alpha channel; any left over is dropped here.
            OutputFormat::Jpeg | OutputFormat::Jpg => DynamicImage::ImageRgb8(self.image.to_rgb8()),
            _ if self.has_alpha() => DynamicImage::ImageRgba8(self.image.to_rgba8()),
            _ => DynamicImage::ImageRgb8(self.image.to_rgb8()),
        };

        let result = match params.format {
            OutputFormat::Jpeg | OutputFormat::Jpg => {
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))
            }
            OutputFormat::Avif => image.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buffer,
                AVIF_SPEED,
                quality,
            )),
            OutputFormat::Webp => return encode_webp(&image, quality),
            OutputFormat::Png => image.write_to(&mut buffer, ImageFormat::Png),
            OutputFormat::Tiff => image.write_to(&mut buffer, ImageFormat::Tiff),
            OutputFormat::Bmp => image.write_to(&mut buffer, ImageFormat::Bmp),
            OutputFormat::Gif => image.write_to(&mut buffer, ImageFormat::Gif),
        };
        result.map_err(|e| {
            BackendError::ProcessingFailed(format!("{} encode failed: {e}", params.format))
        })?;
        Ok(buffer.into_inner())
    }
}

fn dest_in(base: &mut RgbaImage, overlay: &Overlay) {
    let offsets = overlay.offsets(base.dimensions());
    let (lw, lh) = (overlay.layer.width() as i64, overlay.layer.height() as i64);
    for (x, y, pixel) in base.enumerate_pixels_mut() {
        let (x, y) = (x as i64, y as i64);
        let coverage = offsets
            .iter()
            .find(|(ox, oy)| x >= *ox && y >= *oy && x < ox + lw && y < oy + lh)
            .map_or(0, |(ox, oy)| {
                overlay.layer.get_pixel((x - ox) as u32, (y - oy) as u32).0[3]
            });
        pixel.0[3] = ((pixel.0[3] as u16 * coverage as u16 + 127) / 255) as u8;
    }
}

/// Lossy WebP at `quality`. libwebp rejects sides above 16383 px.
fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (image.width(), image.height());
    let encoded = match image {
        DynamicImage::ImageRgba8(rgba) => {
            webp::Encoder::from_rgba(rgba, width, height).encode_simple(false, quality as f32)
        }
        other => webp::Encoder::from_rgb(&other.to_rgb8(), width, height)
            .encode_simple(false, quality as f32),
    };
    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| BackendError::ProcessingFailed(format!("webp encode failed: {e:?}")))
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
