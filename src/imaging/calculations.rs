//! Pure calculation functions for image dimensions and color formulas.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{FitMode, LinearTransform, Modulation, ResizeParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fraction of the base image a watermark image may occupy on each axis.
pub const WATERMARK_MAX_FRACTION: f64 = 0.4;

/// Aspect-ratio crop preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CropRatio {
    #[default]
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "custom")]
    Custom,
}

impl std::str::FromStr for CropRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(CropRatio::Free),
            "1:1" => Ok(CropRatio::Square),
            "16:9" => Ok(CropRatio::Widescreen),
            "4:3" => Ok(CropRatio::Standard),
            "custom" => Ok(CropRatio::Custom),
            other => Err(format!("unknown crop ratio: {other}")),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
    #[error("resolved target size {width:?}x{height:?} has a zero dimension")]
    Degenerate {
        width: Option<u32>,
        height: Option<u32>,
    },
}

/// Raw geometry inputs gathered from the processing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    /// `Some` only when cropping is enabled.
    pub crop: Option<CropRatio>,
}

/// Resolve the resize to run, or `None` when neither resize nor crop applies.
///
/// Zero-valued target dimensions are treated as absent. An aspect crop forces
/// `cover`, seeds missing targets from the natural size, and then derives the
/// exact ratio:
///
/// ```
/// # use photokit::imaging::{CropRatio, GeometryRequest, FitMode, resolve_geometry};
/// let req = GeometryRequest { crop: Some(CropRatio::Square), ..Default::default() };
/// let params = resolve_geometry(&req, (2000, 1000)).unwrap().unwrap();
/// assert_eq!((params.width, params.height), (Some(1000), Some(1000)));
/// assert_eq!(params.fit, FitMode::Cover);
/// ```
pub fn resolve_geometry(
    request: &GeometryRequest,
    natural: (u32, u32),
) -> Result<Option<ResizeParams>, GeometryError> {
    let (nat_w, nat_h) = natural;
    let mut width = request.width.filter(|&w| w > 0);
    let mut height = request.height.filter(|&h| h > 0);
    let mut fit = request.fit;

    if let Some(ratio) = request.crop.filter(|&r| r != CropRatio::Free) {
        fit = FitMode::Cover;

        if width.is_none() && height.is_none() {
            width = Some(nat_w);
            height = Some(nat_h);
        }

        match ratio {
            CropRatio::Square => {
                let size = width.unwrap_or(nat_w).min(height.unwrap_or(nat_h));
                width = Some(size);
                height = Some(size);
            }
            CropRatio::Widescreen => {
                (width, height) = derive_ratio(width, height, natural, (16, 9));
            }
            CropRatio::Standard => {
                (width, height) = derive_ratio(width, height, natural, (4, 3));
            }
            // The cover resize itself performs the crop to the user's box.
            CropRatio::Custom | CropRatio::Free => {}
        }
    }

    if width.is_none() && height.is_none() {
        return Ok(None);
    }
    if width == Some(0) || height == Some(0) {
        return Err(GeometryError::Degenerate { width, height });
    }

    Ok(Some(ResizeParams {
        width,
        height,
        fit,
        without_enlargement: false,
    }))
}

/// Derive one side of a `ratio_w:ratio_h` box from the other.
///
/// Width wins when both are present. A height derived from a width never
/// exceeds the natural height: it is clamped and the width re-derived.
fn derive_ratio(
    width: Option<u32>,
    height: Option<u32>,
    natural: (u32, u32),
    ratio: (u32, u32),
) -> (Option<u32>, Option<u32>) {
    let (rw, rh) = (ratio.0 as f64, ratio.1 as f64);
    let height_for = |w: u32| (w as f64 * rh / rw).round() as u32;
    let width_for = |h: u32| (h as f64 * rw / rh).round() as u32;

    let from_width = |w: u32| {
        let h = height_for(w);
        if h > natural.1 {
            (Some(width_for(natural.1)), Some(natural.1))
        } else {
            (Some(w), Some(h))
        }
    };

    match (width, height) {
        (Some(w), _) => from_width(w),
        (None, Some(h)) => (Some(width_for(h)), Some(h)),
        (None, None) => from_width(natural.0),
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h)
    }
}

/// Calculate the largest dimensions that fit inside a target area.
///
/// One dimension will match exactly, the other may fall short.
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(1);
        (w, h)
    } else {
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(1);
        (w, h)
    }
}

/// Outcome of a resize: the size pixels are scaled to, and the final canvas.
///
/// `cover` crops `scaled` down to `canvas`; `contain` pads `scaled` up to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub scaled: (u32, u32),
    pub canvas: (u32, u32),
}

/// Work out how a resize transforms an image of `source` size.
pub fn plan_resize(source: (u32, u32), params: &ResizeParams) -> ResizePlan {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return ResizePlan {
            scaled: source,
            canvas: source,
        };
    }

    let target = match (params.width, params.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, ((w as f64 * src_h as f64 / src_w as f64).round() as u32).max(1)),
        (None, Some(h)) => (((h as f64 * src_w as f64 / src_h as f64).round() as u32).max(1), h),
        (None, None) => source,
    };
    let both_given = params.width.is_some() && params.height.is_some();

    let (scaled, canvas) = if !both_given {
        (target, target)
    } else {
        match params.fit {
            FitMode::Cover => (calculate_fill_dimensions(source, target), target),
            FitMode::Contain => (calculate_fit_dimensions(source, target), target),
            FitMode::Fill => (target, target),
            FitMode::Inside => {
                let d = calculate_fit_dimensions(source, target);
                (d, d)
            }
            FitMode::Outside => {
                let d = calculate_fill_dimensions(source, target);
                (d, d)
            }
        }
    };

    if params.without_enlargement && (scaled.0 > src_w || scaled.1 > src_h) {
        let canvas = match params.fit {
            FitMode::Cover if both_given => (target.0.min(src_w), target.1.min(src_h)),
            _ => source,
        };
        return ResizePlan {
            scaled: source,
            canvas,
        };
    }

    ResizePlan { scaled, canvas }
}

/// Mid-gray pivot contrast as a linear transform.
///
/// `offset = -(128 * contrast) + 128`: identity at `1.0`, flat gray at `0.0`.
pub fn contrast_transform(contrast: f32) -> LinearTransform {
    LinearTransform {
        multiplier: contrast,
        offset: -(128.0 * contrast) + 128.0,
    }
}

/// The combined modulation to run, or `None` when both factors are identity.
pub fn modulation_for(brightness: f32, saturation: f32) -> Option<Modulation> {
    (brightness != 1.0 || saturation != 1.0).then_some(Modulation {
        brightness,
        saturation,
    })
}

/// Bounding box a watermark image is shrunk into: 40% of the base per axis.
pub fn watermark_bounds(base: (u32, u32)) -> (u32, u32) {
    let w = (base.0 as f64 * WATERMARK_MAX_FRACTION).floor() as u32;
    let h = (base.1 as f64 * WATERMARK_MAX_FRACTION).floor() as u32;
    (w.max(1), h.max(1))
}

/// Whether a watermark of size `mark` must be shrunk to sit on `base`.
pub fn watermark_needs_resize(mark: (u32, u32), base: (u32, u32)) -> bool {
    let (max_w, max_h) = watermark_bounds(base);
    mark.0 > base.0 || mark.1 > base.1 || mark.0 > max_w || mark.1 > max_h
}

/// Text watermark font size: a percentage of the shorter base side, floored.
pub fn text_font_size(base: (u32, u32), percent: f32) -> u32 {
    (base.0.min(base.1) as f64 * percent as f64 / 100.0).floor() as u32
}

/// Canvas needed to hold an image rotated by `degrees` without clipping.
pub fn rotated_bounds(size: (u32, u32), degrees: i32) -> (u32, u32) {
    let normalized = degrees.rem_euclid(360);
    match normalized {
        0 | 180 => size,
        90 | 270 => (size.1, size.0),
        _ => {
            let theta = (normalized as f64).to_radians();
            let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
            let (w, h) = (size.0 as f64, size.1 as f64);
            (
                ((w * cos + h * sin).round() as u32).max(1),
                ((w * sin + h * cos).round() as u32).max(1),
            )
        }
    }
}
