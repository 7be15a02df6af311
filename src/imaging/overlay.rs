//! Overlay command queue.
//!
//! Masks, borders and watermarks are all expressed as [`Overlay`]s: a decoded
//! RGBA layer plus how to blend it and where to put it. A stage appends to a
//! `Vec<Overlay>`; the list order is the paint order, so it can be inspected
//! in tests before anything is composited.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// How an overlay combines with the pixels beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-over alpha compositing.
    Over,
    /// Keep base pixels only where the overlay is opaque.
    DestIn,
}

/// Where an overlay is anchored on the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Center,
    Southeast,
    Tile,
}

/// User-facing watermark position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPosition {
    #[default]
    Center,
    Southeast,
    Tile,
}

impl From<WatermarkPosition> for Placement {
    fn from(position: WatermarkPosition) -> Self {
        match position {
            WatermarkPosition::Southeast => Placement::Southeast,
            WatermarkPosition::Tile => Placement::Tile,
            WatermarkPosition::Center => Placement::Center,
        }
    }
}

/// What produced an overlay. Only used for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    CornerMask,
    Border,
    ImageWatermark,
    TextWatermark,
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub layer: RgbaImage,
    pub blend: BlendMode,
    pub placement: Placement,
}

impl Overlay {
    /// Top-left offsets at which `layer` is drawn onto a `base`-sized canvas.
    pub fn offsets(&self, base: (u32, u32)) -> Vec<(i64, i64)> {
        let (bw, bh) = (base.0 as i64, base.1 as i64);
        let (lw, lh) = (self.layer.width() as i64, self.layer.height() as i64);
        match self.placement {
            Placement::Center => vec![((bw - lw) / 2, (bh - lh) / 2)],
            Placement::Southeast => vec![(bw - lw, bh - lh)],
            Placement::Tile => {
                if lw == 0 || lh == 0 {
                    return Vec::new();
                }
                let mut offsets = Vec::new();
                let mut y = 0;
                while y < bh {
                    let mut x = 0;
                    while x < bw {
                        offsets.push((x, y));
                        x += lw;
                    }
                    y += lh;
                }
                offsets
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(w: u32, h: u32, placement: Placement) -> Overlay {
        Overlay {
            kind: OverlayKind::ImageWatermark,
            layer: RgbaImage::new(w, h),
            blend: BlendMode::Over,
            placement,
        }
    }

    #[test]
    fn center_offset() {
        assert_eq!(overlay(100, 50, Placement::Center).offsets((300, 200)), vec![(100, 75)]);
    }

    #[test]
    fn southeast_offset() {
        assert_eq!(overlay(100, 50, Placement::Southeast).offsets((300, 200)), vec![(200, 150)]);
    }

    #[test]
    fn tile_covers_canvas() {
        let offsets = overlay(100, 80, Placement::Tile).offsets((250, 160));
        assert_eq!(offsets.len(), 6);
        assert_eq!(offsets[0], (0, 0));
        assert_eq!(offsets[5], (200, 80));
    }

    #[test]
    fn position_maps_to_placement() {
        assert_eq!(Placement::from(WatermarkPosition::Southeast), Placement::Southeast);
        assert_eq!(Placement::from(WatermarkPosition::Tile), Placement::Tile);
        assert_eq!(Placement::from(WatermarkPosition::Center), Placement::Center);
    }
}
