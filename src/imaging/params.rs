//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the pipeline stages (which decide what operations to run,
//! in what order) and the [`backend`](super::backend) /
//! [`session`](super::session) (which do the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`FitMode`] — Resize policy (`cover`, `contain`, `fill`, `inside`, `outside`).
//! - [`ResizeParams`] — Target box, fit mode and enlargement policy for one resize.
//! - [`Modulation`] / [`LinearTransform`] — Color adjustment parameters.
//! - [`Color`] — RGBA color parsed from `#rgb` / `#rrggbb` / `#rrggbbaa`.
//! - [`OutputFormat`] / [`EncodeParams`] — Final encode settings.
//! - [`VariantParams`] — File-to-file resize used for auxiliary size exports.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Parse a user-supplied quality. Non-numeric input yields the default.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => Self::from_i64(n),
            Err(_) => Self::default(),
        }
    }

    fn from_i64(n: i64) -> Self {
        Self(n.clamp(1, 100) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

impl Serialize for Quality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Quality::from_i64(n),
            Raw::Float(f) if f.is_finite() => Quality::from_i64(f.trunc() as i64),
            Raw::Float(_) => Quality::default(),
            Raw::Text(s) => Quality::parse(&s),
        })
    }
}

/// Resize policy.
///
/// - `cover`: fill the target box, cropping overflow (center gravity)
/// - `contain`: fit inside the box, letterboxing to the exact box size
/// - `fill`: stretch to the exact box, ignoring aspect ratio
/// - `inside`: fit inside the box, output may be smaller than the box
/// - `outside`: cover the box without cropping, output may be larger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Cover,
    Contain,
    Fill,
    Inside,
    Outside,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FitMode::Cover => "cover",
            FitMode::Contain => "contain",
            FitMode::Fill => "fill",
            FitMode::Inside => "inside",
            FitMode::Outside => "outside",
        };
        f.write_str(name)
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            "inside" => Ok(FitMode::Inside),
            "outside" => Ok(FitMode::Outside),
            other => Err(format!("unknown fit mode: {other}")),
        }
    }
}

/// Parameters for a single resize.
///
/// At least one of `width`/`height` is set; a missing side is derived from
/// the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    pub without_enlargement: bool,
}

impl ResizeParams {
    pub fn exact(width: u32, height: u32, fit: FitMode) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            fit,
            without_enlargement: false,
        }
    }
}

/// Combined brightness/saturation multiplier. `1.0` is identity for both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    pub brightness: f32,
    pub saturation: f32,
}

/// Per-channel affine transform `out = multiplier * in + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransform {
    pub multiplier: f32,
    pub offset: f32,
}

/// An sRGB color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `#rrggbb` form, alpha dropped. Used inside SVG paint attributes.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha as an SVG opacity in `[0, 1]`.
    pub fn opacity(self) -> f32 {
        self.a as f32 / 255.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #rgb, #rrggbb or #rrggbbaa")]
pub struct ColorParseError(String);

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|n| n * 17)
                .map_err(|_| err())
        };
        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_hex())
        } else {
            write!(f, "{}{:02x}", self.to_hex(), self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Output encoding. `jpg` and `jpeg` both encode JPEG but keep their own
/// file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Jpg,
    Png,
    Webp,
    Avif,
    Tiff,
    Bmp,
    Gif,
}

impl OutputFormat {
    /// File extension, identical to the configured format name.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
        }
    }

    /// Formats that cannot store transparency and must be flattened first.
    pub fn requires_flatten(self) -> bool {
        matches!(
            self,
            OutputFormat::Jpeg | OutputFormat::Jpg | OutputFormat::Bmp | OutputFormat::Tiff
        )
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" => Ok(OutputFormat::Jpeg),
            "jpg" => Ok(OutputFormat::Jpg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            "bmp" => Ok(OutputFormat::Bmp),
            "gif" => Ok(OutputFormat::Gif),
            other => Err(format!("unsupported output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Final encode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for a file-to-file resize (auxiliary size exports).
#[derive(Debug, Clone, PartialEq)]
pub struct VariantParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub resize: ResizeParams,
    pub encode: EncodeParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn quality_parse_falls_back_on_garbage() {
        assert_eq!(Quality::parse("high").value(), 80);
        assert_eq!(Quality::parse("").value(), 80);
        assert_eq!(Quality::parse(" 65 ").value(), 65);
        assert_eq!(Quality::parse("-4").value(), 1);
    }

    #[test]
    fn quality_deserializes_from_int_or_string() {
        #[derive(Deserialize)]
        struct Wrap {
            q: Quality,
        }
        let w: Wrap = toml::from_str("q = 72").unwrap();
        assert_eq!(w.q.value(), 72);
        let w: Wrap = toml::from_str("q = \"90\"").unwrap();
        assert_eq!(w.q.value(), 90);
        let w: Wrap = toml::from_str("q = \"best\"").unwrap();
        assert_eq!(w.q.value(), 80);
        let w: Wrap = toml::from_str("q = 400").unwrap();
        assert_eq!(w.q.value(), 100);
    }

    #[test]
    fn color_parses_all_hex_forms() {
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#000000".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!(
            "#11223380".parse::<Color>().unwrap(),
            Color {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x80
            }
        );
    }

    #[test]
    fn color_rejects_malformed_input() {
        assert!("fff".parse::<Color>().is_err());
        assert!("#ggg".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#é1".parse::<Color>().is_err());
    }

    #[test]
    fn color_display_roundtrips_alpha_only_when_translucent() {
        assert_eq!(Color::rgb(255, 0, 16).to_string(), "#ff0010");
        let translucent = Color {
            a: 0x40,
            ..Color::BLACK
        };
        assert_eq!(translucent.to_string(), "#00000040");
    }

    #[test]
    fn fit_mode_parses_and_displays() {
        assert_eq!("Inside".parse::<FitMode>().unwrap(), FitMode::Inside);
        assert_eq!(FitMode::Outside.to_string(), "outside");
        assert!("stretch".parse::<FitMode>().is_err());
    }

    #[test]
    fn output_format_flatten_set() {
        assert!(OutputFormat::Jpeg.requires_flatten());
        assert!(OutputFormat::Jpg.requires_flatten());
        assert!(OutputFormat::Bmp.requires_flatten());
        assert!(OutputFormat::Tiff.requires_flatten());
        assert!(!OutputFormat::Png.requires_flatten());
        assert!(!OutputFormat::Webp.requires_flatten());
    }

    #[test]
    fn output_format_keeps_jpg_extension() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap().extension(), "jpg");
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap().extension(), "jpeg");
        assert!("heic".parse::<OutputFormat>().is_err());
    }
}
