//! Processing configuration module.
//!
//! Handles loading and validating the TOML file that describes one transform
//! run. Every section is optional; missing keys fall back to the defaults
//! shown below, and CLI flags override whatever the file says.
//!
//! ## Configuration Options
//!
//! ```toml
//! [resize]
//! width = 1200              # Target width in pixels (omit for none)
//! height = 800              # Target height in pixels (omit for none)
//! fit = "cover"             # cover | contain | fill | inside | outside
//!
//! [crop]
//! enabled = false
//! ratio = "free"            # free | "1:1" | "16:9" | "4:3" | custom
//!
//! [orientation]
//! rotate = 0                # Degrees clockwise
//! flip_horizontal = false
//! flip_vertical = false
//!
//! [color]
//! brightness = 1.0
//! contrast = 1.0
//! saturation = 1.0
//!
//! [border]
//! radius = 0                # Corner radius in pixels
//! width = 0                 # Stroke width in pixels
//! color = "#000000"
//!
//! [watermark]
//! image = "logo.png"        # Omit for none
//! text = "© Studio"         # Omit for none
//! position = "center"       # center | southeast | tile
//! color = "#ffffff"
//! font_size_percent = 6.0   # Of the shorter image side
//! opacity = 0.6             # Clamped to 0..1
//!
//! [output]
//! format = "jpeg"           # jpeg | jpg | png | webp | avif | tiff | bmp | gif
//! quality = 80              # 1-100; non-numeric strings fall back to 80
//! directory = "out"         # Default: <source dir>/processed
//! flatten_background = "#ffffff"
//!
//! [naming]
//! custom_name = "shoe"      # Omit to keep the source name plus a timestamp
//! seo = false
//!
//! [variants]
//! presets = ["small", "og"]
//! custom = [{ width = 640, height = 480, suffix = "-card", fit = "cover" }]
//!
//! [background]
//! remove = false
//! endpoint = "https://..."  # Background-removal service
//! api_key_env = "PHOTOKIT_BG_API_KEY"
//! timeout_secs = 60
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    Color, CropRatio, FitMode, GeometryRequest, OutputFormat, Quality, WatermarkPosition,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything one pipeline invocation needs to know.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingOptions {
    pub resize: ResizeConfig,
    pub crop: CropConfig,
    pub orientation: OrientationConfig,
    pub color: ColorConfig,
    pub border: BorderConfig,
    pub watermark: WatermarkConfig,
    pub output: OutputConfig,
    pub naming: NamingConfig,
    pub variants: VariantsConfig,
    pub background: BackgroundConfig,
    pub processing: ProcessingConfig,
    /// Position of this image within its batch. Set per image by the caller,
    /// never read from the config file.
    #[serde(skip)]
    pub batch: BatchPosition,
}

impl ProcessingOptions {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("color.brightness", self.color.brightness),
            ("color.contrast", self.color.contrast),
            ("color.saturation", self.color.saturation),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a finite number"
                )));
            }
        }
        let percent = self.watermark.font_size_percent;
        if !percent.is_finite() || percent < 0.0 {
            return Err(ConfigError::Validation(
                "watermark.font_size_percent must be a non-negative number".into(),
            ));
        }
        if let Some(bad) = self
            .variants
            .custom
            .iter()
            .find(|v| v.width == 0 || v.height == 0)
        {
            return Err(ConfigError::Validation(format!(
                "variants.custom entries need non-zero width and height (got {}x{})",
                bad.width, bad.height
            )));
        }
        if self.batch.current_index == 0 || self.batch.total == 0 {
            return Err(ConfigError::Validation(
                "batch index and total are 1-based".into(),
            ));
        }
        Ok(())
    }

    /// The geometry inputs, with the crop ratio only when cropping is on.
    pub fn geometry_request(&self) -> GeometryRequest {
        GeometryRequest {
            width: self.resize.width,
            height: self.resize.height,
            fit: self.resize.fit,
            crop: self.crop.enabled.then_some(self.crop.ratio),
        }
    }

    /// Copy of these options positioned at `current_index` of `total`.
    pub fn for_batch(&self, current_index: usize, total: usize) -> Self {
        Self {
            batch: BatchPosition {
                current_index,
                total,
            },
            ..self.clone()
        }
    }
}

/// Target size and fit mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
}

/// Aspect-ratio cropping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    pub enabled: bool,
    pub ratio: CropRatio,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrientationConfig {
    /// Clockwise rotation in degrees. Zero skips the step.
    pub rotate: i32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

/// Brightness, contrast and saturation factors. `1.0` is identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

/// Rounded corners and border stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BorderConfig {
    pub radius: u32,
    pub width: u32,
    pub color: Color,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            radius: 0,
            width: 0,
            color: Color::BLACK,
        }
    }
}

/// Image and text watermarks. Either, both, or neither may be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub image: Option<PathBuf>,
    pub text: Option<String>,
    pub position: WatermarkPosition,
    pub color: Color,
    pub font_size_percent: f32,
    pub opacity: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            image: None,
            text: None,
            position: WatermarkPosition::Center,
            color: Color::WHITE,
            font_size_percent: 6.0,
            opacity: 0.6,
        }
    }
}

impl WatermarkConfig {
    /// Text opacity clamped to `[0, 1]`; NaN counts as fully transparent.
    pub fn effective_opacity(&self) -> f32 {
        if self.opacity.is_nan() {
            0.0
        } else {
            self.opacity.clamp(0.0, 1.0)
        }
    }

    /// Watermark text, if any non-blank text is configured.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Encoding and destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Output directory. `None` means `<source dir>/processed`.
    pub directory: Option<PathBuf>,
    /// Color transparent pixels are flattened onto for alpha-less formats.
    pub flatten_background: Color,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: Quality::default(),
            directory: None,
            flatten_background: Color::WHITE,
        }
    }
}

impl OutputConfig {
    /// The configured directory, or `processed/` next to `source`.
    pub fn directory_for(&self, source: &Path) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("processed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub custom_name: Option<String>,
    /// Slugify the chosen base name.
    pub seo: bool,
}

/// Auxiliary sizes exported after the primary file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantsConfig {
    /// Keys into the preset table. Unknown keys are skipped.
    pub presets: Vec<String>,
    pub custom: Vec<CustomVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomVariant {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub fit: Option<FitMode>,
}

/// Background removal service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    pub remove: bool,
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            remove: false,
            endpoint: None,
            api_key_env: None,
            timeout_secs: 60,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// 1-based position of an image within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPosition {
    pub current_index: usize,
    pub total: usize,
}

impl Default for BatchPosition {
    fn default() -> Self {
        Self {
            current_index: 1,
            total: 1,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Load options from `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ProcessingOptions, ConfigError> {
    let options = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProcessingOptions::default(),
    };
    options.validate()?;
    Ok(options)
}

/// A documented config file with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r##"# photokit configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
# Target size in pixels. Give one side to keep the aspect ratio.
# width = 1200
# height = 800

# cover | contain | fill | inside | outside
fit = "cover"

# ---------------------------------------------------------------------------
# Aspect-ratio crop (forces fit = "cover")
# ---------------------------------------------------------------------------
[crop]
enabled = false

# free | "1:1" | "16:9" | "4:3" | custom
ratio = "free"

# ---------------------------------------------------------------------------
# Orientation
# ---------------------------------------------------------------------------
[orientation]
# Clockwise degrees. Quarter turns are exact.
rotate = 0
flip_horizontal = false
flip_vertical = false

# ---------------------------------------------------------------------------
# Color (1.0 = unchanged)
# ---------------------------------------------------------------------------
[color]
brightness = 1.0
contrast = 1.0
saturation = 1.0

# ---------------------------------------------------------------------------
# Rounded corners and border
# ---------------------------------------------------------------------------
[border]
radius = 0
width = 0
color = "#000000"

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
# image = "logo.png"
# text = "Sample"

# center | southeast | tile
position = "center"
color = "#ffffff"

# Text size as a percentage of the shorter image side.
font_size_percent = 6.0
opacity = 0.6

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# jpeg | jpg | png | webp | avif | tiff | bmp | gif
format = "jpeg"
quality = 80

# Default: a "processed" directory next to each source image.
# directory = "out"

# Transparent pixels are flattened onto this color for jpeg, bmp and tiff.
flatten_background = "#ffffff"

# ---------------------------------------------------------------------------
# Naming
# ---------------------------------------------------------------------------
[naming]
# Without a custom name, outputs are named <source>_<timestamp>.
# custom_name = "product"
seo = false

# ---------------------------------------------------------------------------
# Extra sizes, exported from the finished image
# ---------------------------------------------------------------------------
[variants]
# thumbnail | small | medium | large | og
presets = []
# custom = [{ width = 640, height = 480, suffix = "-card", fit = "inside" }]
custom = []

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[background]
remove = false
# endpoint = "https://example.invalid/remove-background"
# api_key_env = "PHOTOKIT_BG_API_KEY"
timeout_secs = 60

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit to use all CPU cores.
# max_processes = 4
"##
}
