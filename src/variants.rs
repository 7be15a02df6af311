//! Auxiliary size exports.
//!
//! Variants are resized from the finished primary output, not the source,
//! so they carry every adjustment and overlay. Each variant succeeds or
//! fails on its own; none of them can fail the primary image.

use crate::config::VariantsConfig;
use crate::imaging::{EncodeParams, FitMode, ImageBackend, ResizeParams, VariantParams};
use crate::presets;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One size to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRequest {
    /// Preset key, or `{width}x{height}` for custom sizes.
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub suffix: String,
    pub fit: FitMode,
}

/// What happened to one requested variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantOutcome {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_suffix(width: u32, height: u32) -> String {
    format!("-{width}x{height}")
}

/// Selected presets followed by custom sizes. Unknown preset keys are
/// dropped with a warning.
pub fn requested_variants(config: &VariantsConfig) -> Vec<VariantRequest> {
    let from_presets = config.presets.iter().filter_map(|key| {
        let Some(preset) = presets::lookup(key) else {
            tracing::warn!(preset = %key, "unknown size preset, skipping");
            return None;
        };
        Some(VariantRequest {
            label: preset.key.to_string(),
            width: preset.width,
            height: preset.height,
            suffix: preset.suffix.to_string(),
            fit: preset.fit.unwrap_or(FitMode::Inside),
        })
    });

    let custom = config.custom.iter().map(|v| VariantRequest {
        label: format!("{}x{}", v.width, v.height),
        width: v.width,
        height: v.height,
        suffix: v
            .suffix
            .clone()
            .unwrap_or_else(|| default_suffix(v.width, v.height)),
        fit: v.fit.unwrap_or(FitMode::Inside),
    });

    from_presets.chain(custom).collect()
}

/// `{dir}/{stem}{suffix}.{ext}` next to the primary output.
pub fn variant_path(primary: &Path, suffix: &str) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match primary.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    primary.with_file_name(name)
}

/// Export every requested variant of `primary`, never enlarging.
pub fn export_variants(
    backend: &impl ImageBackend,
    primary: &Path,
    encode: EncodeParams,
    config: &VariantsConfig,
) -> Vec<VariantOutcome> {
    requested_variants(config)
        .into_iter()
        .map(|request| {
            let output = variant_path(primary, &request.suffix);
            let params = VariantParams {
                source: primary.to_path_buf(),
                output: output.clone(),
                resize: ResizeParams {
                    width: Some(request.width),
                    height: Some(request.height),
                    fit: request.fit,
                    without_enlargement: true,
                },
                encode,
            };
            match backend.export_variant(&params) {
                Ok(dims) => {
                    tracing::info!(
                        variant = %request.label,
                        path = %output.display(),
                        width = dims.width,
                        height = dims.height,
                        "variant written"
                    );
                    VariantOutcome {
                        label: request.label,
                        path: Some(output),
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(variant = %request.label, error = %e, "variant export failed");
                    VariantOutcome {
                        label: request.label,
                        path: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect()
}
