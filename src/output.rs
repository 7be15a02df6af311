//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so output is
//! unit tested without capturing stdout. The `print_*` wrappers just write
//! those lines.
//!
//! ## Process
//!
//! ```text
//! Processing 3 images
//! 001 IMG_0001.jpg → photos/processed/shoe_001.webp
//!     small: photos/processed/shoe_001-small.webp
//!     og: failed (Processing failed: ...)
//! 002 missing.jpg: failed
//!     Source image not found: photos/missing.jpg
//!
//! 2 written, 1 failed
//! ```

use crate::presets::SizePreset;
use crate::process::{ProcessEvent, ProcessingResult};
use std::path::Path;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format a single process progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Processing {total} {noun}")]
        }
        ProcessEvent::ImageProcessed { index, result, .. } => format_result(*index, result),
    }
}

fn format_result(index: usize, result: &ProcessingResult) -> Vec<String> {
    let source = file_label(&result.source);
    let mut lines = Vec::new();
    match (&result.output_path, &result.error) {
        (Some(output), _) if result.success => {
            lines.push(format!("{index:03} {source} \u{2192} {}", output.display()));
        }
        (_, error) => {
            lines.push(format!("{index:03} {source}: failed"));
            if let Some(error) = error {
                lines.push(format!("{}{error}", indent(1)));
            }
        }
    }
    for variant in &result.variants {
        let status = match (&variant.path, &variant.error) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(error)) => format!("failed ({error})"),
            (None, None) => "skipped".to_string(),
        };
        lines.push(format!("{}{}: {status}", indent(1), variant.label));
    }
    lines
}

/// Closing summary line for a batch.
pub fn format_summary(results: &[ProcessingResult]) -> String {
    let failed = results.iter().filter(|r| !r.success).count();
    format!("{} written, {failed} failed", results.len() - failed)
}

/// Table of the built-in size presets.
pub fn format_presets(presets: &[SizePreset]) -> Vec<String> {
    presets
        .iter()
        .map(|p| {
            let fit = p
                .fit
                .map(|f| f.to_string())
                .unwrap_or_else(|| "inside".to_string());
            format!(
                "{:<10} {:>5}x{:<5} {:<11} {fit}",
                p.key, p.width, p.height, p.suffix
            )
        })
        .collect()
}

pub fn print_presets(presets: &[SizePreset]) {
    for line in format_presets(presets) {
        println!("{}", line);
    }
}
