//! Pipeline orchestration.
//!
//! Runs every stage for one source image against its own [`RasterSession`]
//! (see [`crate::imaging::RasterSession`]), then writes the result and its
//! variants:
//!
//! ```text
//! read source ─► background removal (optional, falls back to original bytes)
//!   ─► geometry ─► rotate / flip / flop ─► modulate / contrast
//!   ─► corner mask ─► overlays (border, image watermark, text watermark)
//!   ─► flatten + encode ─► name ─► atomic write ─► variants
//! ```
//!
//! ## Failure Tiers
//!
//! Geometry, decode, composite, encode and write failures fail the image and
//! are reported as `success: false`. Background removal, watermark image
//! loading and variant export failures are logged and skipped.
//!
//! ## Parallel Processing
//!
//! Batches are processed in parallel using [rayon](https://docs.rs/rayon).
//! Every image gets its own session, so nothing mutable is shared.

use crate::background::{BackgroundRemover, remove_or_keep};
use crate::config::{ConfigError, ProcessingOptions};
use crate::imaging::operations::{
    apply_color, apply_corner_mask, apply_geometry, apply_orientation, collect_overlays,
    encode_output,
};
use crate::imaging::{
    BackendError, EncodeParams, GeometryError, ImageBackend, is_supported_input, write_atomic,
};
use crate::naming::{Clock, resolve_filename};
use crate::variants::{VariantOutcome, export_variants, variant_path};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Invalid options: {0}")]
    Config(#[from] ConfigError),
    #[error("Source image not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Outcome for one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub source: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantOutcome>,
}

/// Progress events sent to the CLI printer while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BatchStarted {
        total: usize,
    },
    ImageProcessed {
        index: usize,
        total: usize,
        result: ProcessingResult,
    },
}

/// The collaborators one pipeline run needs.
pub struct Pipeline<'a, B: ImageBackend> {
    pub backend: &'a B,
    pub remover: &'a dyn BackgroundRemover,
    pub clock: &'a dyn Clock,
}

/// Output paths already handed out within one batch.
///
/// Two sources with the same stem finishing in the same millisecond resolve
/// to the same timestamped name; the later claim gets `-2`, `-3`, ... before
/// the extension so neither file replaces the other.
#[derive(Default)]
struct ClaimedPaths(Mutex<HashSet<PathBuf>>);

impl ClaimedPaths {
    fn claim(&self, path: PathBuf) -> PathBuf {
        let mut claimed = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = path.clone();
        let mut n = 2;
        while claimed.contains(&candidate) {
            candidate = variant_path(&path, &format!("-{n}"));
            n += 1;
        }
        if candidate != path {
            tracing::warn!(
                resolved = %path.display(),
                written = %candidate.display(),
                "output name already used in this batch"
            );
        }
        claimed.insert(candidate.clone());
        candidate
    }
}

impl<B: ImageBackend> Pipeline<'_, B> {
    /// Process one image. Never panics or returns early: every failure is
    /// folded into the result.
    pub fn process_image(&self, source: &Path, options: &ProcessingOptions) -> ProcessingResult {
        self.process_claimed(source, options, &ClaimedPaths::default())
    }

    fn process_claimed(
        &self,
        source: &Path,
        options: &ProcessingOptions,
        claims: &ClaimedPaths,
    ) -> ProcessingResult {
        match self.run(source, options, claims) {
            Ok((output_path, variants)) => ProcessingResult {
                source: source.to_path_buf(),
                success: true,
                output_path: Some(output_path),
                error: None,
                variants,
            },
            Err(e) => {
                tracing::error!(source = %source.display(), error = %e, "image failed");
                ProcessingResult {
                    source: source.to_path_buf(),
                    success: false,
                    output_path: None,
                    error: Some(e.to_string()),
                    variants: Vec::new(),
                }
            }
        }
    }

    /// Process `sources` in parallel. Each image is numbered by its position
    /// in `sources`; results come back in the same order.
    pub fn process_batch(
        &self,
        sources: &[PathBuf],
        options: &ProcessingOptions,
        progress: Option<Sender<ProcessEvent>>,
    ) -> Vec<ProcessingResult> {
        let total = sources.len();
        if let Some(tx) = &progress {
            tx.send(ProcessEvent::BatchStarted { total }).ok();
        }

        let claims = ClaimedPaths::default();
        sources
            .par_iter()
            .enumerate()
            .map(|(i, source)| {
                let result =
                    self.process_claimed(source, &options.for_batch(i + 1, total), &claims);
                if let Some(tx) = &progress {
                    tx.send(ProcessEvent::ImageProcessed {
                        index: i + 1,
                        total,
                        result: result.clone(),
                    })
                    .ok();
                }
                result
            })
            .collect()
    }

    fn run(
        &self,
        source: &Path,
        options: &ProcessingOptions,
        claims: &ClaimedPaths,
    ) -> Result<(PathBuf, Vec<VariantOutcome>), ProcessError> {
        options.validate()?;
        if !source.is_file() {
            return Err(ProcessError::SourceNotFound(source.to_path_buf()));
        }

        let output_dir = options.output.directory_for(source);
        std::fs::create_dir_all(&output_dir)?;

        let mut bytes = std::fs::read(source)?;
        if options.background.remove {
            bytes = remove_or_keep(self.remover, source, bytes);
        }

        let session = self.backend.open(&bytes)?;
        let session = apply_geometry(session, &options.geometry_request())?;
        let session = apply_orientation(session, &options.orientation);
        let session = apply_color(session, &options.color)?;
        let session = apply_corner_mask(self.backend, session, options.border.radius)?;
        let overlays = collect_overlays(
            self.backend,
            session.dimensions(),
            &options.border,
            &options.watermark,
        )?;
        let session = session.composite(&overlays);
        let dims = session.dimensions();
        let encoded = encode_output(session, &options.output)?;

        let filename = resolve_filename(
            source,
            options.naming.custom_name.as_deref(),
            options.naming.seo,
            options.batch,
            options.output.format.extension(),
            self.clock,
        );
        let output_path = claims.claim(output_dir.join(filename));
        write_atomic(&output_path, &encoded)?;
        tracing::info!(
            source = %source.display(),
            output = %output_path.display(),
            width = dims.width,
            height = dims.height,
            "image written"
        );

        let encode = EncodeParams {
            format: options.output.format,
            quality: options.output.quality,
        };
        let variants = export_variants(self.backend, &output_path, encode, &options.variants);
        Ok((output_path, variants))
    }
}

/// Expand CLI inputs into source images.
///
/// Files are kept as given (missing ones are reported per image later).
/// Directories are walked for supported images in name order, skipping
/// `processed/` output directories left by earlier runs.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            sources.push(input.clone());
            continue;
        }
        let walker = WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == "processed"));
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_supported_input(entry.path()) => {
                    sources.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
            }
        }
    }
    sources
}
