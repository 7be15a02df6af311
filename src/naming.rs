//! Output filename resolution.
//!
//! Exactly one of two branches applies per image:
//!
//! - **Custom name**: a non-blank custom base, optionally slugified. In a
//!   batch of more than one file the 1-based index is appended, zero-padded
//!   to three digits (`shoe_002`). Single-file runs get no suffix.
//! - **Source name**: the source file stem, optionally slugified, followed by
//!   `_` and a millisecond timestamp (`photo_20261016093005123`).
//!
//! The final filename is `{base}.{extension}`.

use crate::config::BatchPosition;
use crate::slug::optimize_filename;
use chrono::{Local, NaiveDateTime};
use std::path::Path;

/// `YYYYMMDDHHMMSSmmm`
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Source of "now" for timestamp naming. Injected so runs are reproducible.
pub trait Clock: Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn custom_base(custom_name: Option<&str>) -> Option<&str> {
    custom_name.map(str::trim).filter(|n| !n.is_empty())
}

fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Base filename (no extension) for one output.
pub fn resolve_base_name(
    source: &Path,
    custom_name: Option<&str>,
    seo: bool,
    batch: BatchPosition,
    clock: &dyn Clock,
) -> String {
    let slugify = |name: &str| {
        if seo {
            optimize_filename(name)
        } else {
            name.to_string()
        }
    };

    match custom_base(custom_name) {
        Some(name) => {
            let base = slugify(name);
            if batch.total > 1 {
                format!("{base}_{:03}", batch.current_index.max(1))
            } else {
                base
            }
        }
        None => format!(
            "{}_{}",
            slugify(&source_stem(source)),
            format_timestamp(clock.now())
        ),
    }
}

/// Full output filename: `{base}.{extension}`.
pub fn resolve_filename(
    source: &Path,
    custom_name: Option<&str>,
    seo: bool,
    batch: BatchPosition,
    extension: &str,
    clock: &dyn Clock,
) -> String {
    format!(
        "{}.{extension}",
        resolve_base_name(source, custom_name, seo, batch, clock)
    )
}

/// The name the user will see, before batch index or timestamp are added.
pub fn preview_filename(source_name: &str, custom_name: Option<&str>, seo: bool) -> String {
    let name = match custom_base(custom_name) {
        Some(name) => name.to_string(),
        None => source_stem(Path::new(source_name)),
    };
    if seo { optimize_filename(&name) } else { name }
}
