//! End-to-end runs of the pipeline against real files with the pure-Rust
//! backend.

use chrono::NaiveDate;
use image::{GenericImageView, Rgb, RgbImage};
use photokit::background::{BackgroundRemover, RemovalError};
use photokit::config::ProcessingOptions;
use photokit::imaging::{CropRatio, OutputFormat, RustBackend};
use photokit::naming::FixedClock;
use photokit::process::{Pipeline, ProcessingResult, expand_inputs};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct NoRemoval;

impl BackgroundRemover for NoRemoval {
    fn remove_background(&self, _: &[u8], _: &str) -> Result<Vec<u8>, RemovalError> {
        Err(RemovalError::NotConfigured)
    }
}

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_milli_opt(8, 30, 0, 250)
            .unwrap(),
    )
}

fn write_source(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
        .save(&path)
        .unwrap();
    path
}

fn options_into(dir: &Path) -> ProcessingOptions {
    let mut options = ProcessingOptions::default();
    options.output.directory = Some(dir.to_path_buf());
    options
}

fn run(sources: &[PathBuf], options: &ProcessingOptions) -> Vec<ProcessingResult> {
    let backend = RustBackend::new();
    let clock = clock();
    Pipeline {
        backend: &backend,
        remover: &NoRemoval,
        clock: &clock,
    }
    .process_batch(sources, options, None)
}

fn output_of(result: &ProcessingResult) -> &Path {
    assert!(result.success, "{:?}", result.error);
    result.output_path.as_deref().unwrap()
}

#[test]
fn square_crop_uses_the_short_side() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "wide.png", 400, 200);
    let mut options = options_into(&tmp.path().join("out"));
    options.crop.enabled = true;
    options.crop.ratio = CropRatio::Square;
    options.output.format = OutputFormat::Png;

    let results = run(&[source], &options);
    let img = image::open(output_of(&results[0])).unwrap();
    assert_eq!(img.dimensions(), (200, 200));
}

#[test]
fn custom_name_for_a_single_file() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "IMG_0001.png", 64, 48);
    let mut options = options_into(&tmp.path().join("out"));
    options.naming.custom_name = Some("shoe".into());
    options.output.format = OutputFormat::Webp;

    let results = run(&[source], &options);
    let output = output_of(&results[0]);
    assert!(output.ends_with("shoe.webp"), "{}", output.display());
    assert!(output.exists());
}

#[test]
fn batch_outputs_are_indexed_in_input_order() {
    let tmp = TempDir::new().unwrap();
    let sources: Vec<_> = ["c.png", "a.png", "b.png"]
        .iter()
        .map(|name| write_source(tmp.path(), name, 32, 32))
        .collect();
    let mut options = options_into(&tmp.path().join("out"));
    options.naming.custom_name = Some("Red Shoe".into());
    options.naming.seo = true;
    options.output.format = OutputFormat::Png;

    let results = run(&sources, &options);
    let names: Vec<_> = results
        .iter()
        .map(|r| output_of(r).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["red-shoe_001.png", "red-shoe_002.png", "red-shoe_003.png"]
    );
    assert_eq!(results[1].source, sources[1]);
}

#[test]
fn rounded_corners_in_jpeg_are_flattened_onto_white() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "card.png", 200, 100);
    let mut options = options_into(&tmp.path().join("out"));
    options.border.radius = 30;
    options.output.format = OutputFormat::Jpeg;

    let results = run(&[source], &options);
    let img = image::open(output_of(&results[0])).unwrap();
    assert!(!img.color().has_alpha());

    let rgb = img.to_rgb8();
    let corner = rgb.get_pixel(0, 0);
    assert!(corner.0.iter().all(|&c| c > 200), "corner {corner:?}");
    let center = rgb.get_pixel(100, 50);
    assert!(center[0] > 150 && center[1] < 90, "center {center:?}");
}

#[test]
fn rounded_corners_in_png_stay_transparent() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "card.png", 200, 100);
    let mut options = options_into(&tmp.path().join("out"));
    options.border.radius = 30;
    options.output.format = OutputFormat::Png;

    let results = run(&[source], &options);
    let img = image::open(output_of(&results[0])).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0)[3], 0);
    assert_eq!(img.get_pixel(100, 50)[3], 255);
}

#[test]
fn missing_watermark_image_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "photo.png", 64, 64);
    let mut options = options_into(&tmp.path().join("out"));
    options.watermark.image = Some(tmp.path().join("no-such-logo.png"));

    let results = run(&[source], &options);
    assert!(output_of(&results[0]).exists());
}

#[test]
fn image_watermark_is_composited() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "photo.png", 100, 100);
    let logo = tmp.path().join("logo.png");
    RgbImage::from_pixel(10, 10, Rgb([0, 0, 255])).save(&logo).unwrap();
    let mut options = options_into(&tmp.path().join("out"));
    options.watermark.image = Some(logo);
    options.output.format = OutputFormat::Png;

    let results = run(&[source], &options);
    let img = image::open(output_of(&results[0])).unwrap().to_rgb8();
    assert_eq!(img.get_pixel(50, 50), &Rgb([0, 0, 255]));
    assert_eq!(img.get_pixel(5, 5), &Rgb([200, 30, 30]));
}

#[test]
fn text_watermark_draws_glyphs() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "photo.png", 400, 200);
    let mut options = options_into(&tmp.path().join("out"));
    options.watermark.text = Some("SAMPLE".into());
    options.watermark.font_size_percent = 30.0;
    options.watermark.opacity = 1.0;
    options.output.format = OutputFormat::Png;

    let results = run(&[source], &options);
    let img = image::open(output_of(&results[0])).unwrap().to_rgb8();
    let lit = img.pixels().filter(|p| p[1] > 150).count();
    assert!(
        lit > 500,
        "expected white text pixels, found {lit}; are any system fonts installed?"
    );
    assert_eq!(img.get_pixel(2, 2), &Rgb([200, 30, 30]));
}

#[test]
fn unknown_preset_writes_only_the_primary() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let source = write_source(tmp.path(), "photo.png", 64, 64);
    let mut options = options_into(&out);
    options.variants.presets = vec!["poster".into()];

    let results = run(&[source], &options);
    assert!(results[0].success);
    assert!(results[0].variants.is_empty());
    assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
}

#[test]
fn preset_variant_is_derived_from_the_output() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "photo.png", 400, 200);
    let mut options = options_into(&tmp.path().join("out"));
    options.naming.custom_name = Some("hero".into());
    options.output.format = OutputFormat::Png;
    options.variants.presets = vec!["thumbnail".into()];

    let results = run(&[source], &options);
    let variant = results[0].variants[0].path.clone().unwrap();
    assert!(variant.ends_with("hero-thumbnail.png"));
    assert_eq!(image::open(&variant).unwrap().dimensions(), (200, 100));
}

#[test]
fn variants_never_enlarge() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "small.png", 80, 60);
    let mut options = options_into(&tmp.path().join("out"));
    options.output.format = OutputFormat::Png;
    options.variants.presets = vec!["large".into()];

    let results = run(&[source], &options);
    let variant = results[0].variants[0].path.clone().unwrap();
    assert_eq!(image::open(&variant).unwrap().dimensions(), (80, 60));
}

#[test]
fn fixed_clock_runs_are_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(tmp.path(), "photo.png", 120, 90);
    let mut first = options_into(&tmp.path().join("one"));
    first.border.radius = 12;
    first.border.width = 4;
    first.color.contrast = 1.3;
    first.orientation.rotate = 90;
    let mut second = first.clone();
    second.output.directory = Some(tmp.path().join("two"));

    let a = run(&[source.clone()], &first);
    let b = run(&[source], &second);
    let (a, b) = (output_of(&a[0]), output_of(&b[0]));
    assert_eq!(a.file_name(), b.file_name());
    assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
}

#[test]
fn one_bad_source_does_not_fail_the_batch() {
    let tmp = TempDir::new().unwrap();
    let good = write_source(tmp.path(), "good.png", 32, 32);
    let corrupt = tmp.path().join("corrupt.png");
    fs::write(&corrupt, b"not an image").unwrap();
    let missing = tmp.path().join("missing.png");

    let results = run(
        &[good, corrupt, missing],
        &options_into(&tmp.path().join("out")),
    );
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(!results[2].success);
    assert!(results[2].error.as_deref().unwrap().contains("not found"));
}

#[test]
fn directories_expand_to_their_images() {
    let tmp = TempDir::new().unwrap();
    write_source(tmp.path(), "b.png", 16, 16);
    write_source(tmp.path(), "a.png", 16, 16);
    fs::write(tmp.path().join("readme.txt"), "x").unwrap();

    let sources = expand_inputs(&[tmp.path().to_path_buf()]);
    assert_eq!(sources, vec![tmp.path().join("a.png"), tmp.path().join("b.png")]);

    let results = run(&sources, &ProcessingOptions::default());
    assert!(results.iter().all(|r| r.success));
    assert_eq!(
        expand_inputs(&[tmp.path().to_path_buf()]).len(),
        2,
        "processed/ output is not picked up again"
    );
}
