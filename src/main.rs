use clap::{Parser, Subcommand};
use photokit::background::HttpBackgroundRemover;
use photokit::config::{self, ProcessingOptions};
use photokit::imaging::{CropRatio, FitMode, OutputFormat, Quality, RustBackend};
use photokit::naming::{SystemClock, preview_filename};
use photokit::process::{Pipeline, expand_inputs};
use photokit::{output, presets};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photokit")]
#[command(about = "Batch image transforms for web and marketing exports")]
#[command(long_about = "\
Batch image transforms for web and marketing exports

Every source image runs through the same stages:

  geometry (resize, aspect crop) → rotate / flip → brightness, contrast,
  saturation → rounded corners → border → image watermark → text watermark
  → encode → name → write → size variants

Options come from a TOML file (see 'photokit gen-config'); command-line
flags override the file. Without --output, results land in a 'processed/'
directory next to each source.

Set RUST_LOG (e.g. RUST_LOG=photokit=debug) to control log output.")]
#[command(version)]
struct Cli {
    /// Options file (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the options file for a single run.
#[derive(clap::Args)]
struct ProcessArgs {
    /// Image files or directories (directories are searched recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output format: jpeg, png, webp, avif, tiff, bmp, gif
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoder quality 1-100 (out-of-range or non-numeric values fall back to 80)
    #[arg(long)]
    quality: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// cover, contain, fill, inside, outside
    #[arg(long)]
    fit: Option<FitMode>,

    /// Crop to an aspect ratio: 1:1, 16:9, 4:3, custom (cover-crop to --width/--height) or free (no crop)
    #[arg(long)]
    crop: Option<CropRatio>,

    /// Custom base name for the output files
    #[arg(long)]
    name: Option<String>,

    /// Slugify output names
    #[arg(long)]
    seo: bool,

    /// Export a size preset as well (repeatable, see 'photokit presets')
    #[arg(long = "preset")]
    presets: Vec<String>,

    /// Strip the background through the configured removal service first
    #[arg(long)]
    remove_background: bool,

    /// Print results as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

impl ProcessArgs {
    fn apply(&self, options: &mut ProcessingOptions) {
        if let Some(dir) = &self.output {
            options.output.directory = Some(dir.clone());
        }
        if let Some(format) = self.format {
            options.output.format = format;
        }
        if let Some(quality) = &self.quality {
            options.output.quality = Quality::parse(quality);
        }
        if self.width.is_some() {
            options.resize.width = self.width;
        }
        if self.height.is_some() {
            options.resize.height = self.height;
        }
        if let Some(fit) = self.fit {
            options.resize.fit = fit;
        }
        if let Some(ratio) = self.crop {
            options.crop.enabled = true;
            options.crop.ratio = ratio;
        }
        if let Some(name) = &self.name {
            options.naming.custom_name = Some(name.clone());
        }
        if self.seo {
            options.naming.seo = true;
        }
        options.variants.presets.extend(self.presets.iter().cloned());
        if self.remove_background {
            options.background.remove = true;
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the transform pipeline over images
    Process(ProcessArgs),
    /// List the built-in size presets
    Presets,
    /// Print a stock options file with every setting at its default
    GenConfig,
    /// Show the base name an image would be written under
    Slug {
        source: String,
        #[arg(long)]
        name: Option<String>,
        /// Slugify the name
        #[arg(long)]
        seo: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photokit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Process(args) => {
            let mut options = config::load_config(cli.config.as_deref())?;
            args.apply(&mut options);
            options.validate()?;
            init_thread_pool(&options.processing);

            let sources = expand_inputs(&args.inputs);
            let backend = RustBackend::new();
            let remover = HttpBackgroundRemover::from_config(&options.background)?;
            let pipeline = Pipeline {
                backend: &backend,
                remover: &remover,
                clock: &SystemClock,
            };

            let results = if args.json {
                let results = pipeline.process_batch(&sources, &options, None);
                println!("{}", serde_json::to_string_pretty(&results)?);
                results
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_process_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let results = pipeline.process_batch(&sources, &options, Some(tx));
                printer.join().ok();
                println!();
                println!("{}", output::format_summary(&results));
                results
            };

            if results.iter().any(|r| !r.success) {
                std::process::exit(1);
            }
        }
        Command::Presets => {
            output::print_presets(presets::PRESETS);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Slug { source, name, seo } => {
            let options = config::load_config(cli.config.as_deref())?;
            let custom = name.or(options.naming.custom_name);
            let seo = seo || options.naming.seo;
            println!("{}", preview_filename(&source, custom.as_deref(), seo));
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
