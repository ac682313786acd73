use clap::{Parser, Subcommand};
use longstrip::advisor::{RatioAdvisor, SliceAdvisor, advise_slice_height};
use longstrip::config::{self, PipelineConfig};
use longstrip::imaging::{ExportFormat, Mode, RustBackend, scaled_height, slice_count};
use longstrip::pipeline::{self, PipelineOutput};
use longstrip::source::{SourceImage, load_sources};
use longstrip::{export, output};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Flags shared by the commands that run the pipeline.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Image files or directories (directories are read in file-name order)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels (ignored while the aspect ratio is locked)
    #[arg(long)]
    height: Option<u32>,

    /// Derive the height from each source's aspect ratio
    #[arg(long, conflicts_with = "no_keep_aspect")]
    keep_aspect: bool,

    /// Use --height as-is, stretching if needed
    #[arg(long)]
    no_keep_aspect: bool,

    /// Maximum slice height in pixels
    #[arg(long)]
    slice_height: Option<u32>,

    /// Emit one image per source instead of slices
    #[arg(long)]
    no_slicing: bool,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<ExportFormat>,

    /// Suggest a slice height from a W:H band ratio, e.g. 3:4
    #[arg(long, value_name = "W:H", value_parser = parse_ratio)]
    suggest_ratio: Option<RatioAdvisor>,

    /// Output directory
    #[arg(long, default_value = "slices")]
    output: PathBuf,
}

impl RunArgs {
    /// Layer command-line flags over the loaded config.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(width) = self.width {
            config.resize.width = width;
        }
        if let Some(height) = self.height {
            config.resize.height = height;
        }
        if self.keep_aspect {
            config.resize.keep_aspect_ratio = true;
        }
        if self.no_keep_aspect {
            config.resize.keep_aspect_ratio = false;
        }
        if let Some(slice_height) = self.slice_height {
            config.slicing.height = slice_height;
        }
        if self.no_slicing {
            config.slicing.enabled = false;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
    }
}

fn parse_ratio(s: &str) -> Result<RatioAdvisor, String> {
    RatioAdvisor::parse(s).ok_or_else(|| format!("expected W:H with positive integers, got {s:?}"))
}

#[derive(Parser)]
#[command(name = "longstrip")]
#[command(about = "Resize images and cut them into height-bounded slices")]
#[command(long_about = "\
Resize images and cut them into height-bounded slices

Each image is scaled to a target width and cut top to bottom into slices
no taller than the slice height. The last slice takes whatever is left.

  longstrip slice shots/            # one set of slices per image
  longstrip mosaic 01.png 02.png    # stack images, then slice the stack

Output layout:

  slices/
  ├── manifest.json        # every written file, with size and sha256
  ├── cover-000.jpg        # slice: <name>-<index>.<ext>
  ├── cover-001.jpg
  └── mosaic.jpg           # mosaic mode: the whole stitched canvas

Run 'longstrip gen-config' to generate a documented longstrip.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding longstrip.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log pipeline details (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize and slice every image on its own
    Slice(RunArgs),
    /// Stack all images into one canvas and slice it
    Mosaic(RunArgs),
    /// Decode inputs and report the slices they would produce
    Check {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print a stock longstrip.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Slice(args) => run(&cli.config_dir, &args, Mode::Individual)?,
        Command::Mosaic(args) => run(&cli.config_dir, &args, Mode::Mosaic)?,
        Command::Check { inputs } => {
            let config = config::load_config(&cli.config_dir)?;
            let sources = load_reporting_errors(&inputs);
            for line in check_lines(&sources, &config) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run(config_dir: &Path, args: &RunArgs, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::load_config(config_dir)?;
    args.apply(&mut config);
    config.mode = mode;
    config.validate()?;
    init_thread_pool(&config.processing);

    let sources = load_reporting_errors(&args.inputs);
    let mut options = config.processing_options();
    if let (Some(advisor), Some(first)) = (&args.suggest_ratio, sources.first()) {
        let preview = first.image.resize_exact(
            options.target_width,
            pipeline::target_height_for(first, &options),
            image::imageops::FilterType::Nearest,
        );
        options.slice_height = advise_slice_height(
            Some(advisor as &dyn SliceAdvisor),
            &preview,
            options.slice_height,
        );
    }

    let backend = RustBackend::with_max_surface_pixels(config.limits.max_surface_pixels);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        let mut formatter = output::EventFormatter::new();
        for event in rx {
            for line in formatter.format(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::run(&backend, &sources, &options, Some(tx));
    if printer.join().is_err() {
        warn!("progress printer panicked");
    }

    let manifest = match result? {
        PipelineOutput::Individual(out) => {
            println!();
            for line in output::format_individual_summary(&out) {
                println!("{}", line);
            }
            export::export_individual(&args.output, &out)?
        }
        PipelineOutput::Mosaic(out) => {
            println!();
            for line in output::format_mosaic_summary(&out) {
                println!("{}", line);
            }
            export::export_mosaic(&args.output, &out, options.export_format)?
        }
    };
    for line in output::format_export_summary(&manifest, &args.output) {
        println!("{}", line);
    }
    Ok(())
}

/// Load every input; report the ones that fail and keep going.
fn load_reporting_errors(inputs: &[PathBuf]) -> Vec<SourceImage> {
    load_sources(inputs)
        .into_iter()
        .filter_map(|(_, result)| match result {
            Ok(source) => Some(source),
            Err(e) => {
                eprintln!("skipping: {}", e);
                None
            }
        })
        .collect()
}

/// Dimensions and predicted slice counts, without encoding anything.
fn check_lines(sources: &[SourceImage], config: &PipelineConfig) -> Vec<String> {
    let options = config.processing_options();
    let mut lines = Vec::with_capacity(sources.len() + 1);
    for (i, source) in sources.iter().enumerate() {
        let height = pipeline::target_height_for(source, &options);
        let slices = if options.enable_slicing {
            slice_count(height, options.slice_height)
        } else {
            usize::from(height > 0)
        };
        lines.push(format!(
            "{:0>3} {}  {}x{} → {}x{}  {} slice(s)",
            i + 1,
            source.name,
            source.width(),
            source.height(),
            options.target_width,
            height,
            slices
        ));
    }
    let stitched: u32 = sources
        .iter()
        .map(|s| scaled_height((s.width(), s.height()), options.target_width))
        .sum();
    lines.push(format!(
        "{} readable; mosaic would be {}x{}",
        sources.len(),
        options.target_width,
        stitched
    ));
    lines
}

/// Install the fmt subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("longstrip={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
