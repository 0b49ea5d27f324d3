use chrono::Datelike;
use clap::Parser;
use photo_mirror::config::{self, ConfigError, RunConfig, RunOptions, TargetSize};
use photo_mirror::imaging::RustBackend;
use photo_mirror::{output, sync};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "photo-mirror")]
#[command(version)]
#[command(about = "Keep resized mirror trees of a photo collection in sync")]
#[command(long_about = "\
Keep resized mirror trees of a photo collection in sync

Every JPEG and PNG under the source directory gets a resized copy at the same
relative path under each target size's mirror. Copies are regenerated when the
original is newer and removed when the original is gone; directories emptied
by removals are removed too.

  photo-mirror -s ~/Pictures/originals -t ~/Pictures/copies \\
      --add-target-size 1600x1200 --add-target-size 800x600:thumb

  copies/
  ├── 1600x1200/       # WIDTHxHEIGHT without :SUBDIR mirrors into WIDTHxHEIGHT/
  └── thumb/

Sizes are bounding boxes: images are scaled down to fit, never enlarged.
Use --add-subdirectory to limit a run to parts of the tree; the value -YEAR-
stands for the current year.

Set RUST_LOG=debug for diagnostic logging on stderr.")]
struct Cli {
    /// Directory holding the original photos
    #[arg(short = 's', long)]
    directory_source: PathBuf,

    /// Directory holding one mirror per target size
    #[arg(short = 't', long)]
    directory_target: PathBuf,

    /// Mirror size as WIDTHxHEIGHT[:SUBDIR] (repeatable, default 1600x1200)
    #[arg(long = "add-target-size", value_name = "WIDTHxHEIGHT[:SUBDIR]")]
    target_sizes: Vec<TargetSize>,

    /// Only process this relative subdirectory (repeatable, -YEAR- = current year)
    #[arg(long = "add-subdirectory", value_name = "SUBPATH")]
    subdirectories: Vec<String>,

    /// Report what pruning would remove instead of removing it
    #[arg(long)]
    no_delete: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("photo-mirror: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ConfigError> {
    let settings = config::load_settings(cli.config.as_deref())?;

    let sizes = if cli.target_sizes.is_empty() {
        settings.target_sizes()?
    } else {
        cli.target_sizes
    };
    let scope = if cli.subdirectories.is_empty() {
        settings.subdirectories.clone()
    } else {
        cli.subdirectories
    };
    let scope = config::expand_year_placeholder(&scope, chrono::Local::now().year());

    let run_config = RunConfig::new(RunOptions {
        source: cli.directory_source,
        target: cli.directory_target,
        sizes,
        scope,
        dry_run: cli.no_delete,
        quality: settings.quality,
    })?;

    init_thread_pool(&settings.processing);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_sync_event(&event);
        }
    });
    let summary = sync::run(&RustBackend::new(), &run_config, Some(&tx));
    drop(tx);
    if printer.join().is_err() {
        tracing::error!("progress printer panicked; some progress lines were not printed");
    }

    output::print_summary(&summary);
    Ok(())
}

/// Diagnostics go to stderr so they never interleave with the report on
/// stdout. `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the settings file can constrain
/// down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
