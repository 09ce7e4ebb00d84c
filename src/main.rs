use clap::{Parser, Subcommand};
use dgus_pack::capture::{MANIFEST_FILENAME, ManifestSource};
use dgus_pack::{config, output, package, pipeline, verify};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dgus-pack")]
#[command(about = "Package HMI screenshots for DWIN DGUS displays")]
#[command(long_about = "\
Package HMI screenshots for DWIN DGUS displays

Reads captured page and element screenshots listed in a captures.json
manifest and writes a DGUS-ready asset tree:

  out/
  ├── pages/00_main.bmp             # Pages under their project names
  └── dgus/
      ├── DWIN_SET/00.bmp           # Pages under their mapped DGUS names
      ├── ICON/32x32/00.bmp         # Unique elements, one folder per size
      ├── ICON/icon_groups_info.txt
      ├── templates/00_main.bmp     # Pages with element outlines and labels
      ├── touch_areas_guide.txt
      └── pages_info.txt

Every bitmap is 24-bit uncompressed BMP. Pixel-identical element captures
are stored once. Output is identical for identical input.

Run 'dgus-pack gen-config' to generate a documented dgus-pack.toml.")]
#[command(version)]
struct Cli {
    /// Project configuration file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Log debug details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the DGUS package from a capture manifest
    Pack {
        /// Capture manifest
        #[arg(long, default_value = MANIFEST_FILENAME)]
        captures: PathBuf,

        /// Output directory
        #[arg(long, default_value = "out")]
        output: PathBuf,
    },
    /// Check every bitmap in an existing output directory
    Verify {
        /// Output directory to check
        #[arg(default_value = "out")]
        dir: PathBuf,
    },
    /// Print a stock dgus-pack.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Pack { captures, output } => {
            let project = config::load_config(&cli.config)?;
            init_thread_pool(&project.processing);

            let source = ManifestSource::new(captures);
            let result = pipeline::run_source(&source, &project)?;
            output::print_run_summary(&result.package, &result.summary);

            let report = package::write(&result.package, &output);
            output::print_write_report(&report);
            if !report.is_complete() {
                return Err(format!("package in {} is incomplete", output.display()).into());
            }
        }
        Command::Verify { dir } => {
            let project = config::load_config(&cli.config)?;
            let resolution = (project.resolution[0], project.resolution[1]);
            let report = verify::verify_tree(&dir, resolution)?;
            output::print_verify_report(&report);
            if !report.is_ok() {
                return Err(format!("{} invalid files in {}", report.failed(), dir.display()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays the report.
fn init_tracing(verbose: bool) {
    let default = if verbose { "dgus_pack=debug" } else { "dgus_pack=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Size the global rayon pool from `[processing]`, capped at the core count.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
