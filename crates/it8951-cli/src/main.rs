// Command-line tool: printing to stdout is its job.
#![allow(clippy::print_stdout)]
#![allow(missing_docs)]

mod backend;
mod raster;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use it8951_usb::{Builder, DriverConfig, InfoSource, ProtocolProfile, Rect, RefreshMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "it8951")]
#[command(about = "Drive an IT8951 e-paper panel over USB", long_about = None)]
#[command(version)]
struct Cli {
    /// SCSI generic node of the display
    #[arg(long, default_value = "/dev/sg0")]
    device: PathBuf,
    /// Wire encoding (vendor or direct)
    #[arg(long)]
    profile: Option<ProtocolProfile>,
    /// JSON driver configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Largest single transfer in bytes
    #[arg(long)]
    max_transfer: Option<usize>,
    /// Per-command timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Do not ask the controller to block until a refresh completes
    #[arg(long)]
    no_wait: bool,
    /// Drive a simulated panel and save its framebuffer to this PNG
    #[arg(long, value_name = "PNG")]
    simulate: Option<PathBuf>,
    /// Log per-transfer detail (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the controller's geometry and firmware details
    Info,
    /// Fill the panel with white
    Clear {
        #[arg(long, default_value = "init")]
        mode: RefreshMode,
    },
    /// Upload a raw 8-bit grayscale raster and refresh it
    Display {
        /// Raster file, exactly width*height bytes
        raw: PathBuf,
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        /// Defaults to the panel width minus x
        #[arg(long)]
        width: Option<u32>,
        /// Defaults to the panel height minus y
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, default_value = "gc16")]
        mode: RefreshMode,
    },
    /// Decode an image file, scale it to the panel and show it
    Show {
        image: PathBuf,
        #[arg(long, default_value = "gc16")]
        mode: RefreshMode,
    },
    /// Re-open the device and clear it; recovers a frozen controller
    Reset,
    /// Black-then-white INIT cycle to remove ghosting
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let mut display = backend::open(&cli.device, cli.simulate.as_deref(), config)?;

    match cli.command {
        Commands::Info => print_info(&display),
        Commands::Clear { mode } => display.clear(mode).context("clear failed")?,
        Commands::Display { raw, x, y, width, height, mode } => {
            let rect = Rect::new(
                x,
                y,
                width.unwrap_or(display.width().saturating_sub(x)),
                height.unwrap_or(display.height().saturating_sub(y)),
            );
            let raster = raster::load_raw(&raw, &rect)?;
            display.display(&raster, rect, mode).context("display failed")?;
        }
        Commands::Show { image, mode } => {
            let raster = raster::load_image(&image, display.width(), display.height())?;
            display.display_full(&raster, mode).context("display failed")?;
        }
        Commands::Reset => display.reset().context("reset failed")?,
        Commands::Init => display.full_init().context("full init failed")?,
    }

    backend::finish(display)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<DriverConfig> {
    let base = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => DriverConfig::default(),
    };

    let mut builder = Builder::from_config(base);
    if let Some(profile) = cli.profile {
        builder = builder.profile(profile);
    }
    if let Some(bytes) = cli.max_transfer {
        builder = builder.max_transfer_bytes(bytes);
    }
    if let Some(ms) = cli.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    if cli.no_wait {
        builder = builder.wait_for_ready(false);
    }
    builder.build().context("invalid driver configuration")
}

fn print_info(display: &it8951_usb::It8951<backend::Backend>) {
    let info = display.info();
    let source = match display.info_source() {
        InfoSource::Queried => "queried",
        InfoSource::Fallback => "fallback",
    };
    println!("resolution:     {}x{} ({source})", info.width, info.height);
    println!("image buffer:   0x{:08x}", info.image_buffer_address);
    println!("update buffer:  0x{:08x}", info.update_buffer_address);
    println!("profile:        {}", display.config().profile);
    if display.info_source() == InfoSource::Queried {
        println!("version:        0x{:08x}", info.version);
        println!(
            "commands:       {} standard, {} extended",
            info.standard_cmd_count, info.extended_cmd_count
        );
        println!("temperature:    segment {}", info.temperature_segment);
        println!("frame counts:   {:?}", info.frame_counts);
        println!("buffers:        {}", info.buffer_count);
    }
}
