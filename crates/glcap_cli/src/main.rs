//! glcap CLI
//!
//! Drives a page through load, settle and capture, and stores the generated
//! replay artifacts. Pages come from the deterministic simulator.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod driver;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use driver::{read_record, Driver, DriverConfig, StageTimeouts};
use glcap_core::CaptureOptions;
use glcap_replay::{decode_data_url, GzipCompressor};
use glcap_sim::{Scene, SimSeed};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glcap")]
#[command(about = "glcap - graphics call capture and replay generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a page and write `<out>/<name>.json`
    Capture {
        /// Scene to load
        #[arg(short, long, default_value = "triangle")]
        scene: Scene,
        /// Output record name (defaults to the scene name)
        #[arg(short, long)]
        name: Option<String>,
        /// Output directory
        #[arg(short, long, default_value = "output/cap")]
        out: PathBuf,
        /// Frames in the capture window
        #[arg(short, long, default_value_t = 60)]
        frames: u32,
        /// Graphics contexts on the page
        #[arg(long, default_value_t = 1)]
        contexts: usize,
        /// Scene seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Capture options file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Navigate timeout in seconds
        #[arg(long, default_value_t = 30)]
        navigate_timeout: u64,
        /// Network-idle timeout in seconds
        #[arg(long, default_value_t = 60)]
        settle_timeout: u64,
        /// Capture timeout in seconds
        #[arg(long, default_value_t = 10)]
        capture_timeout: u64,
        /// Generate timeout in seconds
        #[arg(long, default_value_t = 100)]
        generate_timeout: u64,
    },
    /// Print a stored artifact as replay text
    Decode {
        /// Record written by `capture`
        #[arg(short, long)]
        input: PathBuf,
        /// Artifact index within the record
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// List available scenes
    Scenes,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glcap=info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Capture {
            scene,
            name,
            out,
            frames,
            contexts,
            seed,
            config,
            navigate_timeout,
            settle_timeout,
            capture_timeout,
            generate_timeout,
        } => {
            let options = match config {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .wrap_err_with(|| format!("reading {}", path.display()))?;
                    CaptureOptions::from_json(&json)?
                }
                None => CaptureOptions::default(),
            };
            let mut driver_config = DriverConfig::new(scene, out);
            if let Some(name) = name {
                driver_config.name = name;
            }
            driver_config.capture_frames = frames;
            driver_config.contexts = contexts;
            driver_config.seed = SimSeed::from_literal(seed);
            driver_config.options = options;
            driver_config.timeouts = StageTimeouts {
                navigate: Duration::from_secs(navigate_timeout),
                settle: Duration::from_secs(settle_timeout),
                capture: Duration::from_secs(capture_timeout),
                generate: Duration::from_secs(generate_timeout),
            };
            match Driver::new(driver_config).run_and_save().await? {
                Some(path) => println!("Saved {}", path.display()),
                None => println!("Skipped, output exists"),
            }
            Ok(())
        }
        Commands::Decode { input, index } => {
            let record = read_record(&input)?;
            let encoded = record
                .frame
                .gl_captures
                .get(index)
                .ok_or_else(|| eyre!("record has {} captures", record.frame.gl_captures.len()))?;
            print!("{}", decode_data_url(encoded, &GzipCompressor::default())?);
            Ok(())
        }
        Commands::Scenes => {
            for scene in Scene::ALL {
                println!("{}", scene);
            }
            Ok(())
        }
    }
}
