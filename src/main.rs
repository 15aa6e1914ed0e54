// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tof_calibrator::{Config, ModeSet};

mod cli;

#[derive(Parser)]
#[command(name = "tof-calibrator")]
#[command(about = "Projector calibration with a time-of-flight depth camera")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    /// Depth, Gray, Calibration, Test
    Calibrator,
    /// Camera, Project, Test
    Projector,
}

impl From<Layout> for ModeSet {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Calibrator => ModeSet::Calibrator,
            Layout::Projector => ModeSet::Projector,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List attached USB devices and mark supported cameras
    Devices,

    /// Run a mode against the simulated camera
    Demo {
        /// Mode layout (default: from config)
        #[arg(short, long, value_enum)]
        layout: Option<Layout>,

        /// Mode to select, by name (e.g. gray, depth, calibration, test)
        #[arg(short, long, default_value = "calibration")]
        mode: String,

        /// How long to stream frames in live-view and test modes
        #[arg(short, long, default_value = "3")]
        seconds: u64,

        /// Calibration points to collect before computing
        #[arg(short, long, default_value = "4")]
        points: usize,

        /// Save the last presented image as PNG
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Toggle the camera orientation before starting
        #[arg(long)]
        flip: bool,
    },

    /// Load a calibration file (default: the newest saved one)
    Load {
        /// Calibration file path
        file: Option<PathBuf>,
    },

    /// Print the effective configuration
    ShowConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    // RUST_LOG takes precedence over the configured filter
    // Examples: RUST_LOG=debug, RUST_LOG=tof_calibrator=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Commands::Devices => cli::list_devices(),
        Commands::Demo {
            layout,
            mode,
            seconds,
            points,
            snapshot,
            flip,
        } => cli::run_demo(
            config,
            cli::DemoOptions {
                mode_set: layout.map(ModeSet::from),
                mode,
                seconds,
                points,
                snapshot,
                flip,
            },
        ),
        Commands::Load { file } => cli::load_calibration(&config, file),
        Commands::ShowConfig => cli::show_config(&config, cli.config),
    }
}
