//! headtrack - Head-tracking loop demo
//!
//! Runs the tracking loop against a synthetic camera and prints the state
//! and offsets a motion controller would consume.

use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use headtrack::{
    config::Config,
    sim::{BrightSpotDetector, SyntheticCamera},
    tracking::{Perception, PinholeSolver, TrackingController, TrackingLoop},
};

/// headtrack - scan, follow, hold and return-to-neutral head tracking
#[derive(Parser, Debug)]
#[command(name = "headtrack", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 20.0)]
    duration: f64,

    /// Interval between printed offset samples, in milliseconds
    #[arg(long, default_value_t = 250)]
    print_interval_ms: u64,

    /// Disable tracking after this many seconds
    #[arg(long)]
    disable_after: Option<f64>,

    /// Run without a detector (scan only)
    #[arg(long)]
    no_detector: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", headtrack::NAME, headtrack::VERSION);

    let config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    config.validate()?;

    info!(
        "Gain {}, smoothing {}, hold {}s, return {}s, {} Hz",
        config.tracking.gain,
        config.tracking.smoothing,
        config.tracking.hold_delay_secs,
        config.tracking.return_duration_secs,
        config.worker.rate_hz
    );

    let perception = if args.no_detector {
        info!("Detector disabled, scan only");
        None
    } else {
        Some(Perception::new(
            BrightSpotDetector::default(),
            PinholeSolver::from_config(&config.camera),
        ))
    };

    let controller = TrackingController::new(&config.tracking, &config.scan, perception);
    let camera = SyntheticCamera::new(&config.camera);
    let tracking = TrackingLoop::new(&config, Box::new(camera), controller)?;

    tracking.start()?;

    let started = Instant::now();
    let run_for = Duration::from_secs_f64(args.duration.max(0.0));
    let interval = Duration::from_millis(args.print_interval_ms.max(1));
    let mut disabled = false;

    while started.elapsed() < run_for {
        std::thread::sleep(interval);

        if let Some(after) = args.disable_after {
            if !disabled && started.elapsed().as_secs_f64() >= after {
                tracking.set_tracking_enabled(false);
                disabled = true;
            }
        }

        let frame = tracking
            .get_latest_frame()
            .map(|f| format!("{}x{}", f.width(), f.height()))
            .unwrap_or_else(|| "none".to_string());

        println!(
            "{:7.2}s  {:<9}  frame={}  {}",
            started.elapsed().as_secs_f64(),
            tracking.state().to_string(),
            frame,
            tracking.get_offsets()
        );
    }

    tracking.stop();
    info!("headtrack stopped");
    Ok(())
}
