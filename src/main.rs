//! # SixDoF Relay
//!
//! Fly the active vehicle with a 3D mouse.
//!
//! This application reads raw 3D mouse motion from stdin, one event per
//! line, and relays it as manual 6-DOF control commands at 50Hz.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Create the relay and bind a vehicle (JSONL recorder or log-only)
//!
//! 2. **Main Loop**
//!    - Parse each stdin line as six or more whitespace/comma separated floats
//!    - Feed well-formed lines to the relay; malformed lines are logged and skipped
//!    - Handle Ctrl+C or end of input for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Stop the emission loop
//!    - Log relay statistics
//!
//! # Examples
//!
//! ```bash
//! printf '0.01 0 0 0 0 0\n' | cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use std::num::ParseFloatError;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use sixdof_relay::config::{Config, LoggingConfig};
use sixdof_relay::device::sample::ManualControlCommand;
use sixdof_relay::relay::SixDofRelay;
use sixdof_relay::vehicle::recorder::CommandRecorder;
use sixdof_relay::vehicle::tracker::ActiveVehicleTracker;
use sixdof_relay::vehicle::{ManualControl, Vehicle};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// System id of the vehicle bound at startup
const DEFAULT_VEHICLE_ID: u32 = 1;

/// Vehicle that only logs the commands it receives
struct TraceVehicle {
    id: u32,
}

impl ManualControl for TraceVehicle {
    fn set_manual_6dof_control(&self, command: ManualControlCommand) {
        debug!(
            "x={:.3} y={:.3} z={:.3} a={:.3} b={:.3} c={:.3}",
            command.x, command.y, command.z, command.a, command.b, command.c
        );
    }
}

impl Vehicle for TraceVehicle {
    fn id(&self) -> u32 {
        self.id
    }

    fn manual_control(self: Arc<Self>) -> Option<Arc<dyn ManualControl>> {
        Some(self)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path)?;

    let _log_guard = init_logging(&config.logging);

    info!("SixDoF Relay v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Using configuration: {}", config_path);

    let tracker = Arc::new(ActiveVehicleTracker::new());
    let relay = SixDofRelay::from_config(&config.device, tracker.clone())?;
    let follower = relay.follow(tracker.subscribe());

    let vehicle: Arc<dyn Vehicle> = if config.recorder.enabled {
        CommandRecorder::create(&config.recorder.path, DEFAULT_VEHICLE_ID)?
    } else {
        Arc::new(TraceVehicle { id: DEFAULT_VEHICLE_ID })
    };
    tracker.set_active(Some(vehicle));

    info!("Reading motion samples from stdin");
    info!("Press Ctrl+C to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => match parse_sample(&line) {
                        Ok(raw) => relay.on_motion_sample(&raw),
                        Err(e) => warn!("Skipping malformed sample {:?}: {}", line, e),
                    },
                    None => {
                        info!("End of input, shutting down...");
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    relay.shutdown().await?;
    follower.await.context("Active vehicle follower failed")?;

    let stats = relay.stats();
    info!(
        "Samples accepted: {}, dropped: {}, ticks: {}, commands delivered: {}",
        stats.samples_accepted, stats.samples_dropped, stats.ticks, stats.emissions
    );

    Ok(())
}

/// Loads `path`, falling back to defaults when the default file is absent.
fn load_config(path: &str) -> Result<Config> {
    if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
        return Ok(Config::default());
    }

    Config::load(path).with_context(|| format!("Failed to load configuration from {}", path))
}

/// Sets up stderr or daily rolling file logging.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must live until exit so buffered file output is flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.directory.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

/// Parses one line of whitespace or comma separated floats.
///
/// Length is not checked here; short samples are the relay's to drop.
fn parse_sample(line: &str) -> std::result::Result<Vec<f32>, ParseFloatError> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .map(str::parse::<f32>)
        .collect()
}
