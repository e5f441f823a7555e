//! Thermgov Daemon (thermgovd)
//!
//! Runs one closed temperature control loop until SIGINT/SIGTERM, then
//! hands the actuator back to the platform.
//!
//! # Startup order
//! 1. Parse options (flags, then environment, then defaults)
//! 2. Validate thresholds and PWM bounds; nothing is touched before this
//! 3. Install the SIGINT/SIGTERM handler
//! 4. Resolve and acquire the sensor and actuator
//! 5. Start the loop, wait for a signal, stop, release
//!
//! Any failure in steps 2-4 exits non-zero. Release is attempted on every
//! path that acquired an actuator.

mod cli;
mod listing;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use tg_core::constants::paths;
use tg_core::{DetectionPolicy, TemperatureController};
use tg_error::ThermgovError;

use crate::cli::Cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Logging
// ============================================================================

/// journald when the socket exists, stdout otherwise
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let log_level = std::env::var("THERMGOV_LOG").unwrap_or_else(|_| default_level.to_string());

    if Path::new(paths::JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(&log_level))
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::new(&log_level))
        .init();
}

// ============================================================================
// Privileges
// ============================================================================

fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and only returns the effective uid.
    unsafe { libc::geteuid() }
}

/// Writing to sysfs needs root; say so up front instead of failing later
fn warn_if_unprivileged() {
    let euid = effective_uid();
    if euid != 0 {
        warn!(euid, "Not running as root; acquiring actuators will likely fail");
    } else {
        debug!("Running as root");
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if let Some(ThermgovError::DeviceNotFound { .. }) = e.downcast_ref::<ThermgovError>() {
                error!("Run `thermgovd --check` to diagnose, then pass --sensor/--pwm explicitly");
            }
            eprintln!("thermgovd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let policy = DetectionPolicy::new().context("failed to build detection policy")?;

    if cli.list {
        let inventory = policy.inventory();
        if cli.json {
            println!("{}", listing::render_json(&inventory).context("failed to serialize listing")?);
        } else {
            print!("{}", listing::render_text(&inventory));
        }
        return Ok(());
    }

    if cli.check {
        print!("{}", listing::render_check(&policy.inventory(), effective_uid()));
        return Ok(());
    }

    info!("STARTUP: thermgovd {} (PID {})", VERSION, std::process::id());

    let (config, range) = cli
        .controller_settings()
        .context("invalid configuration")?;
    info!(
        low_temp = config.low_temp(),
        high_temp = config.high_temp(),
        min_pwm = range.min(),
        max_pwm = range.max(),
        interval_ms = config.interval().as_millis() as u64,
        sensor = %cli.sensor,
        actuator = %cli.actuator,
        "STARTUP: configuration validated"
    );

    warn_if_unprivileged();

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
        shutdown_tx.send_replace(true);
    })
    .context("failed to install signal handler")?;

    let mut controller =
        TemperatureController::autodetect(config, &cli.sensor, &cli.actuator, range, &policy)
            .context("failed to acquire devices")?;

    if let Err(e) = controller.start(shutdown_rx.clone()) {
        release(&controller);
        return Err(e).context("failed to start controller");
    }

    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }

    info!("SHUTDOWN: stopping controller");
    controller.stop();
    controller.join().await;
    release(&controller);
    info!("SHUTDOWN: thermgovd terminated gracefully");
    Ok(())
}

/// Release errors are reported but never change the exit status
fn release(controller: &TemperatureController) {
    match controller.release() {
        Ok(()) => info!("Actuator released"),
        Err(e) => error!("Actuator release failed: {}", e),
    }
}
