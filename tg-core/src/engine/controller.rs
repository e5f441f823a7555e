//! Closed-loop temperature controller
//!
//! One sensor, one actuator, one periodic loop. Each tick reads the sensor,
//! maps the reading onto the actuator's range and drives it.
//!
//! # Lifecycle
//!
//! `Idle` → `start()` → `Running` → `stop()` → `Stopped`. `Stopped` is
//! terminal; `stop()` before `start()` does nothing. Releasing the
//! actuator is separate from stopping: the owner calls
//! [`TemperatureController::release`] on every exit path, whatever state
//! the controller reached.
//!
//! # Failure handling
//!
//! A failed sensor read skips the tick and leaves the actuator where it
//! was. A failed actuator write is logged and the next tick tries again.
//! Neither ends the loop.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::data::{ControllerConfig, DeviceSelector, PwmRange};
use crate::engine::interpolate::compute_level;
use crate::error::{Result, ThermgovError};
use crate::hw::{Actuator, DetectionPolicy, Sensor};

/// Where a controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Constructed, loop not started
    Idle,
    /// Loop spawned
    Running,
    /// Loop asked to exit; cannot be restarted
    Stopped,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Result of a single control tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Sensor read failed; actuator untouched
    Skipped(ThermgovError),
    /// Actuator driven (or already at) `level`
    Driven { temperature: f64, level: u8 },
    /// Level computed but the actuator rejected it
    WriteFailed {
        temperature: f64,
        level: u8,
        error: ThermgovError,
    },
}

impl TickOutcome {
    pub fn is_driven(&self) -> bool {
        matches!(self, Self::Driven { .. })
    }
}

/// Read, interpolate, drive. Blocking; runs on the blocking pool.
pub fn control_tick(sensor: &dyn Sensor, actuator: &dyn Actuator, config: &ControllerConfig) -> TickOutcome {
    let temperature = match sensor.read() {
        Ok(t) => t,
        Err(e) => return TickOutcome::Skipped(e),
    };

    let level = compute_level(
        temperature,
        config.low_temp(),
        config.high_temp(),
        actuator.min_speed(),
        actuator.max_speed(),
    );

    if let Err(error) = actuator.set_speed(level) {
        return TickOutcome::WriteFailed {
            temperature,
            level,
            error,
        };
    }

    if config.verbose() {
        match actuator.current_speed() {
            Ok(current) => info!(temperature, level, current, "Control tick"),
            Err(e) => info!(temperature, level, "Control tick (current level unreadable: {})", e),
        }
    } else {
        debug!(temperature, level, "Control tick");
    }

    TickOutcome::Driven { temperature, level }
}

/// Drives one actuator from one sensor
pub struct TemperatureController {
    sensor: Arc<dyn Sensor>,
    actuator: Arc<dyn Actuator>,
    config: ControllerConfig,
    state: ControllerState,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl TemperatureController {
    pub fn new(sensor: Arc<dyn Sensor>, actuator: Arc<dyn Actuator>, config: ControllerConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            sensor,
            actuator,
            config,
            state: ControllerState::Idle,
            stop_tx,
            handle: None,
        }
    }

    /// Resolve both selectors and build an idle controller
    ///
    /// `config` and `range` are already validated, so nothing here runs
    /// before validation. If the actuator cannot be acquired the sensor is
    /// closed before the error is returned.
    pub fn autodetect(
        config: ControllerConfig,
        sensor: &DeviceSelector,
        actuator: &DeviceSelector,
        range: PwmRange,
        policy: &DetectionPolicy,
    ) -> Result<Self> {
        let sensor = policy.sensor(sensor)?;
        let actuator = match policy.actuator(actuator, range) {
            Ok(actuator) => actuator,
            Err(e) => {
                if let Err(close_err) = sensor.close() {
                    warn!("Failed to close sensor {}: {}", sensor.describe(), close_err);
                }
                return Err(e);
            }
        };

        info!(
            sensor = %sensor.describe(),
            actuator = %actuator.describe(),
            "Devices acquired"
        );
        Ok(Self::new(Arc::from(sensor), Arc::from(actuator), config))
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn sensor(&self) -> &dyn Sensor {
        self.sensor.as_ref()
    }

    pub fn actuator(&self) -> &dyn Actuator {
        self.actuator.as_ref()
    }

    /// Spawn the control loop on the current Tokio runtime
    ///
    /// `shutdown` is the process-wide cancellation signal: the loop exits
    /// when it becomes `true` or its sender is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self, shutdown: watch::Receiver<bool>) -> Result<()> {
        match self.state {
            ControllerState::Running => return Err(ThermgovError::AlreadyRunning),
            ControllerState::Stopped => return Err(ThermgovError::AlreadyStopped),
            ControllerState::Idle => {}
        }

        info!(
            sensor = %self.sensor.describe(),
            actuator = %self.actuator.describe(),
            low_temp = self.config.low_temp(),
            high_temp = self.config.high_temp(),
            min = self.actuator.min_speed(),
            max = self.actuator.max_speed(),
            interval_ms = self.config.interval().as_millis() as u64,
            "Starting temperature controller"
        );

        self.handle = Some(tokio::spawn(run_loop(
            Arc::clone(&self.sensor),
            Arc::clone(&self.actuator),
            self.config,
            self.stop_tx.subscribe(),
            shutdown,
        )));
        self.state = ControllerState::Running;
        Ok(())
    }

    /// Ask the loop to exit at its next wait point. Does not wait for it.
    pub fn stop(&mut self) {
        match self.state {
            ControllerState::Running => {
                info!("Stopping temperature controller");
                self.stop_tx.send_replace(true);
                self.state = ControllerState::Stopped;
            }
            ControllerState::Idle => debug!("Stop requested before start, ignoring"),
            ControllerState::Stopped => {}
        }
    }

    /// Wait for the loop task to finish
    pub async fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Err(e) = handle.await {
            error!("Control loop task failed: {}", e);
        }
    }

    /// Hand the actuator back to the platform, then close the sensor
    ///
    /// Safe to call in any state and more than once. The actuator error, if
    /// any, is returned; a sensor close error is only logged.
    pub fn release(&self) -> Result<()> {
        let result = self.actuator.close();
        if let Err(e) = &result {
            error!("Failed to release {}: {}", self.actuator.describe(), e);
        }
        if let Err(e) = self.sensor.close() {
            warn!("Failed to close {}: {}", self.sensor.describe(), e);
        }
        result
    }
}

impl fmt::Debug for TemperatureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemperatureController")
            .field("sensor", &self.sensor.describe())
            .field("actuator", &self.actuator.describe())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for TemperatureController {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

async fn run_loop(
    sensor: Arc<dyn Sensor>,
    actuator: Arc<dyn Actuator>,
    config: ControllerConfig,
    mut stop_rx: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow() {
        info!("Shutdown already requested, control loop not entered");
        return;
    }

    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut consecutive_failures: u32 = 0;
    info!("Control loop running");

    loop {
        tokio::select! {
            biased;

            _ = stop_rx.changed() => {
                debug!("Control loop received stop");
                break;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Control loop received shutdown");
                    break;
                }
            }
            _ = ticker.tick() => {
                let sensor = Arc::clone(&sensor);
                let actuator = Arc::clone(&actuator);
                let outcome = tokio::task::spawn_blocking(move || {
                    control_tick(sensor.as_ref(), actuator.as_ref(), &config)
                })
                .await;

                match outcome {
                    Ok(TickOutcome::Driven { .. }) => {
                        if consecutive_failures > 0 {
                            info!("Control loop recovered after {} failed ticks", consecutive_failures);
                            consecutive_failures = 0;
                        }
                    }
                    Ok(TickOutcome::Skipped(e)) => {
                        consecutive_failures += 1;
                        warn!(consecutive = consecutive_failures, "Temperature read failed, tick skipped: {}", e);
                    }
                    Ok(TickOutcome::WriteFailed { temperature, level, error }) => {
                        consecutive_failures += 1;
                        warn!(
                            consecutive = consecutive_failures,
                            temperature,
                            level,
                            "Actuator write failed: {}",
                            error
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(consecutive = consecutive_failures, "Control tick panicked: {}", e);
                    }
                }
            }
        }
    }

    info!("Control loop stopped");
}
