//! Thermgov Core Library
//!
//! A closed-loop thermal governor for Linux: one temperature source drives
//! one cooling actuator through a linear ramp.
//!
//! # Features
//!
//! - **Sensors**: hwmon `tempN_input` channels and firmware thermal zones
//! - **Actuators**: hwmon PWM channels and discrete thermal cooling devices
//! - **Autodetection**: ordered heuristics with replaceable pattern tables
//! - **State restore**: the original PWM mode or cooling state is written
//!   back when the actuator is released
//!
//! # Module Structure
//!
//! - `hw/` - Sensors, actuators, sysfs access and detection
//! - `data/` - Configuration, selectors, inventory types
//! - `engine/` - Interpolation and the controller loop
//!
//! # Example
//!
//! ```no_run
//! use tg_core::{ControllerConfig, DetectionPolicy, DeviceSelector, PwmRange, TemperatureController};
//!
//! # async fn run() -> tg_core::Result<()> {
//! let policy = DetectionPolicy::new()?;
//! let mut controller = TemperatureController::autodetect(
//!     ControllerConfig::default(),
//!     &DeviceSelector::Auto,
//!     &DeviceSelector::Auto,
//!     PwmRange::default(),
//!     &policy,
//! )?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! controller.start(shutdown_rx)?;
//! // ...
//! shutdown_tx.send_replace(true);
//! controller.stop();
//! controller.join().await;
//! controller.release()?;
//! # Ok(())
//! # }
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;

// Re-export primary types from data/
pub use data::{
    ControllerConfig, CoolingDeviceEntry, DeviceSelector, Inventory, PwmChannel, PwmRange,
    TempChannel, ThermalZoneEntry,
};

// Re-export error types
pub use error::{Result, ThermgovError};

// Re-export engine types
pub use engine::{compute_level, control_tick, ControllerState, TemperatureController, TickOutcome};

// Re-export hardware types
pub use hw::{
    open_actuator, open_sensor, Actuator, CoolingActuator, DetectionPolicy, HwmonSensor,
    PwmActuator, Sensor, ThermalZoneSensor,
};
