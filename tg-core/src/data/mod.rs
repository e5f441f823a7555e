//! Data types, configuration, and validation modules
//!
//! Contains the controller configuration, device selectors and the
//! inventory types produced by detection.

mod config;
mod selector;
mod types;

pub use config::{ControllerConfig, PwmRange};
pub use selector::DeviceSelector;
pub use types::{CoolingDeviceEntry, Inventory, PwmChannel, TempChannel, ThermalZoneEntry};
