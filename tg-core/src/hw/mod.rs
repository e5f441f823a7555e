//! Hardware interaction modules
//!
//! Temperature sources, actuators and the autodetection that picks them.

mod actuator;
mod cooling;
mod detection;
mod pwm;
mod sensor;
pub mod sysfs;

pub use actuator::{open_actuator, Actuator};
pub use cooling::{native_to_unified, unified_to_native, CoolingActuator};
pub use detection::{compile_patterns, DetectionPolicy};
pub use pwm::{enable_path_for, PwmActuator};
pub use sensor::{open_sensor, HwmonSensor, Sensor, ThermalZoneSensor};

#[cfg(test)]
pub use actuator::MockActuator;
#[cfg(test)]
pub use sensor::MockSensor;
