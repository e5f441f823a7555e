//! Control engine modules
//!
//! Contains the interpolation rule and the controller that runs it.

mod controller;
mod interpolate;

pub use controller::{control_tick, ControllerState, TemperatureController, TickOutcome};
pub use interpolate::compute_level;
