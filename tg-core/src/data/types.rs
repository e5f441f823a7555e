//! Inventory types produced by detection
//!
//! These describe what exists in the device trees and whether the
//! detection heuristics would accept it. They carry no open handles.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// One `tempN_input` channel on an hwmon chip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempChannel {
    pub path: PathBuf,
    pub chip: String,
    pub chip_name: String,
    pub index: u32,
    pub label: String,
    /// Current reading, if it could be read
    pub current_temp: Option<f64>,
    /// Whether the CPU heuristics accept this channel
    pub matches: bool,
}

/// One `pwmN` channel on an hwmon chip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PwmChannel {
    pub path: PathBuf,
    pub chip: String,
    pub chip_name: String,
    pub index: u32,
    /// Label of the matching `fanN_label`, empty if absent
    pub label: String,
    pub current_value: Option<u8>,
    /// Whether the fan heuristics accept this channel
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalZoneEntry {
    pub path: PathBuf,
    pub current_temp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoolingDeviceEntry {
    pub path: PathBuf,
    pub device_type: String,
    pub max_state: Option<u32>,
    pub cur_state: Option<u32>,
    /// Whether the type contains the preferred keyword
    pub matches: bool,
}

/// Everything detection can see, in enumeration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    pub thermal_zones: Vec<ThermalZoneEntry>,
    pub cooling_devices: Vec<CoolingDeviceEntry>,
    pub temp_channels: Vec<TempChannel>,
    pub pwm_channels: Vec<PwmChannel>,
}

impl fmt::Display for TempChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} - {})", self.chip, input_name(&self.path), self.chip_name, self.label)
    }
}

impl fmt::Display for PwmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} - {})", self.chip, input_name(&self.path), self.chip_name, self.label)
    }
}

fn input_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_display() {
        let ch = TempChannel {
            path: PathBuf::from("/sys/class/hwmon/hwmon2/temp3_input"),
            chip: "hwmon2".to_string(),
            chip_name: "nvme".to_string(),
            index: 3,
            label: "Sensor 2".to_string(),
            current_temp: None,
            matches: false,
        };
        assert_eq!(ch.to_string(), "hwmon2/temp3_input (nvme - Sensor 2)");
    }
}
