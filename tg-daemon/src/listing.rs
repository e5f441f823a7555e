//! `--list` and `--check` output
//!
//! Shows everything detection can see and which entries its heuristics
//! accept, without acquiring any device.

use std::fmt::Write as _;

use serde::Serialize;
use tg_core::Inventory;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct Listing<'a> {
    version: &'static str,
    #[serde(flatten)]
    inventory: &'a Inventory,
}

fn temp(value: Option<f64>) -> String {
    value.map_or_else(|| "unreadable".to_string(), |t| format!("{:.1}°C", t))
}

fn mark(matches: bool, tag: &str) -> String {
    if matches {
        format!("  [{}]", tag)
    } else {
        String::new()
    }
}

/// Human-readable listing, one section per device class
pub fn render_text(inventory: &Inventory) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Thermal zones:");
    if inventory.thermal_zones.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for zone in &inventory.thermal_zones {
        let _ = writeln!(out, "  {}  {}", zone.path.display(), temp(zone.current_temp));
    }

    let _ = writeln!(out, "\nCooling devices:");
    if inventory.cooling_devices.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for dev in &inventory.cooling_devices {
        let state = match (dev.cur_state, dev.max_state) {
            (Some(cur), Some(max)) => format!("state {}/{}", cur, max),
            (None, Some(max)) => format!("state ?/{}", max),
            _ => "state unknown".to_string(),
        };
        let _ = writeln!(
            out,
            "  {}  {}  {}{}",
            dev.path.display(),
            dev.device_type,
            state,
            mark(dev.matches, "fan")
        );
    }

    let _ = writeln!(out, "\nTemperature channels:");
    if inventory.temp_channels.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for ch in &inventory.temp_channels {
        let _ = writeln!(out, "  {}  {}{}", ch, temp(ch.current_temp), mark(ch.matches, "cpu"));
        let _ = writeln!(out, "      {}", ch.path.display());
    }

    let _ = writeln!(out, "\nPWM channels:");
    if inventory.pwm_channels.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for ch in &inventory.pwm_channels {
        let value = ch
            .current_value
            .map_or_else(|| "unreadable".to_string(), |v| v.to_string());
        let _ = writeln!(out, "  {}  {}{}", ch, value, mark(ch.matches, "fan"));
        let _ = writeln!(out, "      {}", ch.path.display());
    }

    out
}

/// Listing as pretty JSON
pub fn render_json(inventory: &Inventory) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Listing {
        version: VERSION,
        inventory,
    })
}

/// What `--check` concludes from an inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one sensor and one actuator
    Ready,
    NoActuator,
    NoSensor,
    Nothing,
}

pub fn readiness(inventory: &Inventory) -> Readiness {
    let sensors = inventory.thermal_zones.len() + inventory.temp_channels.len();
    let actuators = inventory.cooling_devices.len() + inventory.pwm_channels.len();
    match (sensors > 0, actuators > 0) {
        (true, true) => Readiness::Ready,
        (true, false) => Readiness::NoActuator,
        (false, true) => Readiness::NoSensor,
        (false, false) => Readiness::Nothing,
    }
}

/// Listing followed by counts, advice and a privilege check
pub fn render_check(inventory: &Inventory, euid: u32) -> String {
    let mut out = render_text(inventory);

    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "  thermal zones:        {}", inventory.thermal_zones.len());
    let _ = writeln!(out, "  cooling devices:      {}", inventory.cooling_devices.len());
    let _ = writeln!(out, "  temperature channels: {}", inventory.temp_channels.len());
    let _ = writeln!(out, "  PWM channels:         {}", inventory.pwm_channels.len());

    let _ = writeln!(out, "\nAdvice:");
    match readiness(inventory) {
        Readiness::Ready => {
            let _ = writeln!(out, "  Autodetection has something to work with:");
            let _ = writeln!(out, "    sudo thermgovd --verbose");
        }
        Readiness::NoActuator => {
            let _ = writeln!(out, "  Temperature sources found but nothing to drive.");
            let _ = writeln!(out, "  The fans may be under firmware control or need a driver (nct6775, it87).");
        }
        Readiness::NoSensor => {
            let _ = writeln!(out, "  Actuators found but no temperature source.");
            let _ = writeln!(out, "  Pass one explicitly:");
            let _ = writeln!(out, "    sudo thermgovd --sensor <path> --verbose");
        }
        Readiness::Nothing => {
            let _ = writeln!(out, "  No temperature sources or actuators found.");
            let _ = writeln!(out, "  Load a sensor driver (Intel: modprobe coretemp, AMD: modprobe k10temp)");
            let _ = writeln!(out, "  and check that hardware monitoring is enabled in firmware.");
        }
    }

    let _ = writeln!(out, "\nPrivileges:");
    if euid == 0 {
        let _ = writeln!(out, "  running as root");
    } else {
        let _ = writeln!(out, "  running as uid {}; driving actuators needs root", euid);
    }

    out
}
