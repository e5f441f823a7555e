//! Command Line Interface
//!
//! Every option has an environment fallback; a flag on the command line
//! wins over the environment, which wins over the built-in default.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;

use tg_core::constants::defaults;
use tg_core::{ControllerConfig, DeviceSelector, PwmRange};

#[derive(Parser, Debug)]
#[command(name = "thermgovd")]
#[command(version)]
#[command(about = "Thermgov - closed-loop thermal governor for Linux")]
#[command(long_about = "Thermgov - closed-loop thermal governor for Linux

Reads one temperature source and drives one cooling actuator along a
linear ramp: the minimum level at or below --low-temp, the maximum at or
above --high-temp, proportional in between. The actuator's original
control mode is restored on exit.

Sensors are thermal zones (/sys/class/thermal/thermal_zoneN) or hwmon
inputs (/sys/class/hwmon/hwmonN/tempM_input). Actuators are cooling
devices (/sys/class/thermal/cooling_deviceN) or hwmon PWM channels
(/sys/class/hwmon/hwmonN/pwmM).

EXAMPLES:
    thermgovd                                   Autodetect everything
    thermgovd --list                            Show what detection sees
    thermgovd --list --json                     Same, as JSON
    thermgovd --check                           Diagnose detection problems
    thermgovd --low-temp 45 --high-temp 80 --interval 2s
    thermgovd --sensor /sys/class/hwmon/hwmon1/temp1_input --pwm /sys/class/hwmon/hwmon2/pwm1

ENVIRONMENT VARIABLES:
    THERMGOV_LOG=debug     Log filter (default: info, debug with --verbose)")]
pub struct Cli {
    /// Sample interval (e.g. 500ms, 5s, 1m; bare numbers are seconds)
    #[arg(long, env = "THERMGOV_INTERVAL", default_value = "5s", value_parser = parse_interval)]
    pub interval: Duration,

    /// At or below this temperature (°C) the actuator runs at its minimum
    #[arg(long, env = "THERMGOV_LOW_TEMP", default_value_t = defaults::LOW_TEMP, allow_negative_numbers = true)]
    pub low_temp: f64,

    /// At or above this temperature (°C) the actuator runs at its maximum
    #[arg(long, env = "THERMGOV_HIGH_TEMP", default_value_t = defaults::HIGH_TEMP, allow_negative_numbers = true)]
    pub high_temp: f64,

    /// Lowest PWM level driven (0-255)
    #[arg(long, env = "THERMGOV_MIN_PWM", default_value_t = i64::from(defaults::MIN_PWM), allow_negative_numbers = true)]
    pub min_pwm: i64,

    /// Highest PWM level driven (0-255)
    #[arg(long, env = "THERMGOV_MAX_PWM", default_value_t = i64::from(defaults::MAX_PWM), allow_negative_numbers = true)]
    pub max_pwm: i64,

    /// Temperature source: "auto" or an absolute path
    #[arg(long, env = "THERMGOV_SENSOR", default_value = defaults::AUTO)]
    pub sensor: DeviceSelector,

    /// Actuator: "auto" or an absolute path
    #[arg(long = "pwm", env = "THERMGOV_PWM", default_value = defaults::AUTO)]
    pub actuator: DeviceSelector,

    /// Log every control tick
    #[arg(short, long, env = "THERMGOV_VERBOSE", value_parser = BoolishValueParser::new())]
    pub verbose: bool,

    /// List detected sensors and actuators, then exit
    #[arg(long)]
    pub list: bool,

    /// Print the --list output as JSON
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Diagnose what detection can see and suggest a command line, then exit
    #[arg(long, conflicts_with = "list")]
    pub check: bool,
}

impl Cli {
    /// Validate thresholds, interval and PWM bounds without touching devices
    pub fn controller_settings(&self) -> tg_core::Result<(ControllerConfig, PwmRange)> {
        let config = ControllerConfig::new(self.low_temp, self.high_temp, self.interval, self.verbose)?;
        let range = PwmRange::from_wide(self.min_pwm, self.max_pwm)?;
        Ok((config, range))
    }
}

/// Parse `500ms`, `5s`, `2m` or a bare number of seconds
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (number, scale) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60.0)
    } else {
        (s, 1.0)
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid interval {:?} (expected e.g. 500ms, 5s, 1m)", s))?;
    let interval = Duration::try_from_secs_f64(value * scale)
        .map_err(|_| format!("interval {:?} is out of range", s))?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}
