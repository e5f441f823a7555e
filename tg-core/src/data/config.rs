//! Controller configuration
//!
//! Both types validate on construction, so a value that exists is a value
//! the control loop can run with. Validation never touches a device.

use std::time::Duration;

use serde::Serialize;

use crate::constants::defaults;
use crate::error::{Result, ThermgovError};

/// Immutable settings for one control loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerConfig {
    low_temp: f64,
    high_temp: f64,
    #[serde(with = "duration_ms")]
    interval: Duration,
    verbose: bool,
}

impl ControllerConfig {
    /// Build a config, rejecting `low_temp >= high_temp`, non-finite
    /// thresholds and a zero interval
    pub fn new(low_temp: f64, high_temp: f64, interval: Duration, verbose: bool) -> Result<Self> {
        if !low_temp.is_finite() {
            return Err(ThermgovError::invalid_config("low_temp", "must be a finite number"));
        }
        if !high_temp.is_finite() {
            return Err(ThermgovError::invalid_config("high_temp", "must be a finite number"));
        }
        if low_temp >= high_temp {
            return Err(ThermgovError::invalid_config(
                "low_temp",
                format!("{:.1}°C must be below high_temp {:.1}°C", low_temp, high_temp),
            ));
        }
        if interval.is_zero() {
            return Err(ThermgovError::invalid_config("interval", "must be greater than zero"));
        }

        Ok(Self {
            low_temp,
            high_temp,
            interval,
            verbose,
        })
    }

    pub fn low_temp(&self) -> f64 {
        self.low_temp
    }

    pub fn high_temp(&self) -> f64 {
        self.high_temp
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            low_temp: defaults::LOW_TEMP,
            high_temp: defaults::HIGH_TEMP,
            interval: defaults::INTERVAL,
            verbose: false,
        }
    }
}

/// Unified drive levels a PWM actuator is allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PwmRange {
    min: u8,
    max: u8,
}

impl PwmRange {
    /// Build a range, rejecting `min >= max`
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min >= max {
            return Err(ThermgovError::invalid_config(
                "min_pwm",
                format!("{} must be below max_pwm {}", min, max),
            ));
        }
        Ok(Self { min, max })
    }

    /// Same as [`PwmRange::new`] but for values not yet known to fit in a byte
    pub fn from_wide(min: i64, max: i64) -> Result<Self> {
        let min = u8::try_from(min)
            .map_err(|_| ThermgovError::invalid_config("min_pwm", format!("{} is outside 0-255", min)))?;
        let max = u8::try_from(max)
            .map_err(|_| ThermgovError::invalid_config("max_pwm", format!("{} is outside 0-255", max)))?;
        Self::new(min, max)
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Clamp a unified level into this range
    pub fn clamp(&self, level: u8) -> u8 {
        level.clamp(self.min, self.max)
    }
}

impl Default for PwmRange {
    fn default() -> Self {
        Self {
            min: defaults::MIN_PWM,
            max: defaults::MAX_PWM,
        }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
