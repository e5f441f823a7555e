//! Constants and configuration values for thermgov
//!
//! Centralizes sysfs paths, file names, defaults and the heuristic pattern
//! tables used by autodetection.

use std::time::Duration;

/// System paths
pub mod paths {
    /// Base path for hwmon devices
    pub const HWMON_BASE: &str = "/sys/class/hwmon";

    /// Base path for thermal zones and cooling devices
    pub const THERMAL_BASE: &str = "/sys/class/thermal";

    /// journald socket, used to decide where logs go
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// File and entry names inside the device trees
pub mod files {
    /// hwmon chip name
    pub const HWMON_NAME: &str = "name";

    /// Thermal zone directory prefix
    pub const THERMAL_ZONE_PREFIX: &str = "thermal_zone";

    /// Thermal zone temperature file
    pub const THERMAL_ZONE_TEMP: &str = "temp";

    /// Cooling device directory prefix
    pub const COOLING_DEVICE_PREFIX: &str = "cooling_device";

    /// Cooling device type string
    pub const COOLING_TYPE: &str = "type";

    /// Cooling device highest native level
    pub const COOLING_MAX_STATE: &str = "max_state";

    /// Cooling device current native level
    pub const COOLING_CUR_STATE: &str = "cur_state";

    /// Suffix appended to `pwmN` to get its mode file
    pub const PWM_ENABLE_SUFFIX: &str = "_enable";

    pub fn temp_input(index: u32) -> String {
        format!("temp{}_input", index)
    }

    pub fn temp_label(index: u32) -> String {
        format!("temp{}_label", index)
    }

    pub fn pwm(index: u32) -> String {
        format!("pwm{}", index)
    }

    pub fn fan_label(index: u32) -> String {
        format!("fan{}_label", index)
    }
}

/// PWM control constants
pub mod pwm {
    /// Minimum unified drive level
    pub const MIN_VALUE: u8 = 0;

    /// Maximum unified drive level
    pub const MAX_VALUE: u8 = 255;

    /// Binary cooling devices switch on strictly above this level
    pub const BINARY_THRESHOLD: u8 = 127;

    /// PWM enable values
    pub mod enable {
        /// Firmware/automatic control
        pub const AUTOMATIC: i64 = 0;
        /// Manual (software) control
        pub const MANUAL: i64 = 1;
    }
}

/// Temperature constants
pub mod temperature {
    /// Temperature readings are in millidegrees, divide by this to get Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;
}

/// Detection parameters
pub mod detection {
    /// Channels probed per hwmon chip (`temp1..=N`, `pwm1..=N`)
    pub const MAX_CHANNELS: u32 = 10;

    /// Chip names that usually carry the CPU temperature
    pub const CPU_DEVICE_PATTERNS: &[&str] = &[
        "cpu",
        "coretemp",
        "k10temp", // AMD
        "nct6775",
        "asus",
        "it87",
        "acpi",
    ];

    /// Channel labels that usually carry the CPU temperature
    pub const CPU_LABEL_PATTERNS: &[&str] = &["cpu.*temp", "core.*temp", "package.*id", "tccd"];

    /// Chip names that usually drive fans
    pub const FAN_DEVICE_PATTERNS: &[&str] = &["fan", "pwm", "asus", "nct6775", "it87"];

    /// A cooling device is driven only if its type contains this keyword
    pub const COOLING_TYPE_KEYWORD: &str = "fan";

    /// Name used when a chip has no readable `name` file
    pub const UNKNOWN_NAME: &str = "unknown";
}

/// Defaults for the controller
pub mod defaults {
    use super::*;

    /// Sample interval
    pub const INTERVAL: Duration = Duration::from_secs(5);

    /// At or below this temperature the actuator runs at its minimum
    pub const LOW_TEMP: f64 = 40.0;

    /// At or above this temperature the actuator runs at its maximum
    pub const HIGH_TEMP: f64 = 75.0;

    /// Lowest PWM level driven
    pub const MIN_PWM: u8 = 50;

    /// Highest PWM level driven
    pub const MAX_PWM: u8 = 255;

    /// Selector value meaning "find it myself"
    pub const AUTO: &str = "auto";
}
