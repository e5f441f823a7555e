//! Device autodetection
//!
//! Picks one temperature source and one actuator when the user did not name
//! them. The order is fixed:
//!
//! - **Sensor**: first readable thermal zone, else the first hwmon
//!   `tempN_input` whose chip name or label looks like a CPU.
//! - **Actuator**: a fan-typed cooling device, else the first hwmon `pwmN`
//!   on a chip whose name looks like a fan controller. When no cooling
//!   device is fan-typed the first one is still offered, but acquisition
//!   rejects its type and detection moves on to PWM.
//!
//! Entries are visited in file-name order and the first match wins. The
//! pattern tables are data, so tests and unusual boards can swap them.

use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, trace, warn};

use crate::constants::{detection, files, paths};
use crate::data::{
    CoolingDeviceEntry, DeviceSelector, Inventory, PwmChannel, PwmRange, TempChannel,
    ThermalZoneEntry,
};
use crate::error::{Result, ThermgovError};
use crate::hw::actuator::{open_actuator, Actuator};
use crate::hw::cooling::CoolingActuator;
use crate::hw::pwm::PwmActuator;
use crate::hw::sensor::{open_sensor, HwmonSensor, Sensor, ThermalZoneSensor};
use crate::hw::sysfs;

/// Where to look and what to accept
#[derive(Debug, Clone)]
pub struct DetectionPolicy {
    hwmon_root: PathBuf,
    thermal_root: PathBuf,
    max_channels: u32,
    cpu_device_patterns: Vec<Regex>,
    cpu_label_patterns: Vec<Regex>,
    fan_device_patterns: Vec<Regex>,
    cooling_type_keyword: String,
}

/// Compile case-insensitive patterns, keeping their order
pub fn compile_patterns(field: &str, patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| ThermgovError::invalid_config(field, format!("pattern {:?}: {}", p, e)))
        })
        .collect()
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// Directory entries under `root` starting with `prefix`, sorted by name.
/// A missing root yields nothing.
fn sorted_entries(root: &Path, prefix: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    paths
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_label(path: &Path) -> String {
    sysfs::read_trimmed(path).unwrap_or_default()
}

impl DetectionPolicy {
    /// Policy over the live sysfs trees with the built-in pattern tables
    pub fn new() -> Result<Self> {
        Ok(Self {
            hwmon_root: PathBuf::from(paths::HWMON_BASE),
            thermal_root: PathBuf::from(paths::THERMAL_BASE),
            max_channels: detection::MAX_CHANNELS,
            cpu_device_patterns: compile_patterns("cpu_device_patterns", detection::CPU_DEVICE_PATTERNS)?,
            cpu_label_patterns: compile_patterns("cpu_label_patterns", detection::CPU_LABEL_PATTERNS)?,
            fan_device_patterns: compile_patterns("fan_device_patterns", detection::FAN_DEVICE_PATTERNS)?,
            cooling_type_keyword: detection::COOLING_TYPE_KEYWORD.to_string(),
        })
    }

    /// Look somewhere other than `/sys/class/{hwmon,thermal}`
    pub fn with_roots(mut self, hwmon_root: impl Into<PathBuf>, thermal_root: impl Into<PathBuf>) -> Self {
        self.hwmon_root = hwmon_root.into();
        self.thermal_root = thermal_root.into();
        self
    }

    pub fn with_max_channels(mut self, max_channels: u32) -> Self {
        self.max_channels = max_channels;
        self
    }

    pub fn with_cpu_device_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        self.cpu_device_patterns = compile_patterns("cpu_device_patterns", patterns)?;
        Ok(self)
    }

    pub fn with_cpu_label_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        self.cpu_label_patterns = compile_patterns("cpu_label_patterns", patterns)?;
        Ok(self)
    }

    pub fn with_fan_device_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        self.fan_device_patterns = compile_patterns("fan_device_patterns", patterns)?;
        Ok(self)
    }

    pub fn with_cooling_type_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.cooling_type_keyword = keyword.into().to_lowercase();
        self
    }

    pub fn hwmon_root(&self) -> &Path {
        &self.hwmon_root
    }

    pub fn thermal_root(&self) -> &Path {
        &self.thermal_root
    }

    /// Whether a temperature channel looks like the CPU
    pub fn is_cpu_sensor(&self, chip_name: &str, label: &str) -> bool {
        any_match(&self.cpu_device_patterns, chip_name) || any_match(&self.cpu_label_patterns, label)
    }

    /// Whether a chip looks like it drives fans
    pub fn is_fan_chip(&self, chip_name: &str) -> bool {
        any_match(&self.fan_device_patterns, chip_name)
    }

    /// Whether a cooling device type is the preferred kind
    pub fn is_fan_cooling_type(&self, device_type: &str) -> bool {
        device_type.to_lowercase().contains(&self.cooling_type_keyword)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    fn hwmon_chips(&self) -> Vec<(PathBuf, String)> {
        sorted_entries(&self.hwmon_root, "")
            .into_iter()
            .filter(|p| p.is_dir())
            .map(|p| {
                let name = sysfs::read_trimmed(&p.join(files::HWMON_NAME))
                    .unwrap_or_else(|_| detection::UNKNOWN_NAME.to_string());
                (p, name)
            })
            .collect()
    }

    fn scan_temp_channels(&self, read_values: bool) -> Vec<TempChannel> {
        let mut channels = Vec::new();
        for (chip_dir, chip_name) in self.hwmon_chips() {
            trace!("Checking {} ({})", chip_dir.display(), chip_name);
            for index in 1..=self.max_channels {
                let path = chip_dir.join(files::temp_input(index));
                if !path.exists() {
                    continue;
                }
                let label = read_label(&chip_dir.join(files::temp_label(index)));
                let current_temp = if read_values {
                    HwmonSensor::open(&path).and_then(|s| s.read()).ok()
                } else {
                    None
                };
                let matches = self.is_cpu_sensor(&chip_name, &label);
                channels.push(TempChannel {
                    path,
                    chip: entry_name(&chip_dir),
                    chip_name: chip_name.clone(),
                    index,
                    label,
                    current_temp,
                    matches,
                });
            }
        }
        channels
    }

    fn scan_pwm_channels(&self, read_values: bool) -> Vec<PwmChannel> {
        let mut channels = Vec::new();
        for (chip_dir, chip_name) in self.hwmon_chips() {
            let matches = self.is_fan_chip(&chip_name);
            for index in 1..=self.max_channels {
                let path = chip_dir.join(files::pwm(index));
                if !path.exists() {
                    continue;
                }
                let current_value = if read_values {
                    sysfs::read_value::<u8>(&path).ok()
                } else {
                    None
                };
                channels.push(PwmChannel {
                    label: read_label(&chip_dir.join(files::fan_label(index))),
                    path,
                    chip: entry_name(&chip_dir),
                    chip_name: chip_name.clone(),
                    index,
                    current_value,
                    matches,
                });
            }
        }
        channels
    }

    fn thermal_zones(&self) -> Vec<PathBuf> {
        sorted_entries(&self.thermal_root, files::THERMAL_ZONE_PREFIX)
    }

    fn cooling_devices(&self) -> Vec<(PathBuf, String)> {
        sorted_entries(&self.thermal_root, files::COOLING_DEVICE_PREFIX)
            .into_iter()
            .filter_map(|p| match sysfs::read_trimmed(&p.join(files::COOLING_TYPE)) {
                Ok(device_type) => Some((p, device_type)),
                Err(e) => {
                    debug!("Skipping {}: cannot read type: {}", p.display(), e);
                    None
                }
            })
            .collect()
    }

    /// Everything visible, with current values and heuristic verdicts
    pub fn inventory(&self) -> Inventory {
        let thermal_zones = self
            .thermal_zones()
            .into_iter()
            .map(|path| ThermalZoneEntry {
                current_temp: ThermalZoneSensor::open(&path).and_then(|s| s.read()).ok(),
                path,
            })
            .collect();

        let cooling_devices = self
            .cooling_devices()
            .into_iter()
            .map(|(path, device_type)| CoolingDeviceEntry {
                max_state: sysfs::read_value(&path.join(files::COOLING_MAX_STATE)).ok(),
                cur_state: sysfs::read_value(&path.join(files::COOLING_CUR_STATE)).ok(),
                matches: self.is_fan_cooling_type(&device_type),
                device_type,
                path,
            })
            .collect();

        Inventory {
            thermal_zones,
            cooling_devices,
            temp_channels: self.scan_temp_channels(true),
            pwm_channels: self.scan_pwm_channels(true),
        }
    }

    // ========================================================================
    // Sensor detection
    // ========================================================================

    /// First thermal zone that yields a reading
    pub fn detect_thermal_zone(&self) -> Option<ThermalZoneSensor> {
        for zone in self.thermal_zones() {
            let Ok(sensor) = ThermalZoneSensor::open(&zone) else {
                continue;
            };
            match sensor.read() {
                Ok(temp) => {
                    debug!(zone = %zone.display(), temp, "Thermal zone readable");
                    return Some(sensor);
                }
                Err(e) => debug!("Skipping {}: {}", zone.display(), e),
            }
        }
        None
    }

    /// First hwmon temperature channel that looks like the CPU
    pub fn detect_hwmon_sensor(&self) -> Result<HwmonSensor> {
        let channels = self.scan_temp_channels(false);
        info!("Scanning {} hwmon temperature channels", channels.len());

        if let Some(channel) = channels.iter().find(|c| c.matches) {
            info!(sensor = %channel, "Selected CPU temperature sensor");
            return HwmonSensor::open(&channel.path);
        }

        if !channels.is_empty() {
            warn!("No CPU temperature sensor recognised; available channels:");
            for (i, channel) in channels.iter().enumerate() {
                warn!("  {}. {} [{}]", i + 1, channel, channel.path.display());
            }
        }
        Err(ThermgovError::not_found(
            "CPU temperature sensor",
            channels
                .iter()
                .map(|c| format!("{} [{}]", c, c.path.display()))
                .collect(),
        ))
    }

    /// Thermal zone first, hwmon second
    pub fn detect_sensor(&self) -> Result<Box<dyn Sensor>> {
        if let Some(zone) = self.detect_thermal_zone() {
            info!("Using thermal zone sensor {}", zone.path().display());
            return Ok(Box::new(zone));
        }

        info!("No thermal zone available, trying hwmon temperature sensors");
        let sensor = self.detect_hwmon_sensor()?;
        info!("Using hwmon sensor {}", sensor.path().display());
        Ok(Box::new(sensor))
    }

    /// Resolve a sensor selector
    pub fn sensor(&self, selector: &DeviceSelector) -> Result<Box<dyn Sensor>> {
        match selector {
            DeviceSelector::Auto => self.detect_sensor(),
            DeviceSelector::Path(path) => open_sensor(path),
        }
    }

    // ========================================================================
    // Actuator detection
    // ========================================================================

    /// Fan-typed cooling device if any
    ///
    /// Without one, the first cooling device is tried and fails acquisition
    /// with `MalformedDevice`, since only fan-typed devices are driven.
    pub fn detect_cooling_device(&self) -> Result<CoolingActuator> {
        let devices = self.cooling_devices();
        if devices.is_empty() {
            return Err(ThermgovError::not_found("cooling device", Vec::new()));
        }
        debug!("Found {} cooling devices", devices.len());

        let chosen = match devices.iter().find(|(_, t)| self.is_fan_cooling_type(t)) {
            Some((path, device_type)) => {
                info!("Found fan cooling device {} ({})", path.display(), device_type);
                path
            }
            None => {
                let (path, device_type) = &devices[0];
                warn!(
                    "No fan-typed cooling device; trying first one {} ({})",
                    path.display(),
                    device_type
                );
                path
            }
        };
        CoolingActuator::open_with_keyword(chosen, &self.cooling_type_keyword)
    }

    /// First PWM channel on a chip that looks like a fan controller
    pub fn detect_pwm(&self, range: PwmRange) -> Result<PwmActuator> {
        let channels = self.scan_pwm_channels(false);
        info!("Scanning {} hwmon PWM channels", channels.len());

        if let Some(channel) = channels.iter().find(|c| c.matches) {
            info!(pwm = %channel, "Selected PWM channel");
            return PwmActuator::open(&channel.path, range);
        }

        if !channels.is_empty() {
            warn!("No fan PWM channel recognised; available channels:");
            for (i, channel) in channels.iter().enumerate() {
                warn!("  {}. {} [{}]", i + 1, channel, channel.path.display());
            }
        }
        Err(ThermgovError::not_found(
            "PWM fan channel",
            channels
                .iter()
                .map(|c| format!("{} [{}]", c, c.path.display()))
                .collect(),
        ))
    }

    /// Cooling device first, PWM second
    pub fn detect_actuator(&self, range: PwmRange) -> Result<Box<dyn Actuator>> {
        match self.detect_cooling_device() {
            Ok(device) => {
                info!("Using cooling device actuator {}", device.path().display());
                return Ok(Box::new(device));
            }
            Err(e) => info!("Cooling device unavailable ({}), trying PWM", e),
        }

        let pwm = self.detect_pwm(range)?;
        info!("Using PWM actuator {}", pwm.path().display());
        Ok(Box::new(pwm))
    }

    /// Resolve an actuator selector
    pub fn actuator(&self, selector: &DeviceSelector, range: PwmRange) -> Result<Box<dyn Actuator>> {
        match selector {
            DeviceSelector::Auto => self.detect_actuator(range),
            DeviceSelector::Path(path) => open_actuator(path, range),
        }
    }
}
