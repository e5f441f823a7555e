//! Temperature sources
//!
//! Linux exposes temperatures in millidegrees Celsius through two trees:
//! hwmon `tempN_input` files and firmware thermal zones (`<zone>/temp`).
//! Both are read the same way; they differ only in where the file lives.

use std::path::{Path, PathBuf};

use crate::constants::{files, temperature};
use crate::error::{Result, ThermgovError};
use crate::hw::sysfs::{self, ReadError};

/// A source of temperature readings in degrees Celsius
#[cfg_attr(test, mockall::automock)]
pub trait Sensor: Send + Sync {
    /// Take a fresh reading
    fn read(&self) -> Result<f64>;

    /// Release held resources
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Backing file or directory, for logs
    fn describe(&self) -> String;
}

/// Read a millidegree file and convert to Celsius
fn read_millidegrees(path: &Path) -> Result<f64> {
    match sysfs::read_value::<i64>(path) {
        Ok(raw) => Ok(raw as f64 / temperature::MILLIDEGREE_DIVISOR),
        Err(ReadError::Io(source)) => Err(ThermgovError::SensorUnavailable {
            path: path.to_path_buf(),
            source,
        }),
        Err(ReadError::Parse(content)) => Err(ThermgovError::SensorParse {
            path: path.to_path_buf(),
            content,
        }),
    }
}

/// hwmon `tempN_input` channel
#[derive(Debug, Clone)]
pub struct HwmonSensor {
    input_path: PathBuf,
}

impl HwmonSensor {
    /// Open a confirmed `tempN_input` path
    pub fn open(input_path: impl Into<PathBuf>) -> Result<Self> {
        let input_path = input_path.into();
        if !input_path.is_file() {
            return Err(ThermgovError::invalid_path(
                input_path,
                "temperature input does not exist",
            ));
        }
        Ok(Self { input_path })
    }

    pub fn path(&self) -> &Path {
        &self.input_path
    }
}

impl Sensor for HwmonSensor {
    fn read(&self) -> Result<f64> {
        read_millidegrees(&self.input_path)
    }

    fn describe(&self) -> String {
        format!("hwmon {}", self.input_path.display())
    }
}

/// Firmware thermal zone directory
#[derive(Debug, Clone)]
pub struct ThermalZoneSensor {
    zone_path: PathBuf,
    temp_path: PathBuf,
}

impl ThermalZoneSensor {
    /// Open a confirmed `thermal_zoneN` directory
    pub fn open(zone_path: impl Into<PathBuf>) -> Result<Self> {
        let zone_path = zone_path.into();
        let temp_path = zone_path.join(files::THERMAL_ZONE_TEMP);
        if !temp_path.is_file() {
            return Err(ThermgovError::invalid_path(
                zone_path,
                "thermal zone has no temp attribute",
            ));
        }
        Ok(Self {
            zone_path,
            temp_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.zone_path
    }
}

impl Sensor for ThermalZoneSensor {
    fn read(&self) -> Result<f64> {
        read_millidegrees(&self.temp_path)
    }

    fn describe(&self) -> String {
        format!("thermal zone {}", self.zone_path.display())
    }
}

/// Open an explicit sensor path: a directory is a thermal zone, a file is
/// an hwmon input
pub fn open_sensor(path: &Path) -> Result<Box<dyn Sensor>> {
    if path.is_dir() {
        Ok(Box::new(ThermalZoneSensor::open(path)?))
    } else if path.exists() {
        Ok(Box::new(HwmonSensor::open(path)?))
    } else {
        Err(ThermgovError::invalid_path(path, "sensor path does not exist"))
    }
}
