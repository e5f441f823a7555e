//! Thermal-framework cooling device actuator
//!
//! A cooling device exposes `max_state` discrete levels (`0..=max_state`)
//! through `cur_state`. The unified 0-255 level is rescaled onto that
//! range; devices with a single on/off step switch at the midpoint instead.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{detection, files, pwm};
use crate::error::{Result, ThermgovError};
use crate::hw::actuator::{Actuator, ActuatorState};
use crate::hw::sysfs::{self, ReadError};

/// Map a unified level onto `0..=max_state`
///
/// Proportional with rounding, except binary devices (`max_state == 1`)
/// which turn on strictly above 127.
pub fn unified_to_native(level: u8, max_state: u32) -> u32 {
    if max_state == 1 {
        return u32::from(level > pwm::BINARY_THRESHOLD);
    }
    (f64::from(level) * f64::from(max_state) / f64::from(pwm::MAX_VALUE)).round() as u32
}

/// Map a native state back to the unified scale
pub fn native_to_unified(state: u32, max_state: u32) -> u8 {
    if max_state == 0 {
        return 0;
    }
    let state = state.min(max_state);
    (u64::from(state) * u64::from(pwm::MAX_VALUE) / u64::from(max_state)) as u8
}

#[derive(Debug)]
struct CoolingState {
    common: ActuatorState<u32>,
    last_native: Option<u32>,
}

/// A `cooling_deviceN` directory under our control
#[derive(Debug)]
pub struct CoolingActuator {
    device_path: PathBuf,
    cur_state_path: PathBuf,
    device_type: String,
    max_state: u32,
    state: Mutex<CoolingState>,
}

impl CoolingActuator {
    /// Acquire a fan cooling device directory
    ///
    /// `type` must contain "fan" and `max_state` must be readable; the
    /// current state is captured so it can be put back on release.
    pub fn open(device_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_keyword(device_path, detection::COOLING_TYPE_KEYWORD)
    }

    /// As [`CoolingActuator::open`], requiring `type` to contain `keyword`
    /// (case-insensitive) instead of "fan"
    pub fn open_with_keyword(device_path: impl Into<PathBuf>, keyword: &str) -> Result<Self> {
        let device_path = device_path.into();
        if !device_path.is_dir() {
            return Err(ThermgovError::invalid_path(device_path, "cooling device does not exist"));
        }

        let type_path = device_path.join(files::COOLING_TYPE);
        let device_type = sysfs::read_trimmed(&type_path)
            .map_err(|e| ThermgovError::malformed(&type_path, format!("cannot read type: {}", e)))?;
        if !device_type.to_lowercase().contains(&keyword.to_lowercase()) {
            return Err(ThermgovError::malformed(
                &type_path,
                format!("type {:?} is not a {:?} cooling device", device_type, keyword),
            ));
        }

        let max_state_path = device_path.join(files::COOLING_MAX_STATE);
        let max_state = sysfs::read_value::<u32>(&max_state_path).map_err(|e| match e {
            ReadError::Io(source) => {
                ThermgovError::malformed(&max_state_path, format!("cannot read max_state: {}", source))
            }
            ReadError::Parse(content) => {
                ThermgovError::malformed(&max_state_path, format!("unparseable max_state {:?}", content))
            }
        })?;

        let cur_state_path = device_path.join(files::COOLING_CUR_STATE);
        let original_state = match sysfs::read_value::<u32>(&cur_state_path) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(path = %cur_state_path.display(), "Cannot capture current cooling state: {}", e);
                None
            }
        };

        info!(
            device = %device_path.display(),
            device_type = %device_type,
            max_state,
            original_state = ?original_state,
            "Cooling device acquired"
        );

        Ok(Self {
            device_path,
            cur_state_path,
            device_type,
            max_state,
            state: Mutex::new(CoolingState {
                common: ActuatorState::new(original_state),
                last_native: None,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.device_path
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn max_state(&self) -> u32 {
        self.max_state
    }

    fn write_state(&self, native: u32) -> Result<()> {
        let native = native.min(self.max_state);
        sysfs::write_value(&self.cur_state_path, native).map_err(|e| ThermgovError::ActuatorWrite {
            path: self.cur_state_path.clone(),
            reason: format!("failed to write cooling state {}: {}", native, e),
        })?;
        debug!(device = %self.device_path.display(), native, max_state = self.max_state, "Cooling state written");
        Ok(())
    }
}

impl Actuator for CoolingActuator {
    fn set_speed(&self, level: u8) -> Result<()> {
        let max_state = self.max_state;
        let mut guard = self.state.lock();
        let CoolingState { common, last_native } = &mut *guard;

        common.drive(&self.device_path, level, |unified| {
            let native = unified_to_native(unified, max_state);
            if *last_native == Some(native) {
                debug!(unified, native, "cooling state unchanged, skipping write");
                return Ok(());
            }
            self.write_state(native)?;
            *last_native = Some(native);
            Ok(())
        })?;
        Ok(())
    }

    fn current_speed(&self) -> Result<u8> {
        let native = sysfs::read_value::<u32>(&self.cur_state_path).map_err(|e| ThermgovError::ActuatorRead {
            path: self.cur_state_path.clone(),
            reason: e.to_string(),
        })?;
        Ok(native_to_unified(native, self.max_state))
    }

    fn min_speed(&self) -> u8 {
        pwm::MIN_VALUE
    }

    fn max_speed(&self) -> u8 {
        pwm::MAX_VALUE
    }

    fn close(&self) -> Result<()> {
        let Some(original) = self.state.lock().common.release() else {
            return Ok(());
        };
        self.write_state(original)?;
        info!(device = %self.device_path.display(), state = original, "Restored original cooling state");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("cooling device {} ({})", self.device_path.display(), self.device_type)
    }
}

impl Drop for CoolingActuator {
    fn drop(&mut self) {
        if self.state.lock().common.is_released() {
            return;
        }
        if let Err(e) = self.close() {
            warn!("Failed to release {} on drop: {}", self.device_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn cooling_dir(device_type: &str, max_state: &str, cur_state: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("type"), device_type).unwrap();
        fs::write(dir.path().join("max_state"), max_state).unwrap();
        fs::write(dir.path().join("cur_state"), cur_state).unwrap();
        dir
    }

    fn cur_state(dir: &tempfile::TempDir) -> String {
        fs::read_to_string(dir.path().join("cur_state")).unwrap().trim().to_string()
    }

    #[test]
    fn test_binary_threshold() {
        assert_eq!(unified_to_native(200, 1), 1);
        assert_eq!(unified_to_native(50, 1), 0);
        assert_eq!(unified_to_native(127, 1), 0);
        assert_eq!(unified_to_native(128, 1), 1);
    }

    #[test]
    fn test_proportional_rescale() {
        assert_eq!(unified_to_native(255, 4), 4);
        assert_eq!(unified_to_native(0, 4), 0);
        assert_eq!(unified_to_native(128, 4), 2);
        assert_eq!(unified_to_native(255, 0), 0);
    }

    #[test]
    fn test_rescale_is_monotonic() {
        for max_state in [0u32, 1, 2, 3, 4, 7, 10] {
            let mut prev = 0;
            for level in 0..=255u8 {
                let native = unified_to_native(level, max_state);
                assert!(native >= prev, "max_state={} level={}", max_state, level);
                assert!(native <= max_state);
                prev = native;
            }
        }
    }

    #[test]
    fn test_native_to_unified() {
        assert_eq!(native_to_unified(4, 4), 255);
        assert_eq!(native_to_unified(2, 4), 127);
        assert_eq!(native_to_unified(0, 4), 0);
        assert_eq!(native_to_unified(1, 0), 0);
        assert_eq!(native_to_unified(9, 4), 255);
    }

    #[test]
    fn test_set_speed_writes_native_state() {
        let dir = cooling_dir("Fan\n", "4\n", "0\n");
        let actuator = CoolingActuator::open(dir.path()).unwrap();
        assert_eq!(actuator.device_type(), "Fan");
        assert_eq!(actuator.max_state(), 4);
        assert_eq!(actuator.min_speed(), 0);
        assert_eq!(actuator.max_speed(), 255);

        actuator.set_speed(255).unwrap();
        assert_eq!(cur_state(&dir), "4");
        assert_eq!(actuator.current_speed().unwrap(), 255);

        actuator.set_speed(128).unwrap();
        assert_eq!(cur_state(&dir), "2");
    }

    #[test]
    fn test_binary_device_skips_same_native_state() {
        let dir = cooling_dir("Fan\n", "1\n", "0\n");
        let actuator = CoolingActuator::open(dir.path()).unwrap();

        actuator.set_speed(200).unwrap();
        assert_eq!(cur_state(&dir), "1");

        // Different unified level, same native state: no write
        fs::write(dir.path().join("cur_state"), "0\n").unwrap();
        actuator.set_speed(210).unwrap();
        assert_eq!(cur_state(&dir), "0");

        actuator.set_speed(100).unwrap();
        assert_eq!(cur_state(&dir), "0");
        actuator.set_speed(128).unwrap();
        assert_eq!(cur_state(&dir), "1");
    }

    #[test]
    fn test_close_restores_original_state_once() {
        let dir = cooling_dir("Fan\n", "3\n", "1\n");
        let actuator = CoolingActuator::open(dir.path()).unwrap();
        actuator.set_speed(255).unwrap();
        assert_eq!(cur_state(&dir), "3");

        actuator.close().unwrap();
        assert_eq!(cur_state(&dir), "1");

        fs::write(dir.path().join("cur_state"), "2\n").unwrap();
        actuator.close().unwrap();
        assert_eq!(cur_state(&dir), "2");
    }

    #[test]
    fn test_malformed_max_state() {
        let dir = cooling_dir("Fan\n", "lots\n", "0\n");
        assert!(matches!(
            CoolingActuator::open(dir.path()),
            Err(ThermgovError::MalformedDevice { .. })
        ));

        fs::remove_file(dir.path().join("max_state")).unwrap();
        assert!(matches!(
            CoolingActuator::open(dir.path()),
            Err(ThermgovError::MalformedDevice { .. })
        ));
    }

    #[test]
    fn test_non_fan_type_rejected() {
        let dir = cooling_dir("Processor\n", "10\n", "3\n");
        assert!(matches!(
            CoolingActuator::open(dir.path()),
            Err(ThermgovError::MalformedDevice { .. })
        ));
        // Rejection happens before anything is written
        assert_eq!(cur_state(&dir), "3");

        let actuator = CoolingActuator::open_with_keyword(dir.path(), "processor").unwrap();
        assert_eq!(actuator.device_type(), "Processor");
    }

    #[test]
    fn test_fan_keyword_is_case_insensitive() {
        let dir = cooling_dir("acpi_FAN\n", "1\n", "0\n");
        assert!(CoolingActuator::open(dir.path()).is_ok());
    }

    #[test]
    fn test_drop_restores_state() {
        let dir = cooling_dir("Fan\n", "4\n", "2\n");
        {
            let actuator = CoolingActuator::open(dir.path()).unwrap();
            actuator.set_speed(0).unwrap();
            assert_eq!(cur_state(&dir), "0");
        }
        assert_eq!(cur_state(&dir), "2");
    }
}
