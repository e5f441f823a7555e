//! hwmon PWM actuator
//!
//! `pwmN` takes a duty cycle 0-255, `pwmN_enable` selects who drives it:
//! 0 = firmware/automatic, 1 = manual (software control). Other values are
//! chip specific and are restored verbatim.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{files, pwm};
use crate::data::PwmRange;
use crate::error::{Result, ThermgovError};
use crate::hw::actuator::{Actuator, ActuatorState};
use crate::hw::sysfs::{self, ReadError};

/// A `pwmN` channel held in manual mode
#[derive(Debug)]
pub struct PwmActuator {
    pwm_path: PathBuf,
    enable_path: PathBuf,
    range: PwmRange,
    state: Mutex<ActuatorState<i64>>,
}

/// `<dir>/pwmN` -> `<dir>/pwmN_enable`
pub fn enable_path_for(pwm_path: &Path) -> PathBuf {
    let mut name = pwm_path.file_name().unwrap_or_default().to_os_string();
    name.push(files::PWM_ENABLE_SUFFIX);
    pwm_path.with_file_name(name)
}

impl PwmActuator {
    /// Acquire a confirmed `pwmN` path: remember its mode and switch it to
    /// manual. Nothing is remembered if either step fails.
    pub fn open(pwm_path: impl Into<PathBuf>, range: PwmRange) -> Result<Self> {
        let pwm_path = pwm_path.into();
        if !pwm_path.is_file() {
            return Err(ThermgovError::invalid_path(pwm_path, "PWM control does not exist"));
        }
        let enable_path = enable_path_for(&pwm_path);

        let original_mode = sysfs::read_value::<i64>(&enable_path).map_err(|e| match e {
            ReadError::Io(source) => {
                ThermgovError::malformed(&enable_path, format!("cannot read control mode: {}", source))
            }
            ReadError::Parse(content) => {
                ThermgovError::malformed(&enable_path, format!("unparseable control mode {:?}", content))
            }
        })?;
        debug!(path = %enable_path.display(), mode = original_mode, "Captured original PWM mode");

        sysfs::write_value(&enable_path, pwm::enable::MANUAL).map_err(|e| ThermgovError::ActuatorWrite {
            path: enable_path.clone(),
            reason: format!("failed to enable manual control: {}", e),
        })?;

        info!(
            pwm = %pwm_path.display(),
            original_mode,
            min = range.min(),
            max = range.max(),
            "PWM actuator acquired (manual mode)"
        );

        Ok(Self {
            pwm_path,
            enable_path,
            range,
            state: Mutex::new(ActuatorState::new(Some(original_mode))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.pwm_path
    }

    fn write_pwm(&self, level: u8) -> Result<()> {
        sysfs::write_value(&self.pwm_path, level).map_err(|e| ThermgovError::ActuatorWrite {
            path: self.pwm_path.clone(),
            reason: format!("failed to write PWM value {}: {}", level, e),
        })?;
        debug!(pwm = %self.pwm_path.display(), level, "PWM written");
        Ok(())
    }
}

impl Actuator for PwmActuator {
    fn set_speed(&self, level: u8) -> Result<()> {
        let level = self.range.clamp(level);
        let mut state = self.state.lock();
        state.drive(&self.pwm_path, level, |l| self.write_pwm(l))?;
        Ok(())
    }

    fn current_speed(&self) -> Result<u8> {
        sysfs::read_value::<u8>(&self.pwm_path).map_err(|e| ThermgovError::ActuatorRead {
            path: self.pwm_path.clone(),
            reason: e.to_string(),
        })
    }

    fn min_speed(&self) -> u8 {
        self.range.min()
    }

    fn max_speed(&self) -> u8 {
        self.range.max()
    }

    fn close(&self) -> Result<()> {
        let Some(mode) = self.state.lock().release() else {
            return Ok(());
        };
        sysfs::write_value(&self.enable_path, mode).map_err(|e| ThermgovError::ActuatorWrite {
            path: self.enable_path.clone(),
            reason: format!("failed to restore control mode {}: {}", mode, e),
        })?;
        info!(path = %self.enable_path.display(), mode, "Restored original PWM mode");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("PWM {}", self.pwm_path.display())
    }
}

impl Drop for PwmActuator {
    fn drop(&mut self) {
        if self.state.lock().is_released() {
            return;
        }
        if let Err(e) = self.close() {
            warn!("Failed to release {} on drop: {}", self.pwm_path.display(), e);
        }
    }
}
