//! Cooling actuators
//!
//! Every actuator accepts a unified drive level (0-255) and converts it to
//! whatever its device understands. Two kinds exist:
//!
//! - **PWM** (`pwmN` in hwmon): the unified level is the duty cycle.
//! - **Cooling device** (`cooling_deviceN` in the thermal tree): a small
//!   number of discrete states, rescaled from the unified level.
//!
//! # Ownership of device state
//!
//! Acquiring an actuator takes control away from the platform (PWM mode
//! flag forced to manual, cooling state overwritten). The state that was
//! there before is captured at acquisition and written back exactly once by
//! [`Actuator::close`], or on drop if nobody closed it.

use std::path::Path;

use tracing::trace;

use crate::data::PwmRange;
use crate::error::{Result, ThermgovError};
use crate::hw::cooling::CoolingActuator;
use crate::hw::pwm::PwmActuator;

/// A device that can be driven at a unified level
#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send + Sync {
    /// Clamp `level` into `[min_speed, max_speed]` and write it, unless it
    /// equals the last level written
    fn set_speed(&self, level: u8) -> Result<()>;

    /// Read the device and report its level on the unified scale
    fn current_speed(&self) -> Result<u8>;

    /// Lowest unified level this actuator will drive
    fn min_speed(&self) -> u8;

    /// Highest unified level this actuator will drive
    fn max_speed(&self) -> u8;

    /// Hand control back to the platform. Only the first call touches the
    /// device; later calls return `Ok(())`.
    fn close(&self) -> Result<()>;

    /// Backing file or directory, for logs
    fn describe(&self) -> String;
}

/// Bookkeeping every actuator keeps behind its mutex
#[derive(Debug)]
pub(crate) struct ActuatorState<M> {
    last_written: Option<u8>,
    original: Option<M>,
    released: bool,
}

impl<M> ActuatorState<M> {
    pub(crate) fn new(original: Option<M>) -> Self {
        Self {
            last_written: None,
            original,
            released: false,
        }
    }

    /// Write `level` through `write` unless it repeats the last level.
    /// Returns whether the device was written.
    pub(crate) fn drive(
        &mut self,
        path: &Path,
        level: u8,
        write: impl FnOnce(u8) -> Result<()>,
    ) -> Result<bool> {
        if self.released {
            return Err(ThermgovError::ActuatorReleased {
                path: path.to_path_buf(),
            });
        }
        if self.last_written == Some(level) {
            trace!(path = %path.display(), level, "level unchanged, skipping write");
            return Ok(false);
        }
        write(level)?;
        self.last_written = Some(level);
        Ok(true)
    }

    /// Mark released and hand out the captured original state, once
    pub(crate) fn release(&mut self) -> Option<M> {
        if self.released {
            return None;
        }
        self.released = true;
        self.original.take()
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released
    }

    #[cfg(test)]
    pub(crate) fn last_written(&self) -> Option<u8> {
        self.last_written
    }
}

/// Open an explicit actuator path: a directory is a cooling device, a file
/// is a PWM channel driven within `range`
pub fn open_actuator(path: &Path, range: PwmRange) -> Result<Box<dyn Actuator>> {
    if path.is_dir() {
        Ok(Box::new(CoolingActuator::open(path)?))
    } else if path.exists() {
        Ok(Box::new(PwmActuator::open(path, range)?))
    } else {
        Err(ThermgovError::invalid_path(path, "actuator path does not exist"))
    }
}
