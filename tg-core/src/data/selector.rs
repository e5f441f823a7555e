//! Explicit-path-or-auto device selection

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::defaults;
use crate::error::{Result, ThermgovError};

/// Which device to use: let detection pick, or a confirmed absolute path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    #[default]
    Auto,
    Path(PathBuf),
}

impl DeviceSelector {
    /// Explicit selector; the path must be absolute
    pub fn path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ThermgovError::invalid_path(
                path,
                format!("must be absolute or \"{}\"", defaults::AUTO),
            ));
        }
        Ok(Self::Path(path))
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Auto => None,
            Self::Path(p) => Some(p),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = ThermgovError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ThermgovError::invalid_path(s, "empty device selector"));
        }
        if s.eq_ignore_ascii_case(defaults::AUTO) {
            return Ok(Self::Auto);
        }
        Self::path(s)
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str(defaults::AUTO),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}
