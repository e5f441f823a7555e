//! Unified error handling for thermgov
//!
//! One error type shared by the core library and the daemon. Variants are
//! grouped by where they originate so callers can tell a missing device
//! class apart from a device that exists but is malformed, and a transient
//! loop failure apart from a fatal construction failure.

use std::io;
use std::path::PathBuf;

/// Result type alias using ThermgovError
pub type Result<T> = std::result::Result<T, ThermgovError>;

/// Unified error type for all thermgov operations
#[derive(thiserror::Error, Debug)]
pub enum ThermgovError {
    // ============================================================================
    // Sensor Errors
    // ============================================================================
    #[error("Temperature source {path} unavailable: {source}")]
    SensorUnavailable {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Malformed temperature value in {path}: {content:?}")]
    SensorParse {
        path: PathBuf,
        content: String,
    },

    // ============================================================================
    // Actuator Errors
    // ============================================================================
    #[error("Failed to read actuator {path}: {reason}")]
    ActuatorRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write actuator {path}: {reason}")]
    ActuatorWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Actuator {path} has already been released")]
    ActuatorReleased {
        path: PathBuf,
    },

    // ============================================================================
    // Construction Errors
    // ============================================================================
    #[error("No {class} found{}", format_candidates(.candidates))]
    DeviceNotFound {
        class: String,
        candidates: Vec<String>,
    },

    #[error("Malformed device {path}: {reason}")]
    MalformedDevice {
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Lifecycle Errors
    // ============================================================================
    #[error("Controller is already running")]
    AlreadyRunning,

    #[error("Controller has already been stopped")]
    AlreadyStopped,
}

fn format_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let mut out = String::from("; candidates:");
    for (i, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, candidate));
    }
    out
}

impl ThermgovError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed device error
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedDevice {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a device-not-found error carrying the enumerated candidates
    pub fn not_found(class: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::DeviceNotFound {
            class: class.into(),
            candidates,
        }
    }

    /// Errors a running control loop should log and ride out
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SensorUnavailable { .. }
                | Self::SensorParse { .. }
                | Self::ActuatorRead { .. }
                | Self::ActuatorWrite { .. }
        )
    }

    /// Errors that abort startup
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. }
                | Self::MalformedDevice { .. }
                | Self::InvalidPath { .. }
                | Self::InvalidConfig { .. }
        )
    }
}
