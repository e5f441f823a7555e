//! Plain-text sysfs attribute access
//!
//! Device attributes are newline-terminated decimal integers or short
//! strings. Callers map [`ReadError`] into the error variant that fits the
//! device class they are reading.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// Why an attribute could not be read as a value
#[derive(Debug)]
pub enum ReadError {
    /// The file is missing or unreadable
    Io(io::Error),
    /// The file was read but its content did not parse
    Parse(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{}", e),
            Self::Parse(content) => write!(f, "unparseable content {:?}", content),
        }
    }
}

/// Read an attribute with surrounding whitespace removed
pub fn read_trimmed(path: &Path) -> io::Result<String> {
    fs::read_to_string(path).map(|s| s.trim().to_string())
}

/// Read an attribute and parse it
pub fn read_value<T: FromStr>(path: &Path) -> Result<T, ReadError> {
    let content = read_trimmed(path).map_err(ReadError::Io)?;
    content.parse::<T>().map_err(|_| ReadError::Parse(content))
}

/// Write a value followed by a newline
pub fn write_value(path: &Path, value: impl fmt::Display) -> io::Result<()> {
    fs::write(path, format!("{}\n", value))
}
