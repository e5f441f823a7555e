//! Error types re-exported from `tg-error`

pub use tg_error::{Result, ThermgovError};
