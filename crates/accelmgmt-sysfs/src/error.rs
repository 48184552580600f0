//! Error types for the sysfs backend

use std::io;
use thiserror::Error;

/// Sysfs backend errors
#[derive(Debug, Error)]
pub enum SysfsError {
    /// No sysfs directory for the requested function
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to read a sysfs directory or link
    #[error("Failed to read sysfs '{path}': {source}")]
    SysfsRead {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for sysfs operations
pub type Result<T> = std::result::Result<T, SysfsError>;
