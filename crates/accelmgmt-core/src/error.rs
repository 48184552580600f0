//! Error types for accelmgmt-core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::attribute::AttributeId;

/// Attribute query failures
#[derive(Debug, Error)]
pub enum QueryError {
    /// The device does not expose this attribute
    #[error("{attr} is not supported by this device")]
    Unsupported { attr: AttributeId },

    /// The attribute exists but could not be read
    #[error("Failed to read {attr}: {source}")]
    Read {
        attr: AttributeId,
        #[source]
        source: io::Error,
    },

    /// The attribute was read but its contents are not a valid value
    #[error("Failed to parse {attr}: '{value}'")]
    Parse { attr: AttributeId, value: String },
}

impl QueryError {
    /// The attribute the failed query was for
    pub fn attribute(&self) -> AttributeId {
        match self {
            Self::Unsupported { attr } | Self::Read { attr, .. } | Self::Parse { attr, .. } => {
                *attr
            }
        }
    }
}

/// Flash readback failures
#[derive(Debug, Error)]
pub enum FlashError {
    /// Failed to open the flash source
    #[error("Failed to open flash device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Flash size could not be determined
    #[error("Unable to determine flash size: {0}")]
    Size(String),

    /// Read from flash failed
    #[error("Read of {len} bytes at offset {offset:#x} failed: {source}")]
    Read {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Failed to create the output image
    #[error("Failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write to the output image
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Dump failures surfaced by the orchestrator
#[derive(Debug, Error)]
pub enum DumpError {
    /// No output file was given
    #[error("Please specify an output file using --output option")]
    MissingOutputPath,

    /// Output exists and overwriting was not authorized
    #[error("Output file already exists: '{}'", .0.display())]
    OutputExists(PathBuf),

    /// Neither flash nor config was requested
    #[error("Please specify a valid option to determine the type of dump")]
    NoModeSelected,

    /// The device has no usable flash session
    #[error("Device {0} does not expose a valid flash session")]
    InvalidDeviceSession(String),

    /// One of the always-present config attributes could not be queried
    #[error("Failed to query device configuration: {0}")]
    MandatoryQuery(#[from] QueryError),

    /// Flash readback failed midway
    #[error("Operation canceled")]
    OperationCanceled {
        #[source]
        source: FlashError,
    },

    /// Writing the config file failed
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for dump operations
pub type Result<T> = std::result::Result<T, DumpError>;
