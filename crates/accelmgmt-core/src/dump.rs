//! Dump orchestration
//!
//! [`execute_dump`] validates a [`DumpRequest`] and runs exactly one of the
//! two dump paths:
//!
//! - **Flash**: read back the programmed image through the device's
//!   [`FlashSession`](crate::flash::FlashSession) into a binary file
//! - **Config**: build a [`ConfigRecord`] and write it as INI
//!
//! Validation happens before anything touches the device or the output
//! file, in this order: missing output path, existing output without
//! overwrite permission, no mode selected.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{build_config_record, ConfigRecord};
use crate::device::Device;
use crate::error::{DumpError, Result};
use crate::flash::ReadbackProgress;
use crate::ini;

/// What to dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    /// Programmed flash image, raw binary
    Flash,
    /// Device configuration, INI text
    Config,
}

impl DumpMode {
    /// Resolve the `--flash`/`--config` switches
    ///
    /// Returns `None` if neither is set. If both are set the flash dump
    /// wins and a warning is logged.
    pub fn from_flags(flash: bool, config: bool) -> Option<Self> {
        match (flash, config) {
            (true, true) => {
                log::warn!("Both --flash and --config given, dumping flash only");
                Some(Self::Flash)
            }
            (true, false) => Some(Self::Flash),
            (false, true) => Some(Self::Config),
            (false, false) => None,
        }
    }
}

/// A single dump invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest {
    /// Destination file
    pub output: PathBuf,
    /// Requested mode, `None` if the caller selected nothing
    pub mode: Option<DumpMode>,
    /// Whether an existing output file may be replaced
    pub overwrite: bool,
}

impl DumpRequest {
    pub fn new(output: impl Into<PathBuf>, mode: Option<DumpMode>, overwrite: bool) -> Self {
        Self {
            output: output.into(),
            mode,
            overwrite,
        }
    }
}

/// An output path that passed the pre-flight checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
}

impl OutputTarget {
    /// Check that `path` is usable as a dump destination
    pub fn validate(path: &Path, overwrite: bool) -> Result<Self> {
        if path.as_os_str().is_empty() {
            return Err(DumpError::MissingOutputPath);
        }
        // A dangling symlink counts as existing
        if fs::symlink_metadata(path).is_ok() && !overwrite {
            return Err(DumpError::OutputExists(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of a successful dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// Flash image written
    Flash { path: PathBuf, bytes: u64 },
    /// Config record written
    Config { path: PathBuf, record: ConfigRecord },
}

/// Validate `request` and run the selected dump against `device`
pub fn execute_dump(
    device: &dyn Device,
    request: &DumpRequest,
    progress: &mut dyn ReadbackProgress,
) -> Result<DumpOutcome> {
    log::debug!("Dump request for {}: {:?}", device.id(), request);

    let target = OutputTarget::validate(&request.output, request.overwrite)?;
    let mode = request.mode.ok_or(DumpError::NoModeSelected)?;

    match mode {
        DumpMode::Flash => {
            let bytes = flash_dump(device, &target, progress)?;
            Ok(DumpOutcome::Flash {
                path: target.path,
                bytes,
            })
        }
        DumpMode::Config => {
            let record = config_dump(device, &target)?;
            Ok(DumpOutcome::Config {
                path: target.path,
                record,
            })
        }
    }
}

fn flash_dump(
    device: &dyn Device,
    target: &OutputTarget,
    progress: &mut dyn ReadbackProgress,
) -> Result<u64> {
    let mut session = device.flash_session();
    if !session.is_valid() {
        return Err(DumpError::InvalidDeviceSession(device.id()));
    }

    session.read_back(target.path(), progress).map_err(|source| {
        log::debug!("{}: readback failed: {}", device.id(), source);
        DumpError::OperationCanceled { source }
    })
}

fn config_dump(device: &dyn Device, target: &OutputTarget) -> Result<ConfigRecord> {
    let record = build_config_record(device)?;

    fs::write(target.path(), ini::to_ini_string(&record)).map_err(|source| DumpError::Write {
        path: target.path().to_path_buf(),
        source,
    })?;

    Ok(record)
}
