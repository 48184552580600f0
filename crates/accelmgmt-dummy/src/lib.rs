//! accelmgmt-dummy - In-memory accelerator card emulator
//!
//! This crate provides a dummy device that answers attribute queries from a
//! table and holds its "flash" in memory. It's useful for testing and
//! development without real hardware.
//!
//! # Usage with accelmgmt CLI
//!
//! ```bash
//! # Versal-class card, dump its config
//! accelmgmt dump -d dummy:versal=1 --config -o cfg.ini
//!
//! # 2 MiB flash image
//! accelmgmt dump -d dummy:flash=2M --flash -o img.bin
//!
//! # Card in manufacturing mode whose XMC power override query fails
//! accelmgmt dump -d dummy:mfg=1,fail=xmc_scaling_power_override -c -o cfg.ini
//! ```

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor};
use std::path::Path;

use accelmgmt_core::attribute::{AttributeId, AttributeValue};
use accelmgmt_core::device::Device;
use accelmgmt_core::error::{FlashError, QueryError};
use accelmgmt_core::flash::{copy_image, FlashSession, ReadbackProgress};
use thiserror::Error;

/// Errors from parsing dummy device options
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DummyError {
    /// A flag option was not 0/1
    #[error("Invalid value for '{name}': '{value}' (expected 0 or 1)")]
    InvalidFlag { name: &'static str, value: String },

    /// The flash size could not be parsed
    #[error("Invalid flash size: '{0}'")]
    InvalidSize(String),

    /// The flash size exceeds what the emulator will allocate
    #[error("Flash size {size:#x} exceeds the {max:#x} byte limit")]
    FlashTooLarge { size: usize, max: usize },

    /// `fail=` named an attribute that does not exist
    #[error("Unknown attribute: '{0}'")]
    UnknownAttribute(String),
}

/// Result type for dummy device operations
pub type Result<T> = std::result::Result<T, DummyError>;

/// Configuration for the dummy device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Versal-class card (scaling read from the XGQ namespace)
    pub versal: bool,
    /// Running the manufacturing image
    pub mfg: bool,
    /// Running the recovery image
    pub recovery: bool,
    /// Flash size in bytes
    pub flash_size: usize,
    /// Whether the flash session reports itself valid
    pub flash_valid: bool,
    /// Attributes whose queries fail
    pub failing: HashSet<AttributeId>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            versal: false,
            mfg: false,
            recovery: false,
            flash_size: 1024 * 1024,
            flash_valid: true,
            failing: HashSet::new(),
        }
    }
}

/// Dummy accelerator card
///
/// Emulates a card in memory for testing purposes.
pub struct DummyDevice {
    config: DummyConfig,
    values: HashMap<AttributeId, AttributeValue>,
    flash: Vec<u8>,
}

impl DummyDevice {
    /// Create a new dummy device with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let values = default_values(&config);
        let flash = (0..config.flash_size).map(flash_pattern).collect();
        Self {
            config,
            values,
            flash,
        }
    }

    /// Create a new dummy device with default configuration (legacy card, 1 MiB flash)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Override an attribute value
    pub fn set(&mut self, attr: AttributeId, value: AttributeValue) {
        self.values.insert(attr, value);
    }

    /// Get a reference to the flash data
    pub fn flash_data(&self) -> &[u8] {
        &self.flash
    }

}

/// Byte stored at `offset` of a fresh dummy flash
fn flash_pattern(offset: usize) -> u8 {
    (offset % 251) as u8
}

fn default_values(config: &DummyConfig) -> HashMap<AttributeId, AttributeValue> {
    use AttributeValue::{Bool, Int};

    let mut values = HashMap::from([
        (AttributeId::ConfigMailboxChannelDisable, Int(0x20)),
        (AttributeId::ConfigMailboxChannelSwitch, Int(0)),
        (AttributeId::ConfigXclbinChange, Bool(true)),
        (AttributeId::CacheXclbin, Bool(false)),
        (AttributeId::IsMfg, Bool(config.mfg)),
        (AttributeId::IsRecovery, Bool(config.recovery)),
        (AttributeId::IsVersal, Bool(config.versal)),
    ]);

    // Only the namespace matching the hardware class exists
    if config.versal {
        values.insert(AttributeId::XgqScalingEnabled, Bool(true));
        values.insert(AttributeId::XgqScalingPowerOverride, Int(150));
        values.insert(AttributeId::XgqScalingTempOverride, Int(95));
    } else {
        values.insert(AttributeId::XmcScalingEnabled, Bool(false));
        values.insert(AttributeId::XmcScalingPowerOverride, Int(225));
        values.insert(AttributeId::XmcScalingTempOverride, Int(105));
    }

    values
}

impl Device for DummyDevice {
    fn id(&self) -> String {
        "dummy".to_string()
    }

    fn query(&self, attr: AttributeId) -> std::result::Result<AttributeValue, QueryError> {
        if self.config.failing.contains(&attr) {
            return Err(QueryError::Read {
                attr,
                source: io::Error::new(io::ErrorKind::Other, "injected failure"),
            });
        }
        self.values
            .get(&attr)
            .copied()
            .ok_or(QueryError::Unsupported { attr })
    }

    fn flash_session(&self) -> Box<dyn FlashSession + '_> {
        Box::new(DummyFlash {
            data: &self.flash,
            valid: self.config.flash_valid,
        })
    }
}

/// Flash session over the in-memory image
struct DummyFlash<'a> {
    data: &'a [u8],
    valid: bool,
}

impl FlashSession for DummyFlash<'_> {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn size(&self) -> std::result::Result<u64, FlashError> {
        Ok(self.data.len() as u64)
    }

    fn read_back(
        &mut self,
        output: &Path,
        progress: &mut dyn ReadbackProgress,
    ) -> std::result::Result<u64, FlashError> {
        log::debug!("dummy: reading back {} bytes", self.data.len());
        copy_image(
            &mut Cursor::new(self.data),
            self.data.len() as u64,
            output,
            progress,
        )
    }
}

/// Largest flash the emulator allocates (256 MiB)
pub const MAX_FLASH_SIZE: usize = 256 * 1024 * 1024;

/// Parse a size that can be decimal, hex (0x...) or use a K/M suffix
fn parse_size(s: &str) -> Result<usize> {
    let invalid = || DummyError::InvalidSize(s.to_string());
    let s = s.trim();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix(['M', 'm']) {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix(['K', 'k']) {
        (n, 1024)
    } else {
        (s, 1)
    };

    let num = if let Some(hex) = num_str.strip_prefix("0x").or_else(|| num_str.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else {
        num_str.parse::<usize>().map_err(|_| invalid())?
    };

    let size = num.checked_mul(multiplier).ok_or_else(invalid)?;
    if size > MAX_FLASH_SIZE {
        return Err(DummyError::FlashTooLarge {
            size,
            max: MAX_FLASH_SIZE,
        });
    }
    Ok(size)
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(DummyError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

/// Parse dummy device options from key-value pairs
///
/// # Supported options
/// - `versal=0|1` - Versal-class card
/// - `mfg=0|1` - Manufacturing image
/// - `recovery=0|1` - Recovery image
/// - `flash=SIZE` - Flash size (e.g. `1M`, `0x10000`), at most [`MAX_FLASH_SIZE`]
/// - `invalid=0|1` - Flash session reports invalid
/// - `fail=ATTR[+ATTR...]` - Attribute queries that fail
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "versal" => config.versal = parse_flag("versal", value)?,
            "mfg" => config.mfg = parse_flag("mfg", value)?,
            "recovery" => config.recovery = parse_flag("recovery", value)?,
            "invalid" => config.flash_valid = !parse_flag("invalid", value)?,
            "flash" => config.flash_size = parse_size(value)?,
            "fail" => {
                for name in value.split('+').filter(|n| !n.is_empty()) {
                    let attr = AttributeId::from_name(name)
                        .ok_or_else(|| DummyError::UnknownAttribute(name.to_string()))?;
                    config.failing.insert(attr);
                }
            }
            _ => {
                log::warn!("Unknown dummy option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelmgmt_core::{build_config_record, execute_dump, DumpMode, DumpRequest, NoProgress};

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("0x1000").unwrap(), 4096);
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("2M").unwrap(), 2 * 1024 * 1024);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_parse_size_limit() {
        assert_eq!(parse_size("256M").unwrap(), MAX_FLASH_SIZE);
        assert_eq!(
            parse_size("100000M"),
            Err(DummyError::FlashTooLarge {
                size: 100000 * 1024 * 1024,
                max: MAX_FLASH_SIZE,
            })
        );
        assert!(matches!(
            parse_options(&[("flash", "0x20000000")]),
            Err(DummyError::FlashTooLarge { .. })
        ));
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("versal", "1"),
            ("flash", "64K"),
            ("fail", "xgq_scaling_enabled+is_mfg"),
        ])
        .unwrap();
        assert!(config.versal);
        assert!(!config.mfg);
        assert_eq!(config.flash_size, 64 * 1024);
        assert!(config.failing.contains(&AttributeId::XgqScalingEnabled));
        assert!(config.failing.contains(&AttributeId::IsMfg));

        assert_eq!(
            parse_options(&[("mfg", "maybe")]),
            Err(DummyError::InvalidFlag {
                name: "mfg",
                value: "maybe".into()
            })
        );
        assert_eq!(
            parse_options(&[("fail", "bogus")]),
            Err(DummyError::UnknownAttribute("bogus".into()))
        );
    }

    #[test]
    fn test_only_matching_namespace_exists() {
        let legacy = DummyDevice::new_default();
        assert!(legacy.query(AttributeId::XmcScalingEnabled).is_ok());
        assert!(matches!(
            legacy.query(AttributeId::XgqScalingEnabled),
            Err(QueryError::Unsupported { .. })
        ));

        let versal = DummyDevice::new(DummyConfig {
            versal: true,
            ..Default::default()
        });
        let record = build_config_record(&versal).unwrap();
        assert_eq!(record.get("scaling_power_override"), Some(AttributeValue::Int(150)));
    }

    #[test]
    fn test_flash_readback() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("img.bin");
        let dev = DummyDevice::new(DummyConfig {
            flash_size: 10_000,
            ..Default::default()
        });

        let request = DumpRequest::new(&out, Some(DumpMode::Flash), false);
        execute_dump(&dev, &request, &mut NoProgress).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), dev.flash_data());
    }

    #[test]
    fn test_invalid_flash_session() {
        let dev = DummyDevice::new(parse_options(&[("invalid", "1")]).unwrap());
        assert!(!dev.flash_session().is_valid());
    }

    #[test]
    fn test_override_value() {
        let mut dev = DummyDevice::new_default();
        dev.set(AttributeId::CacheXclbin, AttributeValue::Bool(true));
        assert_eq!(
            dev.query(AttributeId::CacheXclbin).unwrap(),
            AttributeValue::Bool(true)
        );
    }
}
