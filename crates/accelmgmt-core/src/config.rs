//! Device configuration record
//!
//! A [`ConfigRecord`] is the flat, ordered set of configuration attributes
//! written by `dump --config`:
//!
//! ```ini
//! [Device]
//! mailbox_channel_disable = 32
//! mailbox_channel_switch = 0
//! xclbin_change = 1
//! cache_xclbin = 0
//! scaling_enabled = 1
//! scaling_power_override = 150
//! scaling_temp_override = 95
//! ```
//!
//! The first four entries are present on every supported card. The scaling
//! entries depend on the card's firmware image and hardware class, and each
//! one is included only if it can be queried.

use crate::attribute::{AttributeId, AttributeValue};
use crate::device::Device;
use crate::error::QueryError;

/// Group name of the config record
pub const DEVICE_GROUP: &str = "Device";

/// Entries every supported device must expose
const MANDATORY_ENTRIES: [(&str, AttributeId); 4] = [
    ("mailbox_channel_disable", AttributeId::ConfigMailboxChannelDisable),
    ("mailbox_channel_switch", AttributeId::ConfigMailboxChannelSwitch),
    ("xclbin_change", AttributeId::ConfigXclbinChange),
    ("cache_xclbin", AttributeId::CacheXclbin),
];

/// Keys of the scaling block, in record order
const SCALING_KEYS: [&str; 3] = [
    "scaling_enabled",
    "scaling_power_override",
    "scaling_temp_override",
];

/// Ordered key/value configuration under a single group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    group: String,
    entries: Vec<(String, AttributeValue)>,
}

impl ConfigRecord {
    /// Create an empty record
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            entries: Vec::new(),
        }
    }

    /// Group (INI section) name
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Append an entry, keeping insertion order
    pub fn push(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.entries.push((key.into(), value));
    }

    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Whether the record has an entry for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[(String, AttributeValue)] {
        &self.entries
    }

    /// Entry keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which namespace the scaling attributes are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAttributeSet {
    /// Versal-class cards (XGQ based management firmware)
    Xgq,
    /// Legacy cards (XMC microcontroller)
    Xmc,
}

impl ScalingAttributeSet {
    /// Pick the namespace for a device from its `is_versal` flag
    ///
    /// # Errors
    ///
    /// A device that cannot report its class is an error; guessing would
    /// read the other namespace.
    pub fn probe(device: &dyn Device) -> Result<Self, QueryError> {
        if device.query(AttributeId::IsVersal)?.as_bool() {
            Ok(Self::Xgq)
        } else {
            Ok(Self::Xmc)
        }
    }

    /// Record keys paired with the attribute they are read from
    pub fn entries(self) -> [(&'static str, AttributeId); 3] {
        let [enabled, power, temp] = SCALING_KEYS;
        match self {
            Self::Xgq => [
                (enabled, AttributeId::XgqScalingEnabled),
                (power, AttributeId::XgqScalingPowerOverride),
                (temp, AttributeId::XgqScalingTempOverride),
            ],
            Self::Xmc => [
                (enabled, AttributeId::XmcScalingEnabled),
                (power, AttributeId::XmcScalingPowerOverride),
                (temp, AttributeId::XmcScalingTempOverride),
            ],
        }
    }
}

/// Firmware image the device is currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Normal,
    Manufacturing,
    Recovery,
}

fn image_kind(device: &dyn Device) -> ImageKind {
    if device.query_flag(AttributeId::IsMfg) {
        ImageKind::Manufacturing
    } else if device.query_flag(AttributeId::IsRecovery) {
        ImageKind::Recovery
    } else {
        ImageKind::Normal
    }
}

/// Build the config record for `device`
///
/// # Errors
///
/// Returns the first failing mandatory query, or the `is_versal` failure
/// when the scaling block is due. Scaling attributes never cause an error;
/// a failed one is just left out of the record.
pub fn build_config_record(device: &dyn Device) -> Result<ConfigRecord, QueryError> {
    let mut record = ConfigRecord::new(DEVICE_GROUP);

    for (key, attr) in MANDATORY_ENTRIES {
        record.push(key, device.query(attr)?);
    }

    match image_kind(device) {
        ImageKind::Normal => {
            let set = ScalingAttributeSet::probe(device)?;
            log::debug!("{}: reading scaling attributes from {:?}", device.id(), set);

            for (key, attr) in set.entries() {
                if let Some(value) = device.query_optional(attr) {
                    record.push(key, value);
                }
            }
        }
        kind => {
            let image = if kind == ImageKind::Manufacturing {
                "manufacturing"
            } else {
                "recovery"
            };
            log::warn!("This operation is not supported with {} image.", image);
        }
    }

    Ok(record)
}
