//! Device attributes
//!
//! Every attribute the management tool reads from a card has an
//! [`AttributeId`]. Each id knows its canonical name and the kind of value
//! it carries, so backends can parse raw text into an [`AttributeValue`]
//! without knowing what the attribute is used for.

use core::fmt;

use crate::error::QueryError;

/// The kind of value an attribute holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Flag, rendered as `0`/`1`
    Bool,
    /// Unsigned integer, rendered in decimal
    Int,
}

/// Attributes that can be queried from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeId {
    // Mailbox / xclbin configuration
    ConfigMailboxChannelDisable,
    ConfigMailboxChannelSwitch,
    ConfigXclbinChange,
    CacheXclbin,

    // Device state
    IsMfg,
    IsRecovery,
    IsVersal,

    // Scaling, versal-class (XGQ) namespace
    XgqScalingEnabled,
    XgqScalingPowerOverride,
    XgqScalingTempOverride,

    // Scaling, legacy (XMC) namespace
    XmcScalingEnabled,
    XmcScalingPowerOverride,
    XmcScalingTempOverride,
}

impl AttributeId {
    /// Every known attribute
    pub const ALL: [AttributeId; 13] = [
        Self::ConfigMailboxChannelDisable,
        Self::ConfigMailboxChannelSwitch,
        Self::ConfigXclbinChange,
        Self::CacheXclbin,
        Self::IsMfg,
        Self::IsRecovery,
        Self::IsVersal,
        Self::XgqScalingEnabled,
        Self::XgqScalingPowerOverride,
        Self::XgqScalingTempOverride,
        Self::XmcScalingEnabled,
        Self::XmcScalingPowerOverride,
        Self::XmcScalingTempOverride,
    ];

    /// Canonical attribute name
    pub fn name(self) -> &'static str {
        match self {
            Self::ConfigMailboxChannelDisable => "config_mailbox_channel_disable",
            Self::ConfigMailboxChannelSwitch => "config_mailbox_channel_switch",
            Self::ConfigXclbinChange => "config_xclbin_change",
            Self::CacheXclbin => "cache_xclbin",
            Self::IsMfg => "is_mfg",
            Self::IsRecovery => "is_recovery",
            Self::IsVersal => "is_versal",
            Self::XgqScalingEnabled => "xgq_scaling_enabled",
            Self::XgqScalingPowerOverride => "xgq_scaling_power_override",
            Self::XgqScalingTempOverride => "xgq_scaling_temp_override",
            Self::XmcScalingEnabled => "xmc_scaling_enabled",
            Self::XmcScalingPowerOverride => "xmc_scaling_power_override",
            Self::XmcScalingTempOverride => "xmc_scaling_temp_override",
        }
    }

    /// Look up an attribute by its canonical name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }

    /// Kind of value the attribute carries
    pub fn kind(self) -> ValueKind {
        match self {
            Self::ConfigMailboxChannelDisable
            | Self::ConfigMailboxChannelSwitch
            | Self::XgqScalingPowerOverride
            | Self::XgqScalingTempOverride
            | Self::XmcScalingPowerOverride
            | Self::XmcScalingTempOverride => ValueKind::Int,
            Self::ConfigXclbinChange
            | Self::CacheXclbin
            | Self::IsMfg
            | Self::IsRecovery
            | Self::IsVersal
            | Self::XgqScalingEnabled
            | Self::XmcScalingEnabled => ValueKind::Bool,
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A queried attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    Int(u64),
}

impl AttributeValue {
    /// Parse raw attribute text (as exposed by sysfs or an INI file)
    ///
    /// Accepts decimal or `0x` hex. Booleans are any non-zero number.
    pub fn parse(attr: AttributeId, text: &str) -> Result<Self, QueryError> {
        let raw = parse_number(text.trim()).ok_or_else(|| QueryError::Parse {
            attr,
            value: text.trim().to_string(),
        })?;

        Ok(match attr.kind() {
            ValueKind::Bool => Self::Bool(raw != 0),
            ValueKind::Int => Self::Int(raw),
        })
    }

    /// Interpret the value as a flag
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(n) => n != 0,
        }
    }

    /// Interpret the value as an integer
    pub fn as_int(self) -> u64 {
        match self {
            Self::Bool(b) => u64::from(b),
            Self::Int(n) => n,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_int())
    }
}

/// Parse a number that can be hex (0x...) or decimal
pub(crate) fn parse_number(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<u64>().ok()
    }
}
