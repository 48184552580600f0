//! accelmgmt-core - Core library for accelerator card management
//!
//! This crate holds everything the `dump` operation needs that does not
//! depend on a particular device backend:
//!
//! - [`attribute`]: typed device attributes and their values
//! - [`device`]: the `Device` trait every backend implements
//! - [`flash`]: the `FlashSession` trait and progress reporting for readback
//! - [`config`]: building a `ConfigRecord` from attribute queries
//! - [`ini`]: INI serialization of config records
//! - [`dump`]: the dump orchestrator
//!
//! Backends (the in-memory emulator, Linux sysfs) live in their own crates
//! and are opened by name through `accelmgmt-device`.

pub mod attribute;
pub mod config;
pub mod device;
pub mod dump;
pub mod error;
pub mod flash;
pub mod ini;

#[cfg(test)]
pub(crate) mod testing;

pub use attribute::{AttributeId, AttributeValue, ValueKind};
pub use config::{build_config_record, ConfigRecord, ScalingAttributeSet, DEVICE_GROUP};
pub use device::{Bdf, Device, DeviceHandle};
pub use dump::{execute_dump, DumpMode, DumpOutcome, DumpRequest, OutputTarget};
pub use error::{DumpError, FlashError, QueryError};
pub use flash::{copy_image, FlashSession, NoProgress, ReadbackProgress, READ_CHUNK_SIZE};
pub use ini::{parse_ini, to_ini_string, write_ini, IniError, IniSection};
