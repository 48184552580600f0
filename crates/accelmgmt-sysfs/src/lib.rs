//! accelmgmt-sysfs - Linux sysfs backend
//!
//! This crate talks to accelerator cards through the files their management
//! driver exposes under `/sys/bus/pci/devices/<bdf>/`, and reads the
//! programmed flash image through the MTD device the driver registers.
//!
//! # Layout
//!
//! ```text
//! /sys/bus/pci/devices/0000:d8:00.0/
//! ├── driver -> ../../../bus/pci/drivers/xclmgmt
//! ├── config_mailbox_channel_disable
//! ├── config_mailbox_channel_switch
//! ├── config_xclbin_change
//! ├── cache_xclbin
//! ├── mfg
//! ├── recovery
//! ├── versal
//! ├── xmc.m.1048576/
//! │   ├── scaling_enabled
//! │   ├── scaling_threshold_power_override
//! │   └── scaling_threshold_temp_override
//! ├── xgq_vmr.m.2097152/
//! │   ├── xgq_scaling_enabled
//! │   ├── xgq_scaling_power_override
//! │   └── xgq_scaling_temp_override
//! └── mtd/
//!     └── mtd0/
//!         └── size
//! ```
//!
//! # Usage with accelmgmt CLI
//!
//! ```bash
//! # Dump the config of a specific card
//! accelmgmt dump -d 0000:d8:00.0 --config -o cfg.ini
//!
//! # Read back the flash of the only card in the system
//! accelmgmt dump --flash -o img.bin
//! ```
//!
//! # System Requirements
//!
//! - Management driver bound to the card's management function
//! - Read access to `/dev/mtdN`, which usually requires root

pub mod device;
pub mod error;

// Re-exports
pub use device::{
    list_mgmt_functions, SysfsConfig, SysfsDevice, DEV_ROOT, MGMT_DRIVER, PCI_SYSFS_ROOT,
    USER_DRIVER,
};
pub use error::{Result, SysfsError};
