//! Device resolution for accelmgmt
//!
//! This crate maps a `--device` selector to an opened device. The CLI
//! should only interact with this crate and `accelmgmt-core`, never with a
//! backend crate directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI (bin/accelmgmt)                     │
//! │  - Parses flags, builds a DumpRequest                        │
//! │  - Never sees SysfsDevice or DummyDevice                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  accelmgmt-device (this crate)               │
//! │  - Selector parsing (PCI address, backend:params, empty)     │
//! │  - open_device: selector -> DeviceHandle                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    accelmgmt-core        │   │  Backend crates          │
//! │  - Device trait          │   │  - sysfs, dummy          │
//! │  - FlashSession trait    │   │  - Implement Device and  │
//! │  - Dump orchestrator     │   │    FlashSession          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use accelmgmt_device::{open_device, ResolveOptions};
//!
//! let handle = open_device("0000:d8:00.0", &ResolveOptions::default())?;
//! let record = accelmgmt_core::build_config_record(handle.as_device())?;
//! ```

mod registry;

pub use registry::{
    available_backends, backend_names_short, open_device, parse_device_params, parse_selector,
    BackendInfo, DeviceParams, ResolveError, ResolveOptions, Selector,
};

// Re-export core types that CLI needs
pub use accelmgmt_core::device::{Device, DeviceHandle};
