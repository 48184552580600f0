//! Device registry and resolution
//!
//! This module turns the user's `--device` selector into a `DeviceHandle`.
//! It hides the backend crates from the CLI entirely.

use accelmgmt_core::device::{Bdf, DeviceHandle};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Resolution failures not owned by a backend
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing matched the selector
    #[error("No management device found")]
    NoDevice,

    /// An empty selector matched more than one device
    #[error("Multiple devices found ({}), please specify one with --device", .0.join(", "))]
    Ambiguous(Vec<String>),

    /// The selected function belongs to the user domain
    #[error("{0} is a user function, specify the management function of the card")]
    UserFunction(String),

    /// The selector names no known backend
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// A `key=value` parameter was malformed
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidParameter(String),
}

/// Where and how devices are looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Directory holding one entry per PCI function
    pub sysfs_root: PathBuf,
    /// Directory holding MTD character devices
    pub dev_root: PathBuf,
    /// Accept user-domain functions
    pub in_user_domain: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/bus/pci/devices"),
            dev_root: PathBuf::from("/dev"),
            in_user_domain: false,
        }
    }
}

/// Parsed backend selector parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    /// Backend name
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

/// A parsed `--device` selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Empty selector: the single device in the system
    Auto,
    /// PCI address of a function
    Pci(Bdf),
    /// Named backend with parameters
    Backend(DeviceParams),
}

/// Parse a backend string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_device_params("dummy:versal=1")?;
/// assert_eq!(params.name, "dummy");
/// assert_eq!(params.params.get("versal"), Some(&"1".to_string()));
/// ```
pub fn parse_device_params(s: &str) -> Result<DeviceParams, ResolveError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(ResolveError::InvalidParameter(opt.to_string()));
            }
        }
    }

    Ok(DeviceParams {
        name: name.to_string(),
        params,
    })
}

/// Parse a `--device` selector
pub fn parse_selector(s: &str) -> Result<Selector, ResolveError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Selector::Auto);
    }
    if let Ok(bdf) = s.parse::<Bdf>() {
        return Ok(Selector::Pci(bdf));
    }
    parse_device_params(s).map(Selector::Backend)
}

/// Resolve a device selector and open the device
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the selector
/// 2. Finding the device (enumerating when the selector is empty)
/// 3. Checking the function belongs to the requested domain
/// 4. Wrapping the backend device in a `DeviceHandle`
///
/// # Arguments
/// * `selector` - Device selector (e.g., "0000:d8:00.0" or "dummy:versal=1")
/// * `options` - Lookup roots and domain
///
/// # Example
/// ```ignore
/// let handle = open_device("0000:d8:00.0", &ResolveOptions::default())?;
/// println!("Opened {}", handle.as_device().id());
/// ```
#[allow(unused_variables)] // Used in feature-gated code
pub fn open_device(
    selector: &str,
    options: &ResolveOptions,
) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    match parse_selector(selector)? {
        #[cfg(feature = "sysfs")]
        Selector::Auto => open_single_sysfs(options),

        #[cfg(feature = "sysfs")]
        Selector::Pci(bdf) => open_sysfs(bdf, options),

        Selector::Backend(params) => match params.name.as_str() {
            #[cfg(feature = "dummy")]
            "dummy" => open_dummy(&params),

            _ => Err(ResolveError::UnknownDevice(params.name).into()),
        },

        #[allow(unreachable_patterns)]
        _ => Err(ResolveError::UnknownDevice(selector.to_string()).into()),
    }
}

// Backend-specific open functions
// These handle the details of each backend and return a DeviceHandle

#[cfg(feature = "dummy")]
fn open_dummy(params: &DeviceParams) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    log::info!("Opening dummy device...");

    // Convert HashMap to Vec<(&str, &str)> for parse_options
    let options: Vec<(&str, &str)> = params
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let config = accelmgmt_dummy::parse_options(&options)?;
    let device = accelmgmt_dummy::DummyDevice::new(config);
    Ok(DeviceHandle::new(Box::new(device), "dummy"))
}

#[cfg(feature = "sysfs")]
fn sysfs_config(options: &ResolveOptions) -> accelmgmt_sysfs::SysfsConfig {
    accelmgmt_sysfs::SysfsConfig {
        sysfs_root: options.sysfs_root.clone(),
        dev_root: options.dev_root.clone(),
    }
}

#[cfg(feature = "sysfs")]
fn open_sysfs(
    bdf: Bdf,
    options: &ResolveOptions,
) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    let device = accelmgmt_sysfs::SysfsDevice::open(&sysfs_config(options), bdf)?;

    if device.is_user_function() && !options.in_user_domain {
        return Err(ResolveError::UserFunction(bdf.to_string()).into());
    }

    log::debug!("Opened {} (driver: {:?})", bdf, device.driver());
    Ok(DeviceHandle::new(Box::new(device), "sysfs"))
}

#[cfg(feature = "sysfs")]
fn open_single_sysfs(options: &ResolveOptions) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    let found = accelmgmt_sysfs::list_mgmt_functions(&sysfs_config(options))?;

    match found.as_slice() {
        [] => Err(ResolveError::NoDevice.into()),
        [bdf] => {
            log::info!("Using the only management device found: {}", bdf);
            open_sysfs(*bdf, options)
        }
        many => Err(ResolveError::Ambiguous(many.iter().map(Bdf::to_string).collect()).into()),
    }
}

/// Information about a device backend
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "In-memory card emulator for testing (dummy:versal=1,flash=1M,...)",
    });

    #[cfg(feature = "sysfs")]
    backends.push(BackendInfo {
        name: "sysfs",
        description: "Linux management driver, selected by PCI address (DDDD:BB:DD.F)",
    });

    backends
}

/// Get a short comma-separated list of backend names
pub fn backend_names_short() -> String {
    let backends = available_backends();
    if backends.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}
