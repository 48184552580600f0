//! Device abstraction
//!
//! A [`Device`] answers attribute queries and hands out a flash session.
//! Backends implement it; the CLI only ever sees a [`DeviceHandle`].

use core::fmt;
use core::str::FromStr;

use crate::attribute::{AttributeId, AttributeValue};
use crate::error::QueryError;
use crate::flash::FlashSession;

/// A management-side view of one accelerator card
pub trait Device {
    /// Identifier used in diagnostics (a PCI address for real hardware)
    fn id(&self) -> String;

    /// Query a single attribute
    fn query(&self, attr: AttributeId) -> Result<AttributeValue, QueryError>;

    /// Open a flash session scoped to this device
    ///
    /// The session may be invalid (see [`FlashSession::is_valid`]); callers
    /// must check before reading.
    fn flash_session(&self) -> Box<dyn FlashSession + '_>;

    /// Query an attribute that is allowed to be missing
    ///
    /// Failures are logged at debug level and turned into `None`.
    fn query_optional(&self, attr: AttributeId) -> Option<AttributeValue> {
        match self.query(attr) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("{}: {} unavailable: {}", self.id(), attr, e);
                None
            }
        }
    }

    /// Query a flag, treating any failure as `false`
    fn query_flag(&self, attr: AttributeId) -> bool {
        self.query_optional(attr).is_some_and(AttributeValue::as_bool)
    }
}

/// Owned, type-erased device returned by the resolver
pub struct DeviceHandle {
    device: Box<dyn Device>,
    backend: &'static str,
}

impl DeviceHandle {
    /// Wrap a backend device
    pub fn new(device: Box<dyn Device>, backend: &'static str) -> Self {
        Self { device, backend }
    }

    /// Name of the backend that opened this device
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Borrow the underlying device
    pub fn as_device(&self) -> &dyn Device {
        self.device.as_ref()
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.device.id())
            .field("backend", &self.backend)
            .finish()
    }
}

/// PCI Bus:Device.Function address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bdf {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl FromStr for Bdf {
    type Err = String;

    /// Parse `DDDD:BB:DD.F` or `BB:DD.F` (domain 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid BDF '{}' (expected DDDD:BB:DD.F)", s);

        let (addr, function) = s.rsplit_once('.').ok_or_else(invalid)?;
        let parts: Vec<&str> = addr.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [bus, dev] => ("0", *bus, *dev),
            [dom, bus, dev] => (*dom, *bus, *dev),
            _ => return Err(invalid()),
        };

        let domain = u16::from_str_radix(domain, 16).map_err(|_| invalid())?;
        let bus = u8::from_str_radix(bus, 16).map_err(|_| invalid())?;
        let device = u8::from_str_radix(device, 16).map_err(|_| invalid())?;
        let function = u8::from_str_radix(function, 16).map_err(|_| invalid())?;

        if device > 0x1f || function > 7 {
            return Err(invalid());
        }

        Ok(Self {
            domain,
            bus,
            device,
            function,
        })
    }
}

impl fmt::Display for Bdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}
