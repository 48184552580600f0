//! Scripted device for unit tests

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::path::Path;

use crate::attribute::{AttributeId, AttributeValue};
use crate::error::{FlashError, QueryError};
use crate::flash::{copy_image, FlashSession, ReadbackProgress};

/// Device answering from a fixed table
#[derive(Default)]
pub(crate) struct ScriptedDevice {
    values: HashMap<AttributeId, AttributeValue>,
    failing: HashSet<AttributeId>,
    image: Option<Vec<u8>>,
    broken_flash: bool,
}

impl ScriptedDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A healthy device exposing every attribute
    pub(crate) fn full(versal: bool) -> Self {
        Self::new()
            .with(AttributeId::ConfigMailboxChannelDisable, AttributeValue::Int(0x20))
            .with(AttributeId::ConfigMailboxChannelSwitch, AttributeValue::Int(0))
            .with(AttributeId::ConfigXclbinChange, AttributeValue::Bool(true))
            .with(AttributeId::CacheXclbin, AttributeValue::Bool(false))
            .with(AttributeId::IsMfg, AttributeValue::Bool(false))
            .with(AttributeId::IsRecovery, AttributeValue::Bool(false))
            .with(AttributeId::IsVersal, AttributeValue::Bool(versal))
            .with(AttributeId::XgqScalingEnabled, AttributeValue::Bool(true))
            .with(AttributeId::XgqScalingPowerOverride, AttributeValue::Int(150))
            .with(AttributeId::XgqScalingTempOverride, AttributeValue::Int(95))
            .with(AttributeId::XmcScalingEnabled, AttributeValue::Bool(false))
            .with(AttributeId::XmcScalingPowerOverride, AttributeValue::Int(225))
            .with(AttributeId::XmcScalingTempOverride, AttributeValue::Int(105))
    }

    pub(crate) fn with(mut self, attr: AttributeId, value: AttributeValue) -> Self {
        self.values.insert(attr, value);
        self
    }

    pub(crate) fn failing(mut self, attr: AttributeId) -> Self {
        self.failing.insert(attr);
        self
    }

    pub(crate) fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub(crate) fn with_broken_flash(mut self) -> Self {
        self.broken_flash = true;
        self
    }
}

impl crate::device::Device for ScriptedDevice {
    fn id(&self) -> String {
        "scripted".to_string()
    }

    fn query(&self, attr: AttributeId) -> Result<AttributeValue, QueryError> {
        if self.failing.contains(&attr) {
            return Err(QueryError::Read {
                attr,
                source: io::Error::new(io::ErrorKind::Other, "scripted failure"),
            });
        }
        self.values
            .get(&attr)
            .copied()
            .ok_or(QueryError::Unsupported { attr })
    }

    fn flash_session(&self) -> Box<dyn FlashSession + '_> {
        Box::new(ScriptedFlash {
            image: self.image.as_deref(),
            broken: self.broken_flash,
        })
    }
}

struct ScriptedFlash<'a> {
    image: Option<&'a [u8]>,
    broken: bool,
}

/// Reader that always fails
struct Failing;

impl Read for Failing {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "flash controller timeout"))
    }
}

impl FlashSession for ScriptedFlash<'_> {
    fn is_valid(&self) -> bool {
        self.image.is_some()
    }

    fn size(&self) -> Result<u64, FlashError> {
        self.image
            .map(|img| img.len() as u64)
            .ok_or_else(|| FlashError::Size("no flash".into()))
    }

    fn read_back(
        &mut self,
        output: &Path,
        progress: &mut dyn ReadbackProgress,
    ) -> Result<u64, FlashError> {
        let total = self.size()?;
        if self.broken {
            copy_image(&mut Failing, total, output, progress)
        } else {
            let image = self.image.unwrap_or_default();
            copy_image(&mut Cursor::new(image), total, output, progress)
        }
    }
}
