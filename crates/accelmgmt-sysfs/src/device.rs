//! Sysfs-backed device implementation

use crate::error::{Result, SysfsError};
use accelmgmt_core::attribute::{AttributeId, AttributeValue};
use accelmgmt_core::device::{Bdf, Device};
use accelmgmt_core::error::{FlashError, QueryError};
use accelmgmt_core::flash::{copy_image, FlashSession, ReadbackProgress};
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Default sysfs root for PCI functions
pub const PCI_SYSFS_ROOT: &str = "/sys/bus/pci/devices";

/// Device root
pub const DEV_ROOT: &str = "/dev";

/// Driver bound to management physical functions
pub const MGMT_DRIVER: &str = "xclmgmt";

/// Driver bound to user physical functions
pub const USER_DRIVER: &str = "xocl";

/// Where the backend looks for devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsConfig {
    /// Directory holding one entry per PCI function
    pub sysfs_root: PathBuf,
    /// Directory holding MTD character devices
    pub dev_root: PathBuf,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(PCI_SYSFS_ROOT),
            dev_root: PathBuf::from(DEV_ROOT),
        }
    }
}

/// Sysfs location of an attribute: optional sub-device namespace and file name
fn attribute_location(attr: AttributeId) -> (Option<&'static str>, &'static str) {
    match attr {
        AttributeId::ConfigMailboxChannelDisable => (None, "config_mailbox_channel_disable"),
        AttributeId::ConfigMailboxChannelSwitch => (None, "config_mailbox_channel_switch"),
        AttributeId::ConfigXclbinChange => (None, "config_xclbin_change"),
        AttributeId::CacheXclbin => (None, "cache_xclbin"),
        AttributeId::IsMfg => (None, "mfg"),
        AttributeId::IsRecovery => (None, "recovery"),
        AttributeId::IsVersal => (None, "versal"),
        AttributeId::XgqScalingEnabled => (Some("xgq_vmr"), "xgq_scaling_enabled"),
        AttributeId::XgqScalingPowerOverride => (Some("xgq_vmr"), "xgq_scaling_power_override"),
        AttributeId::XgqScalingTempOverride => (Some("xgq_vmr"), "xgq_scaling_temp_override"),
        AttributeId::XmcScalingEnabled => (Some("xmc"), "scaling_enabled"),
        AttributeId::XmcScalingPowerOverride => (Some("xmc"), "scaling_threshold_power_override"),
        AttributeId::XmcScalingTempOverride => (Some("xmc"), "scaling_threshold_temp_override"),
    }
}

/// Read the basename of the `driver` link of a sysfs device
fn read_driver(path: &Path) -> Option<String> {
    let link = fs::read_link(path.join("driver")).ok()?;
    link.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// An accelerator function exposed through sysfs
///
/// Attributes are read from files in the function's sysfs directory or in
/// one of its sub-device directories (`xmc.*`, `xgq_vmr.*`). The flash is
/// reached through the MTD device registered under the function.
///
/// # Example
///
/// ```ignore
/// use accelmgmt_sysfs::{SysfsConfig, SysfsDevice};
///
/// let dev = SysfsDevice::open(&SysfsConfig::default(), "0000:d8:00.0".parse()?)?;
/// println!("driver: {:?}", dev.driver());
/// ```
#[derive(Debug)]
pub struct SysfsDevice {
    bdf: Bdf,
    path: PathBuf,
    dev_root: PathBuf,
    driver: Option<String>,
}

impl SysfsDevice {
    /// Open the function at `bdf`
    ///
    /// # Errors
    /// Returns an error if the function has no sysfs directory.
    pub fn open(config: &SysfsConfig, bdf: Bdf) -> Result<Self> {
        let path = config.sysfs_root.join(bdf.to_string());
        if !path.is_dir() {
            return Err(SysfsError::DeviceNotFound(format!(
                "{} not found ({})",
                bdf,
                path.display()
            )));
        }

        let driver = read_driver(&path);
        debug!("{}: driver={:?}", bdf, driver);

        Ok(Self {
            bdf,
            path,
            dev_root: config.dev_root.clone(),
            driver,
        })
    }

    /// Name of the bound driver, if any
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    /// Whether the function is bound to the user-domain driver
    pub fn is_user_function(&self) -> bool {
        self.driver() == Some(USER_DRIVER)
    }

    /// Locate a sub-device directory by namespace
    ///
    /// Matches a child named exactly `namespace` or starting with `namespace.`
    fn subdevice_dir(&self, namespace: &str) -> Option<PathBuf> {
        let prefix = format!("{}.", namespace);
        let mut matches: Vec<PathBuf> = fs::read_dir(&self.path)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name == namespace || name.starts_with(&prefix)
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    fn attribute_path(&self, attr: AttributeId) -> Option<PathBuf> {
        let (namespace, file) = attribute_location(attr);
        let dir = match namespace {
            Some(ns) => self.subdevice_dir(ns)?,
            None => self.path.clone(),
        };
        Some(dir.join(file))
    }

    /// Find the MTD device registered under this function
    fn find_mtd(&self) -> Option<MtdNode> {
        let mtd_dir = self.path.join("mtd");
        let mut nodes: Vec<(u32, PathBuf)> = fs::read_dir(&mtd_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let num = name.strip_prefix("mtd")?.parse::<u32>().ok()?;
                Some((num, entry.path()))
            })
            .collect();
        nodes.sort();

        let (num, sysfs) = nodes.into_iter().next()?;
        Some(MtdNode {
            sysfs,
            dev: self.dev_root.join(format!("mtd{}", num)),
        })
    }
}

impl Device for SysfsDevice {
    fn id(&self) -> String {
        self.bdf.to_string()
    }

    fn query(&self, attr: AttributeId) -> std::result::Result<AttributeValue, QueryError> {
        let path = self
            .attribute_path(attr)
            .ok_or(QueryError::Unsupported { attr })?;

        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                QueryError::Unsupported { attr }
            } else {
                QueryError::Read { attr, source }
            }
        })?;

        AttributeValue::parse(attr, &text)
    }

    fn flash_session(&self) -> Box<dyn FlashSession + '_> {
        let mtd = self.find_mtd();
        match &mtd {
            Some(node) => debug!("{}: flash at {}", self.bdf, node.dev.display()),
            None => debug!("{}: no MTD device registered", self.bdf),
        }
        Box::new(MtdFlash { mtd })
    }
}

/// MTD device belonging to an accelerator function
#[derive(Debug, Clone)]
struct MtdNode {
    /// Sysfs directory of the MTD device
    sysfs: PathBuf,
    /// Character device node
    dev: PathBuf,
}

/// Flash session reading through an MTD character device
struct MtdFlash {
    mtd: Option<MtdNode>,
}

impl MtdFlash {
    fn node(&self) -> std::result::Result<&MtdNode, FlashError> {
        self.mtd
            .as_ref()
            .ok_or_else(|| FlashError::Size("no MTD device".into()))
    }
}

impl FlashSession for MtdFlash {
    fn is_valid(&self) -> bool {
        self.mtd.is_some()
    }

    fn size(&self) -> std::result::Result<u64, FlashError> {
        let node = self.node()?;
        let path = node.sysfs.join("size");
        let text = fs::read_to_string(&path)
            .map_err(|e| FlashError::Size(format!("{}: {}", path.display(), e)))?;
        let text = text.trim();

        let size = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
        } else {
            text.parse::<u64>()
        };
        size.map_err(|_| FlashError::Size(format!("{}: '{}'", path.display(), text)))
    }

    fn read_back(
        &mut self,
        output: &Path,
        progress: &mut dyn ReadbackProgress,
    ) -> std::result::Result<u64, FlashError> {
        let total = self.size()?;
        let node = self.node()?;

        let mut file = File::open(&node.dev).map_err(|source| FlashError::Open {
            path: node.dev.display().to_string(),
            source,
        })?;

        info!("Reading {} bytes from {}", total, node.dev.display());
        copy_image(&mut file, total, output, progress)
    }
}

/// List management functions under the sysfs root
///
/// A function qualifies when its `driver` link points at the management
/// driver.
pub fn list_mgmt_functions(config: &SysfsConfig) -> Result<Vec<Bdf>> {
    let root = &config.sysfs_root;
    let entries = fs::read_dir(root).map_err(|source| SysfsError::SysfsRead {
        path: root.display().to_string(),
        source,
    })?;

    let mut found: Vec<Bdf> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let bdf: Bdf = entry.file_name().to_string_lossy().parse().ok()?;
            (read_driver(&entry.path()).as_deref() == Some(MGMT_DRIVER)).then_some(bdf)
        })
        .collect();
    found.sort();

    debug!("Found {} management function(s) in {}", found.len(), root.display());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelmgmt_core::{build_config_record, NoProgress};
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    const BDF: &str = "0000:d8:00.0";

    /// Build a fake sysfs tree with one function
    fn fake_tree(driver: &str) -> (TempDir, SysfsConfig) {
        let tmp = TempDir::new().unwrap();
        let sysfs_root = tmp.path().join("sys");
        let dev_root = tmp.path().join("dev");
        let dev = sysfs_root.join(BDF);
        fs::create_dir_all(&dev).unwrap();
        fs::create_dir_all(&dev_root).unwrap();

        let drivers = tmp.path().join("drivers").join(driver);
        fs::create_dir_all(&drivers).unwrap();
        symlink(&drivers, dev.join("driver")).unwrap();

        for (file, value) in [
            ("config_mailbox_channel_disable", "0x20\n"),
            ("config_mailbox_channel_switch", "0\n"),
            ("config_xclbin_change", "1\n"),
            ("cache_xclbin", "0\n"),
            ("mfg", "0\n"),
            ("recovery", "0\n"),
            ("versal", "0\n"),
        ] {
            fs::write(dev.join(file), value).unwrap();
        }

        let xmc = dev.join("xmc.m.1048576");
        fs::create_dir_all(&xmc).unwrap();
        fs::write(xmc.join("scaling_enabled"), "1\n").unwrap();
        fs::write(xmc.join("scaling_threshold_temp_override"), "100\n").unwrap();

        (
            tmp,
            SysfsConfig {
                sysfs_root,
                dev_root,
            },
        )
    }

    fn add_mtd(config: &SysfsConfig, image: &[u8]) {
        let mtd = config.sysfs_root.join(BDF).join("mtd").join("mtd3");
        fs::create_dir_all(&mtd).unwrap();
        fs::write(mtd.join("size"), format!("{}\n", image.len())).unwrap();
        fs::write(config.dev_root.join("mtd3"), image).unwrap();
    }

    #[test]
    fn test_open_missing_device() {
        let (_tmp, config) = fake_tree(MGMT_DRIVER);
        let err = SysfsDevice::open(&config, "0000:3b:00.0".parse().unwrap()).unwrap_err();
        assert!(matches!(err, SysfsError::DeviceNotFound(_)));
    }

    #[test]
    fn test_driver_domain() {
        let (_tmp, config) = fake_tree(USER_DRIVER);
        let dev = SysfsDevice::open(&config, BDF.parse().unwrap()).unwrap();
        assert_eq!(dev.driver(), Some("xocl"));
        assert!(dev.is_user_function());
    }

    #[test]
    fn test_query_attributes() {
        let (_tmp, config) = fake_tree(MGMT_DRIVER);
        let dev = SysfsDevice::open(&config, BDF.parse().unwrap()).unwrap();

        assert_eq!(
            dev.query(AttributeId::ConfigMailboxChannelDisable).unwrap(),
            AttributeValue::Int(32)
        );
        assert_eq!(
            dev.query(AttributeId::XmcScalingEnabled).unwrap(),
            AttributeValue::Bool(true)
        );
        assert!(matches!(
            dev.query(AttributeId::XmcScalingPowerOverride),
            Err(QueryError::Unsupported { .. })
        ));
        assert!(matches!(
            dev.query(AttributeId::XgqScalingEnabled),
            Err(QueryError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_query_parse_error() {
        let (_tmp, config) = fake_tree(MGMT_DRIVER);
        fs::write(config.sysfs_root.join(BDF).join("cache_xclbin"), "garbage").unwrap();
        let dev = SysfsDevice::open(&config, BDF.parse().unwrap()).unwrap();
        assert!(matches!(
            dev.query(AttributeId::CacheXclbin),
            Err(QueryError::Parse { .. })
        ));
    }

    #[test]
    fn test_config_record_from_sysfs() {
        let (_tmp, config) = fake_tree(MGMT_DRIVER);
        let dev = SysfsDevice::open(&config, BDF.parse().unwrap()).unwrap();
        let record = build_config_record(&dev).unwrap();

        let keys: Vec<_> = record.keys().collect();
        assert_eq!(
            keys,
            vec![
                "mailbox_channel_disable",
                "mailbox_channel_switch",
                "xclbin_change",
                "cache_xclbin",
                "scaling_enabled",
                "scaling_temp_override",
            ]
        );
    }

    #[test]
    fn test_flash_session_without_mtd_is_invalid() {
        let (_tmp, config) = fake_tree(MGMT_DRIVER);
        let dev = SysfsDevice::open(&config, BDF.parse().unwrap()).unwrap();
        assert!(!dev.flash_session().is_valid());
    }

    #[test]
    fn test_flash_readback_from_mtd() {
        let (tmp, config) = fake_tree(MGMT_DRIVER);
        let image: Vec<u8> = (0..5000u32).map(|i| (i ^ 0x5a) as u8).collect();
        add_mtd(&config, &image);

        let dev = SysfsDevice::open(&config, BDF.parse().unwrap()).unwrap();
        let mut session = dev.flash_session();
        assert!(session.is_valid());
        assert_eq!(session.size().unwrap(), 5000);

        let out = tmp.path().join("img.bin");
        assert_eq!(session.read_back(&out, &mut NoProgress).unwrap(), 5000);
        assert_eq!(fs::read(&out).unwrap(), image);
    }

    #[test]
    fn test_list_mgmt_functions() {
        let (tmp, config) = fake_tree(MGMT_DRIVER);

        // user function and a non-PCI entry are skipped
        let user = config.sysfs_root.join("0000:d8:00.1");
        fs::create_dir_all(&user).unwrap();
        let xocl = tmp.path().join("drivers").join(USER_DRIVER);
        fs::create_dir_all(&xocl).unwrap();
        symlink(&xocl, user.join("driver")).unwrap();
        fs::create_dir_all(config.sysfs_root.join("not-a-device")).unwrap();

        let found = list_mgmt_functions(&config).unwrap();
        assert_eq!(found, vec![BDF.parse::<Bdf>().unwrap()]);
    }
}
