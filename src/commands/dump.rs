//! Dump command implementation

use accelmgmt_core::{
    execute_dump, DumpError, DumpMode, DumpOutcome, DumpRequest, ReadbackProgress,
};
use accelmgmt_device::{open_device, ResolveOptions};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use thiserror::Error;

/// Parsed `dump` arguments
#[derive(Debug, Clone, Default)]
pub struct DumpArgs {
    pub device: Option<String>,
    pub config: bool,
    pub flash: bool,
    pub output: Option<PathBuf>,
    pub force: bool,
}

impl DumpArgs {
    fn request(&self) -> DumpRequest {
        DumpRequest::new(
            self.output.clone().unwrap_or_default(),
            DumpMode::from_flags(self.flash, self.config),
            self.force,
        )
    }
}

/// Exit status for every failed dump (ECANCELED)
pub const EXIT_CANCELED: i32 = 125;

/// Failure of the dump command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The device selector could not be resolved
    #[error("{0}")]
    Device(Box<dyn std::error::Error>),

    #[error(transparent)]
    Dump(#[from] DumpError),
}

impl CommandError {
    /// Text printed to stderr for this failure
    ///
    /// A failed readback reports the transfer error above the canceled
    /// status.
    pub fn report(&self) -> String {
        match self {
            Self::Dump(DumpError::OperationCanceled { source }) => {
                format!("  ERROR: {}\nERROR: {}", source, self)
            }
            _ => format!("ERROR: {}", self),
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        EXIT_CANCELED
    }

    /// Whether the subcommand help should follow the error message
    pub fn wants_help(&self) -> bool {
        matches!(
            self,
            Self::Dump(DumpError::MissingOutputPath | DumpError::NoModeSelected)
        )
    }
}

/// Progress bar for flash readback
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ReadbackProgress for BarProgress {
    fn started(&mut self, total_bytes: u64) {
        println!("Flash size: {} bytes", total_bytes);

        let pb = ProgressBar::new(total_bytes);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        self.bar = Some(pb);
    }

    fn advanced(&mut self, bytes_read: u64) {
        if let Some(pb) = &self.bar {
            pb.set_position(bytes_read);
        }
    }

    fn finished(&mut self, _total_bytes: u64) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message("Readback complete");
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        // A failed transfer leaves the bar where it stopped
        if let Some(pb) = self.bar.take() {
            pb.abandon();
        }
    }
}

/// Run the dump command
pub fn run_dump(args: &DumpArgs, options: &ResolveOptions) -> Result<DumpOutcome, CommandError> {
    let selector = args.device.as_deref().unwrap_or("");
    let handle = open_device(selector, options).map_err(CommandError::Device)?;
    log::debug!(
        "Using device {} ({} backend)",
        handle.as_device().id(),
        handle.backend()
    );

    let mut progress = BarProgress::default();
    let outcome = execute_dump(handle.as_device(), &args.request(), &mut progress)?;

    println!("{}", success_message(&outcome));
    Ok(outcome)
}

/// Message printed after a successful dump
pub fn success_message(outcome: &DumpOutcome) -> String {
    match outcome {
        DumpOutcome::Flash { path, bytes } => {
            format!("Wrote {} bytes to {}", bytes, path.display())
        }
        DumpOutcome::Config { path, .. } => {
            format!("config has been dumped to {}", path.display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelmgmt_core::FlashError;
    use std::fs;
    use tempfile::TempDir;

    fn args(device: &str, output: Option<PathBuf>) -> DumpArgs {
        DumpArgs {
            device: Some(device.to_string()),
            output,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_dump_through_dummy() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("cfg.ini");
        let mut a = args("dummy:versal=1", Some(out.clone()));
        a.config = true;

        let outcome = run_dump(&a, &ResolveOptions::default()).unwrap();
        assert!(matches!(outcome, DumpOutcome::Config { .. }));
        assert_eq!(
            success_message(&outcome),
            format!("config has been dumped to {}", out.display())
        );

        let text = fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("[Device]\n"));
        assert!(text.contains("scaling_power_override = 150\n"));
    }

    #[test]
    fn test_flash_dump_through_dummy() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("img.bin");
        let mut a = args("dummy:flash=8K", Some(out.clone()));
        a.flash = true;

        let outcome = run_dump(&a, &ResolveOptions::default()).unwrap();
        assert!(matches!(outcome, DumpOutcome::Flash { bytes: 8192, .. }));
        assert_eq!(
            success_message(&outcome),
            format!("Wrote 8192 bytes to {}", out.display())
        );
        assert_eq!(fs::metadata(&out).unwrap().len(), 8192);
    }

    #[test]
    fn test_missing_output_wants_help() {
        let mut a = args("dummy", None);
        a.config = true;

        let err = run_dump(&a, &ResolveOptions::default()).unwrap_err();
        assert!(err.wants_help());
        assert_eq!(
            err.report(),
            "ERROR: Please specify an output file using --output option"
        );
        assert_eq!(err.exit_code(), 125);
    }

    #[test]
    fn test_no_mode_wants_help() {
        let tmp = TempDir::new().unwrap();
        let a = args("dummy", Some(tmp.path().join("out")));

        let err = run_dump(&a, &ResolveOptions::default()).unwrap_err();
        assert!(err.wants_help());
        assert_eq!(
            err.report(),
            "ERROR: Please specify a valid option to determine the type of dump"
        );
        assert_eq!(err.exit_code(), 125);
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_existing_output_needs_force() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("cfg.ini");
        fs::write(&out, "keep").unwrap();

        let mut a = args("dummy", Some(out.clone()));
        a.config = true;
        let err = run_dump(&a, &ResolveOptions::default()).unwrap_err();
        assert!(!err.wants_help());
        assert!(err.to_string().starts_with("Output file already exists"));
        assert_eq!(fs::read_to_string(&out).unwrap(), "keep");

        a.force = true;
        run_dump(&a, &ResolveOptions::default()).unwrap();
        assert!(fs::read_to_string(&out).unwrap().starts_with("[Device]"));
    }

    #[test]
    fn test_unknown_device() {
        let tmp = TempDir::new().unwrap();
        let mut a = args("nosuch", Some(tmp.path().join("out")));
        a.flash = true;

        let err = run_dump(&a, &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, CommandError::Device(_)));
        assert!(!err.wants_help());
        assert_eq!(err.report(), "ERROR: Unknown device: nosuch");
        assert_eq!(err.exit_code(), 125);
    }

    #[test]
    fn test_canceled_readback_reports_transfer_error() {
        let err = CommandError::Dump(DumpError::OperationCanceled {
            source: FlashError::Size("no MTD device".into()),
        });
        assert!(!err.wants_help());
        assert_eq!(
            err.report(),
            "  ERROR: Unable to determine flash size: no MTD device\nERROR: Operation canceled"
        );
        assert_eq!(err.exit_code(), 125);
    }

    #[test]
    fn test_invalid_flash_session() {
        let tmp = TempDir::new().unwrap();
        let mut a = args("dummy:invalid=1", Some(tmp.path().join("img.bin")));
        a.flash = true;

        let err = run_dump(&a, &ResolveOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Dump(DumpError::InvalidDeviceSession(_))
        ));
    }
}
