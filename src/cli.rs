//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the device argument
fn device_help() -> String {
    format!(
        "PCI address of the card (DDDD:BB:DD.F) or backend selector [available: {}]",
        accelmgmt_device::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "accelmgmt")]
#[command(author, version, about = "Accelerator card management tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Overwrite existing output files
    #[arg(long, global = true)]
    pub force: bool,

    /// Root of the PCI device tree in sysfs
    #[arg(long, global = true, default_value = "/sys/bus/pci/devices")]
    pub sysfs_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump out the contents of the specified option
    Dump {
        /// Device to work with; may be omitted if only one card is installed
        #[arg(short, long, help = device_help())]
        device: Option<String>,

        /// Dump the output of the system configuration
        #[arg(short, long)]
        config: bool,

        /// Dump the output of the programmed system image
        #[arg(short, long)]
        flash: bool,

        /// Direct the output to the given file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
