//! accelmgmt - management-side tool for PCIe accelerator cards
//!
//! The `dump` subcommand captures the state of a card to a file:
//! - **Flash**: the programmed system image, byte for byte
//! - **Config**: device configuration values as an INI file
//!
//! Device access goes through `accelmgmt-device`, which resolves the
//! `--device` selector to a sysfs-backed card or a test backend.

mod cli;
mod commands;

use accelmgmt_device::ResolveOptions;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::dump::{run_dump, DumpArgs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let options = ResolveOptions {
        sysfs_root: cli.sysfs_root.clone(),
        ..Default::default()
    };

    match cli.command {
        Commands::Dump {
            device,
            config,
            flash,
            output,
        } => {
            let args = DumpArgs {
                device,
                config,
                flash,
                output,
                force: cli.force,
            };
            if let Err(e) = run_dump(&args, &options) {
                eprintln!("{}", e.report());
                if e.wants_help() {
                    if let Some(help) = subcommand_help("dump") {
                        eprintln!("\n{}", help);
                    }
                }
                std::process::exit(e.exit_code());
            }
        }
    }

    Ok(())
}

/// Rendered help of a subcommand
fn subcommand_help(name: &str) -> Option<String> {
    let mut cmd = Cli::command();
    cmd.build();
    cmd.find_subcommand_mut(name)
        .map(|sub| sub.render_help().to_string())
}
