//! Man page generator for accelmgmt
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

fn main() -> std::io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();

    // One page for the tool, one per subcommand
    let mut pages = vec![("accelmgmt.1".to_string(), cmd.clone())];
    for sub in cmd.get_subcommands() {
        pages.push((format!("accelmgmt-{}.1", sub.get_name()), sub.clone()));
    }

    for (file, page) in pages {
        let mut buffer = Vec::new();
        clap_mangen::Man::new(page).render(&mut buffer)?;
        let output_path = output_dir.join(file);
        fs::write(&output_path, buffer)?;
        println!("Man page generated at: {}", output_path.display());
    }

    println!("\nTo view the man page:");
    println!("  man -l {}", output_dir.join("accelmgmt.1").display());

    Ok(())
}
