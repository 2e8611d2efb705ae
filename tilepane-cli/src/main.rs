//! Tilepane command-line interface.
//!
//! Thin dispatch layer: argument parsing lives with each command in
//! [`commands`], engine behavior lives in the `tilepane` library crate.

mod commands;
mod error;
mod ui;

use clap::{Parser, Subcommand};

use commands::fetch::FetchArgs;
use commands::locate::LocateArgs;
use commands::view::ViewArgs;

/// Slippy-map tile engine for the terminal.
#[derive(Debug, Parser)]
#[command(name = "tilepane", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a position to its tile index and URL
    Locate(LocateArgs),
    /// Download tiles to disk
    Fetch(FetchArgs),
    /// Open the interactive map viewer
    View(ViewArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Locate(args) => commands::locate::run(args),
        Command::Fetch(args) => commands::fetch::run(args),
        Command::View(args) => commands::view::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
