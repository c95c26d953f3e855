//! File downloaded bank statements into a dated folder tree on Google Drive.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, error};

mod app_config;
mod drive;
mod extract;
mod mover;
mod onboarding;
mod organiser;
mod trc;

use crate::app_config::Config;
use crate::organiser::Task;
use crate::trc::Trc;

#[derive(Parser)]
#[command(
    version,
    about = "Files downloaded bank statements into a dated folder tree on Google Drive."
)]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a docsort config TOML."
    )]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Upload and archive every statement in the downloads directory.
    Run,

    /// Print the Drive folder id of a logical path, creating missing folders.
    Resolve {
        /// Slash-separated path, e.g. `IZVODI/2025/DINARSKI/PDF`.
        path: String,
    },

    /// Drop cached folder ids that no longer point at live folders.
    Reconcile,
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // Errors use eprintln since tracing isn't initialized yet.
    let config = Config::load_or_create(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    if let Err(error_messages) = config.validate() {
        eprintln!("Configuration is invalid.");
        for msg in &error_messages {
            eprintln!(" - {msg}");
        }
        std::process::exit(1);
    }

    Trc::default().init().unwrap_or_else(|e| {
        eprintln!(
            "Failed to initialize logging. Without logging, we can't provide any useful error \
             messages, so we have to exit: {e}"
        );
        std::process::exit(1);
    });

    let task = match args.command.unwrap_or(Command::Run) {
        Command::Run => Task::Organise,
        Command::Resolve { path } => Task::Resolve(path),
        Command::Reconcile => Task::Reconcile,
    };

    debug!(config = ?config, task = ?task, "Starting.");
    if let Err(e) = organiser::spawn(config, task) {
        error!("{e}");
        std::process::exit(1);
    }
}
