//! cli
//!
//! Command-line interface layer for sorpush.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging (stderr) and load configuration
//! - Build the content client and credential source, then delegate to
//!   [`crate::engine`]
//!
//! Engine results are printed to stdout as JSON; logs and errors go to
//! stderr.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;

/// Settings shared by every command.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub debug: bool,
    pub quiet: bool,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    let ctx = Context {
        config,
        debug: cli.debug,
        quiet: cli.quiet,
    };
    commands::dispatch(cli.command, &ctx)
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins unless `--debug` is given.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("sorpush=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sorpush=info"))
    };

    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
