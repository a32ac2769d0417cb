//! steward CLI
//!
//! Command-line interface for reconciling Caddy configuration across the
//! managed snapshot, the on-disk Caddyfile, and the live server.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Init => commands::run_init(),
        Commands::Import { caddyfile } => commands::run_import(caddyfile.as_deref()),
        Commands::Apply { output, format } => commands::run_apply(output.as_deref(), format),
        Commands::Validate { format } => commands::run_validate(format),
        Commands::Status {
            caddyfile,
            diff,
            refresh_live,
        } => commands::run_status(caddyfile.as_deref(), diff, refresh_live),
        Commands::RefreshLive => commands::run_refresh_live(),
        Commands::Version => commands::run_version(),
    }
}
