//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// steward - Reconcile Caddy configuration across its three sources
#[derive(Parser, Debug)]
#[command(name = "steward")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialise the snapshot database
    Init,

    /// Import an existing Caddyfile
    Import {
        /// Path to the Caddyfile; default locations are searched when omitted
        #[arg(long)]
        caddyfile: Option<PathBuf>,
    },

    /// Generate, validate and reload Caddy
    Apply {
        /// Where to write the generated configuration
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output syntax
        #[arg(long, value_enum, default_value_t = OutputFormat::Caddyfile)]
        format: OutputFormat,
    },

    /// Generate and validate the configuration without reloading
    Validate {
        /// Output syntax
        #[arg(long, value_enum, default_value_t = OutputFormat::Caddyfile)]
        format: OutputFormat,
    },

    /// Report snapshot drift, block counts, and service state
    Status {
        /// Compare against this Caddyfile instead of the last imported one
        #[arg(long)]
        caddyfile: Option<PathBuf>,

        /// Include a unified diff when drift is detected
        #[arg(long)]
        diff: bool,

        /// Refresh the live snapshot before reporting
        #[arg(long)]
        refresh_live: bool,
    },

    /// Refresh the live snapshot from the admin API
    RefreshLive,

    /// Report current and latest known versions
    Version,
}

/// Generated configuration syntax
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Caddyfile,
    Json,
}
