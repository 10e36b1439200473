//! CLI argument definitions for toolgate.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// toolgate — chat service with human-in-the-loop tool confirmation.
#[derive(Parser)]
#[command(
    name = "toolgate",
    version,
    about = "toolgate — chat service with human-in-the-loop tool confirmation",
    long_about = "A chat backend that streams model responses and pauses whenever the model \
                  requests a confirmation-gated tool, resuming only after an explicit human \
                  decision."
)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind the HTTP server to (overrides config).
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides config).
        #[arg(long, short)]
        port: Option<u16>,

        /// SQLite database path; omit to keep conversations in memory only.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List the registered tools and their confirmation flags.
    Tools,
}
