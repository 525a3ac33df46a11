//! Command-line interface for the search service.

use clap::{Parser, Subcommand};

/// Agrigrant search - farmer and grant search service
#[derive(Parser)]
#[command(name = "agrigrant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Serve the HTTP API and run the resync scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Rebuild the search index from the primary store once and exit
    #[command(alias = "sync")]
    Resync,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
