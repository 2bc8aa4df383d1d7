use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line front end for the catalog cache
#[derive(Parser, Debug)]
#[command(name = "catalog-refresh")]
#[command(about = "Keep a cached copy of a Letterboxd user's watched films")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Configuration file (defaults to the user config directory)")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Return the user's catalog, refreshing the cache when it is stale
    Refresh {
        username: String,

        #[arg(long, help = "Serve the cache as-is without scraping")]
        fast: bool,

        #[arg(short, long, help = "Return at most this many entries")]
        limit: Option<usize>,
    },

    /// Rebuild the user's whole catalog from scratch
    Backfill {
        username: String,

        #[arg(long, help = "Discard an existing cache first")]
        force: bool,
    },

    /// Print the cached record without touching the network
    Show { username: String },
}
