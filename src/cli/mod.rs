pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skymark")]
#[command(about = "Mirror Bluesky likes into a bookmarking service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in to Bluesky and persist the session
    Login {
        /// One-time sign-in code, if one was already emailed
        #[arg(long)]
        code: Option<String>,
    },
    /// Drop the persisted session
    Logout,
    /// Run a single delivery cycle
    Once {
        /// Build payloads but deliver nothing
        #[arg(long)]
        dry_run: bool,
        /// Write the fetched feed window to the data directory
        #[arg(long)]
        dump_feed: bool,
    },
    /// Poll for new likes on a fixed interval
    Run {
        /// Polling interval (e.g. "60s", "5m", "1h")
        #[arg(short, long)]
        interval: Option<String>,
        /// Build payloads but deliver nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show session and configuration state
    Status,
    /// Verify the bookmarking endpoint and signing secret
    Check,
}
