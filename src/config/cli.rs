use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "daily-ingest")]
#[command(about = "Daily distributor sales ingestion: download, clean, validate and publish")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "ingest.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Log CPU and memory usage per pipeline phase
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download, extract, transform, validate and load once
    Run {
        /// Run as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stay resident and run every day at `schedule.daily_at`
    Serve,
    /// Only download the daily archive into the raw directory
    Download {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Skip the download and process an archive already on disk
    Process {
        /// Archive to read; defaults to the newest one in the raw directory
        #[arg(long)]
        archive: Option<PathBuf>,

        #[arg(long)]
        as_of: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and show what would run
    Check {
        #[arg(long)]
        dry_run: bool,
    },
}
