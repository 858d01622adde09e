//! magpie CLI - utilities around the magpie harvesting pipeline.
//!
//! The harvest itself runs as a library (`magpie_lib::Supervisor`) behind a
//! deployment-provided search client; this binary covers the pieces that
//! stand alone: previewing how a date range splits across workers,
//! validating an accounts file, and re-running the finalize merge over a
//! raw store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "magpie")]
#[command(about = "Utilities for the magpie post harvester", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview how a date range is split across workers
    Plan {
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: String,

        /// Number of workers; defaults to the account count when an
        /// accounts file is given
        #[arg(short, long)]
        workers: Option<usize>,

        /// Accounts file (JSON array of {username, email, password})
        #[arg(short, long)]
        accounts: Option<PathBuf>,
    },

    /// Validate an accounts file and list its usernames
    Accounts {
        /// Accounts file (JSON array of {username, email, password})
        file: PathBuf,
    },

    /// Re-run the finalize merge over an existing raw store
    Merge {
        /// Raw store to read
        input: PathBuf,

        /// Finalized output path. Defaults to <input stem>_final.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (csv, json)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Overwrite an existing output without asking
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Plan {
            start,
            end,
            workers,
            accounts,
        } => commands::plan(&start, &end, workers, accounts.as_deref()),
        Commands::Accounts { file } => commands::accounts(&file),
        Commands::Merge {
            input,
            output,
            format,
            yes,
        } => commands::merge(&input, output, &format, yes).await,
    }
}
