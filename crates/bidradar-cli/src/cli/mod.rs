//! CLI for the bidradar collection engine.

mod commands;

use anyhow::Result;
use bidradar_core::collect::Mode;
use bidradar_core::config;
use bidradar_core::normalize::RecordKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{
    run_collect, run_match, run_quality, run_records, run_retry_queue, run_run_status, CollectArgs,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bidradar")]
#[command(about = "bidradar: resilient collector for public-procurement bids and awards", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Collect bids or awards from the mock source or the live API.
    Collect {
        /// Record kind: bids or awards.
        kind: RecordKind,

        /// mock or live (alias: real).
        #[arg(long, default_value = "mock")]
        mode: Mode,

        /// Live mode: maximum number of pages (1-10).
        #[arg(long, default_value = "3", value_name = "N")]
        pages: u32,

        /// Mock mode: number of records (1-1000). Defaults to 200 bids or 60 awards.
        #[arg(long, value_name = "N")]
        count: Option<usize>,

        /// Run id used in artifact names (generated when omitted).
        #[arg(long)]
        run_id: Option<String>,

        /// Mock mode: probability (0.0-1.0) that the run fails and lands in the retry queue.
        #[arg(long, default_value = "0.0", value_name = "P")]
        fail_rate: f64,

        /// Replace backoff waits with a short fixed pause.
        #[arg(long)]
        fast_retry: bool,

        /// Awards only: bid artifact to compute the join match rate against.
        #[arg(long, value_name = "PATH")]
        bids_file: Option<PathBuf>,

        /// Directory for artifacts and retry queues (overrides config).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Do not write records to the SQLite store.
        #[arg(long)]
        no_persist: bool,

        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the retry queue for a record kind.
    RetryQueue {
        kind: RecordKind,

        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Run the data quality check on an artifact.
    Quality {
        /// Path to a `collected_*.json` artifact.
        artifact: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Bid/award join match rate between two artifacts.
    Match {
        /// Award artifact.
        awards: PathBuf,
        /// Bid artifact.
        bids: PathBuf,
    },

    /// Count and sample stored records.
    Records {
        kind: RecordKind,

        /// Number of records to show.
        #[arg(long, default_value = "10", value_name = "N")]
        limit: u32,
    },

    /// Look up a run's artifact by run id.
    RunStatus {
        run_id: String,

        #[arg(long, default_value = "bids")]
        kind: RecordKind,

        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Collect {
                kind,
                mode,
                pages,
                count,
                run_id,
                fail_rate,
                fast_retry,
                bids_file,
                output_dir,
                no_persist,
                json,
            } => {
                if let Some(dir) = output_dir {
                    cfg.output_dir = dir;
                }
                if no_persist {
                    cfg.persist = false;
                }
                let args = CollectArgs {
                    kind,
                    mode,
                    pages,
                    count,
                    run_id,
                    fail_rate,
                    fast_retry,
                    bids_file,
                    json,
                };
                run_collect(cfg, args).await?;
            }
            CliCommand::RetryQueue { kind, output_dir } => {
                let dir = output_dir.unwrap_or(cfg.output_dir);
                run_retry_queue(&dir, kind)?;
            }
            CliCommand::Quality { artifact, json } => run_quality(&artifact, &cfg.quality, json)?,
            CliCommand::Match { awards, bids } => run_match(&awards, &bids)?,
            CliCommand::Records { kind, limit } => run_records(kind, limit).await?,
            CliCommand::RunStatus {
                run_id,
                kind,
                output_dir,
            } => {
                let dir = output_dir.unwrap_or(cfg.output_dir);
                run_run_status(&dir, kind, &run_id)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
