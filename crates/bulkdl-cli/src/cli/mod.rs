//! CLI for inspecting the bulkdl job store.

mod commands;

use anyhow::Result;
use bulkdl_core::config;
use bulkdl_core::store::TaskDb;
use clap::{Parser, Subcommand};

use commands::{run_cancel, run_status, run_tasks};

/// Top-level CLI for the bulkdl retrieval engine.
#[derive(Debug, Parser)]
#[command(name = "bulkdl")]
#[command(about = "bulkdl: batch media retrieval job engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show every persisted job and its task progress.
    Status,

    /// List the persisted tasks of one job.
    Tasks {
        /// Job identifier.
        id: i64,
    },

    /// Remove a persisted job and all of its tasks.
    Cancel {
        /// Job identifier.
        id: i64,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = TaskDb::open_default().await?;

        match cli.command {
            CliCommand::Status => run_status(&db).await?,
            CliCommand::Tasks { id } => run_tasks(&db, id).await?,
            CliCommand::Cancel { id } => run_cancel(&db, id).await?,
        }

        Ok(())
    }
}
