//! dentasync command-line entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use dentasync::config::AppConfig;
use dentasync::sync::scheduler::SyncJob;
use dentasync::Core;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dentasync", about = "Practice-management sync backend", version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, env = "DENTASYNC_CONFIG", default_value = "dentasync.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate the database and run every sync job on its cadence
    Run,
    /// Run pending database migrations and exit
    Migrate,
    /// Run a single job tick manually
    Sync {
        #[arg(value_enum)]
        job: SyncJob,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    let core = Core::new(config).await?;

    match cli.command {
        Command::Run => {
            core.migrate().await?;
            let handles = core.start();
            info!(jobs = handles.len(), "scheduler running; press ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
            info!("shutting down");
            for handle in handles {
                handle.abort();
            }
        }
        Command::Migrate => core.migrate().await?,
        Command::Sync { job } => match core.scheduler.tick(job).await? {
            Some(summary) => info!(
                job = summary.job,
                clinics = summary.clinics,
                records = summary.records,
                failures = summary.failures.len(),
                "manual sync run finished"
            ),
            None => info!(job = job.name(), "skipped; another worker holds the lock"),
        },
    }

    Ok(())
}
