//! Dentasync core
//!
//! Mirrors clinical, billing, and scheduling state from an external
//! practice-management API into Postgres and drives the billing lifecycle
//! (appointment → eligibility → claim → payment) from periodic polls.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod sync;

use crate::config::AppConfig;
use crate::infrastructure::database::Database;
use crate::infrastructure::lock::DistributedLock;
use crate::infrastructure::upstream::{UpstreamApi, UpstreamClient};
use crate::infrastructure::workflows::WorkflowClient;
use crate::services::Services;
use crate::sync::engine::SyncEngine;
use crate::sync::scheduler::Scheduler;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// The main context for all sync operations
pub struct Core {
    /// Application configuration
    pub config: AppConfig,

    /// Shared database handle
    pub db: Arc<Database>,

    /// Reconciliation engine
    pub engine: Arc<SyncEngine>,

    /// Periodic job scheduler
    pub scheduler: Scheduler,
}

impl Core {
    /// Wire up all components from configuration
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = Arc::new(Database::connect(&config.database).await?);

        let upstream: Arc<dyn UpstreamApi> = Arc::new(UpstreamClient::new(&config.upstream)?);
        let workflows = Arc::new(WorkflowClient::new(&config.workflows));
        let services = Services::new(Arc::clone(&db));

        let engine = Arc::new(SyncEngine::new(services, upstream, workflows));
        let lock = Arc::new(DistributedLock::new(Arc::clone(&db)));
        let scheduler = Scheduler::new(Arc::clone(&engine), lock);

        Ok(Self {
            config,
            db,
            engine,
            scheduler,
        })
    }

    /// Run pending database migrations
    pub async fn migrate(&self) -> Result<()> {
        self.db.migrate().await?;
        Ok(())
    }

    /// Start every sync job on its cadence
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!("Starting sync scheduler");
        self.scheduler.spawn()
    }
}
