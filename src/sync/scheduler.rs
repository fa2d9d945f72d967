//! Sync job table and timer loops
//!
//! Seven named jobs, each on its own fixed cadence. A tick tries the job's
//! advisory lock first: across every process sharing the database, at most
//! one runs a given job at a time, and a loser skips silently instead of
//! queueing. `tick` is callable directly, so tests and the CLI can drive a
//! single run without wall-clock waits.

use crate::infrastructure::lock::{DistributedLock, LockOutcome};
use crate::sync::engine::{SyncEngine, SyncResult, SyncSummary};
use std::sync::Arc;
use std::time::Duration;
use strum::{EnumIter, IntoEnumIterator};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

/// The named sync jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, clap::ValueEnum)]
pub enum SyncJob {
    UpcomingAppointments,
    TodaysAppointments,
    CompletedAppointments,
    Eligibility,
    Claims,
    Payments,
    Heartbeat,
}

impl SyncJob {
    pub fn all() -> impl Iterator<Item = SyncJob> {
        Self::iter()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UpcomingAppointments => "upcoming-appointments",
            Self::TodaysAppointments => "todays-appointments",
            Self::CompletedAppointments => "completed-appointments",
            Self::Eligibility => "eligibility",
            Self::Claims => "claims",
            Self::Payments => "payments",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Advisory lock name guarding this job cluster-wide
    pub fn lock_name(self) -> String {
        format!("sync:{}", self.name())
    }

    pub fn cadence(self) -> Duration {
        match self {
            Self::UpcomingAppointments => Duration::from_secs(15 * 60),
            Self::TodaysAppointments => Duration::from_secs(5 * 60),
            Self::CompletedAppointments => Duration::from_secs(10 * 60),
            Self::Eligibility => Duration::from_secs(30 * 60),
            Self::Claims => Duration::from_secs(60 * 60),
            Self::Payments => Duration::from_secs(60 * 60),
            Self::Heartbeat => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Payments run on the claims cadence shifted by a quarter hour so a
    /// fresh claim approval is usually picked up within the same hour
    pub fn start_delay(self) -> Duration {
        match self {
            Self::Payments => Duration::from_secs(15 * 60),
            _ => Duration::ZERO,
        }
    }
}

/// Drives every sync job on its cadence
#[derive(Clone)]
pub struct Scheduler {
    engine: Arc<SyncEngine>,
    lock: Arc<DistributedLock>,
}

impl Scheduler {
    pub fn new(engine: Arc<SyncEngine>, lock: Arc<DistributedLock>) -> Self {
        Self { engine, lock }
    }

    /// Spawn one timer loop per job
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        SyncJob::all()
            .map(|job| {
                let scheduler = self.clone();
                tokio::spawn(async move {
                    if !job.start_delay().is_zero() {
                        tokio::time::sleep(job.start_delay()).await;
                    }

                    let mut ticker = tokio::time::interval(job.cadence());
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    loop {
                        ticker.tick().await;
                        match scheduler.tick(job).await {
                            Ok(Some(summary)) => debug!(
                                job = job.name(),
                                records = summary.records,
                                "tick complete"
                            ),
                            Ok(None) => {}
                            Err(err) => {
                                error!(job = job.name(), error = %err, "sync tick failed")
                            }
                        }
                    }
                })
            })
            .collect()
    }

    /// One lock-guarded run. `None` means another process held the lock and
    /// this tick was a silent no-op.
    pub async fn tick(&self, job: SyncJob) -> SyncResult<Option<SyncSummary>> {
        let outcome = self
            .lock
            .with_lock(&job.lock_name(), || self.engine.run(job))
            .await?;

        match outcome {
            LockOutcome::Skipped => Ok(None),
            LockOutcome::Completed(result) => result.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn job_table_is_complete() {
        assert_eq!(SyncJob::all().count(), 7);
    }

    #[test]
    fn lock_names_are_unique() {
        let names: HashSet<String> = SyncJob::all().map(|job| job.lock_name()).collect();
        assert_eq!(names.len(), 7);
        for name in &names {
            assert!(name.starts_with("sync:"));
        }
    }

    #[test]
    fn cadences_match_the_schedule() {
        let minutes =
            |job: SyncJob| job.cadence().as_secs() / 60;
        assert_eq!(minutes(SyncJob::UpcomingAppointments), 15);
        assert_eq!(minutes(SyncJob::TodaysAppointments), 5);
        assert_eq!(minutes(SyncJob::CompletedAppointments), 10);
        assert_eq!(minutes(SyncJob::Eligibility), 30);
        assert_eq!(minutes(SyncJob::Claims), 60);
        assert_eq!(minutes(SyncJob::Payments), 60);
        assert_eq!(minutes(SyncJob::Heartbeat), 24 * 60);
    }

    #[test]
    fn only_payments_start_offset() {
        for job in SyncJob::all() {
            if job == SyncJob::Payments {
                assert_eq!(job.start_delay(), Duration::from_secs(15 * 60));
            } else {
                assert_eq!(job.start_delay(), Duration::ZERO);
            }
        }
    }
}
