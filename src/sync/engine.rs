//! Reconciliation engine
//!
//! One method per sync job. Every job enumerates all tenants and merges the
//! upstream snapshot into local state; a failing tenant is logged and counted
//! but never stops the remaining tenants. All resilience comes from cadence
//! and from the merges being idempotent; nothing here retries.

use crate::domain::{AppointmentStatus, ClaimStatus, EligibilityStatus, PaymentStatus};
use crate::infrastructure::database::entities::activity_log::{ActivityAction, ActorType};
use crate::infrastructure::database::entities::{claim, clinic};
use crate::infrastructure::lock::LockError;
use crate::infrastructure::upstream::{AppointmentWindow, UpstreamApi, UpstreamError};
use crate::infrastructure::workflows::{WorkflowClient, WorkflowJob};
use crate::services::{Services, StoreError};
use crate::sync::merge::{AppointmentPatch, PatientPatch};
use crate::sync::scheduler::SyncJob;
use chrono::Duration;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Sync failures
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Outcome of one job run, attached to the POLL activity entry
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub job: &'static str,
    /// Tenants visited
    pub clinics: usize,
    /// Records merged or advanced
    pub records: usize,
    pub failures: Vec<ClinicFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicFailure {
    pub clinic_id: Uuid,
    pub error: String,
}

impl SyncSummary {
    fn new(job: &'static str) -> Self {
        Self {
            job,
            clinics: 0,
            records: 0,
            failures: Vec::new(),
        }
    }

    fn push_failure(&mut self, clinic: &clinic::Model, err: &SyncError) {
        error!(
            job = self.job,
            clinic = %clinic.id,
            error = %err,
            "tenant sync step failed; continuing with next clinic"
        );
        self.failures.push(ClinicFailure {
            clinic_id: clinic.id,
            error: err.to_string(),
        });
    }
}

/// Merges upstream records into local entities and advances the four status
/// machines.
pub struct SyncEngine {
    services: Services,
    upstream: Arc<dyn UpstreamApi>,
    workflows: Arc<WorkflowClient>,
}

impl SyncEngine {
    pub fn new(
        services: Services,
        upstream: Arc<dyn UpstreamApi>,
        workflows: Arc<WorkflowClient>,
    ) -> Self {
        Self {
            services,
            upstream,
            workflows,
        }
    }

    /// Run one job across all tenants
    pub async fn run(&self, job: SyncJob) -> SyncResult<SyncSummary> {
        let summary = match job {
            SyncJob::UpcomingAppointments => {
                self.sync_appointments(job, AppointmentWindow::Upcoming).await?
            }
            SyncJob::TodaysAppointments => {
                self.sync_appointments(job, AppointmentWindow::Today).await?
            }
            SyncJob::CompletedAppointments => {
                self.sync_appointments(job, AppointmentWindow::Completed)
                    .await?
            }
            SyncJob::Eligibility => self.sync_eligibility(job).await?,
            SyncJob::Claims => self.sync_claims(job).await?,
            SyncJob::Payments => self.sync_payments(job).await?,
            SyncJob::Heartbeat => self.heartbeat(job).await?,
        };

        info!(
            job = summary.job,
            clinics = summary.clinics,
            records = summary.records,
            failures = summary.failures.len(),
            "sync run finished"
        );
        Ok(summary)
    }

    async fn sync_appointments(
        &self,
        job: SyncJob,
        window: AppointmentWindow,
    ) -> SyncResult<SyncSummary> {
        let clinics = self.services.clinics.list_all().await?;
        let mut summary = SyncSummary::new(job.name());

        for clinic in &clinics {
            summary.clinics += 1;
            match self.sync_appointments_for_clinic(clinic, window).await {
                Ok(count) => summary.records += count,
                Err(err) => summary.push_failure(clinic, &err),
            }
        }

        self.record_poll(&summary).await;
        Ok(summary)
    }

    async fn sync_appointments_for_clinic(
        &self,
        clinic: &clinic::Model,
        window: AppointmentWindow,
    ) -> SyncResult<usize> {
        let fetched = match window {
            AppointmentWindow::Upcoming => {
                self.upstream
                    .fetch_upcoming_appointments(&clinic.external_clinic_id)
                    .await?
            }
            AppointmentWindow::Today => {
                self.upstream
                    .fetch_todays_appointments(&clinic.external_clinic_id)
                    .await?
            }
            AppointmentWindow::Completed => {
                self.upstream
                    .fetch_completed_appointments(&clinic.external_clinic_id)
                    .await?
            }
        };

        let mut merged = 0;
        for upstream_apt in fetched {
            let patient = self
                .services
                .patients
                .upsert(clinic, &PatientPatch::stub(&upstream_apt.pat_num))
                .await?;

            // The completed window is already filtered upstream, so its
            // records land as COMPLETED regardless of the raw status string
            let status = match window {
                AppointmentWindow::Completed => Some(AppointmentStatus::Completed),
                _ => AppointmentStatus::from_upstream(&upstream_apt.status),
            };

            let patch = AppointmentPatch {
                external_apt_id: upstream_apt.apt_num.clone(),
                scheduled_start: upstream_apt.starts_at,
                scheduled_end: upstream_apt.starts_at
                    + Duration::minutes(upstream_apt.length_minutes),
                status,
                reason: None,
                notes: upstream_apt.note.clone(),
                operatory: None,
                provider_name: upstream_apt.provider.clone(),
            };

            self.services
                .appointments
                .upsert(clinic, &patient, &patch)
                .await?;
            merged += 1;
        }

        Ok(merged)
    }

    async fn sync_eligibility(&self, job: SyncJob) -> SyncResult<SyncSummary> {
        let clinics = self.services.clinics.list_all().await?;
        let mut summary = SyncSummary::new(job.name());

        for clinic in &clinics {
            summary.clinics += 1;
            match self.sync_eligibility_for_clinic(clinic).await {
                Ok(count) => summary.records += count,
                Err(err) => summary.push_failure(clinic, &err),
            }
        }

        self.record_poll(&summary).await;
        Ok(summary)
    }

    async fn sync_eligibility_for_clinic(&self, clinic: &clinic::Model) -> SyncResult<usize> {
        let pending = self
            .services
            .appointments
            .list_pending_eligibility(clinic.id)
            .await?;

        let mut decided = 0;
        for apt in pending {
            let eligibility = self
                .upstream
                .check_eligibility(&apt.external_apt_id)
                .await?;

            let status = if eligibility.eligible {
                EligibilityStatus::Approved
            } else {
                EligibilityStatus::Rejected
            };

            self.services
                .appointments
                .update_eligibility(apt.id, status, &eligibility)
                .await?;
            decided += 1;
        }

        Ok(decided)
    }

    async fn sync_claims(&self, job: SyncJob) -> SyncResult<SyncSummary> {
        let clinics = self.services.clinics.list_all().await?;
        let mut summary = SyncSummary::new(job.name());

        for clinic in &clinics {
            summary.clinics += 1;
            match self.sync_claims_for_clinic(clinic).await {
                Ok(count) => summary.records += count,
                Err(err) => summary.push_failure(clinic, &err),
            }
        }

        self.record_poll(&summary).await;
        Ok(summary)
    }

    async fn sync_claims_for_clinic(&self, clinic: &clinic::Model) -> SyncResult<usize> {
        let open = self.services.claims.list_open(clinic.id).await?;

        let mut advanced = 0;
        for current in open {
            let polled = self
                .upstream
                .fetch_claim_status(&current.external_claim_id)
                .await?;

            let incoming = ClaimStatus::from_upstream(&polled.status);
            let reason = matches!(incoming, Some(ClaimStatus::Rejected))
                .then(|| format!("upstream adjudication returned {}", polled.status));

            let (updated, changed) = self
                .services
                .claims
                .apply_poll(&current, incoming, reason)
                .await?;

            if changed {
                self.notify_claim_transition(&updated).await;
                advanced += 1;
            }
        }

        Ok(advanced)
    }

    async fn sync_payments(&self, job: SyncJob) -> SyncResult<SyncSummary> {
        let clinics = self.services.clinics.list_all().await?;
        let mut summary = SyncSummary::new(job.name());

        for clinic in &clinics {
            summary.clinics += 1;
            match self.sync_payments_for_clinic(clinic).await {
                Ok(count) => summary.records += count,
                Err(err) => summary.push_failure(clinic, &err),
            }
        }

        self.record_poll(&summary).await;
        Ok(summary)
    }

    async fn sync_payments_for_clinic(&self, clinic: &clinic::Model) -> SyncResult<usize> {
        let approved = self.services.claims.list_approved(clinic.id).await?;

        let mut settled = 0;
        for current in approved {
            let polled = self
                .upstream
                .fetch_claim_status(&current.external_claim_id)
                .await?;

            let Some(fee) = polled.total_fee else {
                continue;
            };

            let status = PaymentStatus::from_fee(fee, current.amount_billed);
            self.services
                .payments
                .upsert_for_claim(&current, fee, status)
                .await?;

            if status == PaymentStatus::Paid {
                // Two independent writes: a crash between them leaves the
                // claim APPROVED and the next payments tick repairs it.
                let (updated, changed) = self
                    .services
                    .claims
                    .apply_poll(&current, Some(ClaimStatus::Paid), None)
                    .await?;
                if changed {
                    self.notify_claim_transition(&updated).await;
                }
            }
            settled += 1;
        }

        Ok(settled)
    }

    async fn heartbeat(&self, job: SyncJob) -> SyncResult<SyncSummary> {
        let mut summary = SyncSummary::new(job.name());
        self.services
            .activity
            .record(
                ActorType::System,
                "scheduler",
                ActivityAction::System,
                Some(json!({ "message": "daily sync heartbeat" })),
            )
            .await?;
        summary.records = 1;
        Ok(summary)
    }

    async fn notify_claim_transition(&self, updated: &claim::Model) {
        self.workflows
            .enqueue(WorkflowJob {
                workflow: "claim-status-sync",
                task_queue: None,
                payload: json!({
                    "claimId": updated.id,
                    "externalClaimId": updated.external_claim_id,
                    "status": updated.status,
                }),
            })
            .await;
    }

    async fn record_poll(&self, summary: &SyncSummary) {
        let metadata = serde_json::to_value(summary).ok();
        if let Err(err) = self
            .services
            .activity
            .record(ActorType::System, "scheduler", ActivityAction::Poll, metadata)
            .await
        {
            warn!(job = summary.job, error = %err, "failed to write poll activity entry");
        }
    }
}
