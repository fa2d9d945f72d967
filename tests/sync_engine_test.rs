//! Engine and scheduler flows over a mocked database and a canned gateway

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dentasync::config::WorkflowConfig;
use dentasync::domain::{AppointmentStatus, ClaimStatus, EligibilityStatus, PaymentStatus};
use dentasync::infrastructure::database::entities::{
    activity_log, appointment, claim, clinic, patient, payment,
};
use dentasync::infrastructure::database::Database;
use dentasync::infrastructure::lock::DistributedLock;
use dentasync::infrastructure::upstream::{
    UpstreamApi, UpstreamAppointment, UpstreamClaim, UpstreamEligibility, UpstreamError,
    UpstreamResult,
};
use dentasync::infrastructure::workflows::WorkflowClient;
use dentasync::services::Services;
use dentasync::sync::engine::SyncEngine;
use dentasync::sync::scheduler::{Scheduler, SyncJob};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Gateway double returning canned records; `fail_claims` simulates an
/// upstream outage for specific claim ids.
#[derive(Default)]
struct StubUpstream {
    appointments: Vec<UpstreamAppointment>,
    eligibility: HashMap<String, UpstreamEligibility>,
    claims: HashMap<String, UpstreamClaim>,
    fail_claims: HashSet<String>,
}

#[async_trait]
impl UpstreamApi for StubUpstream {
    async fn fetch_upcoming_appointments(
        &self,
        _clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        Ok(self.appointments.clone())
    }

    async fn fetch_todays_appointments(
        &self,
        _clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        Ok(self.appointments.clone())
    }

    async fn fetch_completed_appointments(
        &self,
        _clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        Ok(self.appointments.clone())
    }

    async fn check_eligibility(&self, apt_num: &str) -> UpstreamResult<UpstreamEligibility> {
        Ok(self.eligibility.get(apt_num).cloned().unwrap_or(
            UpstreamEligibility {
                apt_num: apt_num.to_string(),
                eligible: false,
                reason: None,
                coverage_amount: None,
                patient_portion: None,
            },
        ))
    }

    async fn fetch_claim_status(&self, claim_num: &str) -> UpstreamResult<UpstreamClaim> {
        if self.fail_claims.contains(claim_num) {
            return Err(UpstreamError::Status {
                method: "GET",
                endpoint: format!("/claims/{claim_num}"),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "upstream outage".to_string(),
            });
        }
        Ok(self.claims.get(claim_num).cloned().unwrap_or(UpstreamClaim {
            claim_num: claim_num.to_string(),
            apt_num: String::new(),
            status: "Unknown".to_string(),
            total_fee: None,
        }))
    }
}

fn clinic_model(name: &str, external_id: &str) -> clinic::Model {
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap();
    clinic::Model {
        id: Uuid::new_v4(),
        name: name.to_string(),
        external_clinic_id: external_id.to_string(),
        timezone: "America/New_York".to_string(),
        contact_email: None,
        contact_phone: None,
        api_key: None,
        created_at: now,
        updated_at: now,
    }
}

fn patient_model(clinic: &clinic::Model, external_id: &str) -> patient::Model {
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap();
    patient::Model {
        id: Uuid::new_v4(),
        external_id: external_id.to_string(),
        clinic_id: clinic.id,
        first_name: "Unknown".to_string(),
        last_name: "Patient".to_string(),
        birth_date: None,
        email: None,
        phone_number: None,
        created_at: now,
        updated_at: now,
    }
}

fn appointment_model(
    clinic: &clinic::Model,
    patient_id: Uuid,
    external_apt_id: &str,
    eligibility: EligibilityStatus,
) -> appointment::Model {
    let start = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
    appointment::Model {
        id: Uuid::new_v4(),
        external_apt_id: external_apt_id.to_string(),
        clinic_id: clinic.id,
        patient_id,
        scheduled_start: start,
        scheduled_end: start + chrono::Duration::minutes(30),
        status: AppointmentStatus::Scheduled,
        reason: None,
        notes: None,
        operatory: None,
        provider_name: None,
        eligibility_status: eligibility,
        eligibility_details: None,
        insurance_coverage_amount: None,
        patient_responsibility_amount: None,
        discount_amount: None,
        created_at: start,
        updated_at: start,
    }
}

fn claim_model(
    clinic: &clinic::Model,
    external_claim_id: &str,
    status: ClaimStatus,
) -> claim::Model {
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap();
    claim::Model {
        id: Uuid::new_v4(),
        external_claim_id: external_claim_id.to_string(),
        clinic_id: clinic.id,
        patient_id: Uuid::new_v4(),
        appointment_id: Uuid::new_v4(),
        status,
        amount_billed: dec!(120.00),
        amount_approved: None,
        rejection_reason: None,
        notes: None,
        metadata: None,
        last_polled_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn payment_model(claim: &claim::Model, status: PaymentStatus) -> payment::Model {
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap();
    payment::Model {
        id: Uuid::new_v4(),
        clinic_id: claim.clinic_id,
        claim_id: claim.id,
        amount: dec!(120.00),
        status,
        method: None,
        external_payment_id: None,
        received_at: Some(now),
        metadata: None,
        created_at: now,
        updated_at: now,
    }
}

fn activity_model() -> activity_log::Model {
    activity_log::Model {
        id: Uuid::new_v4(),
        actor_type: activity_log::ActorType::System,
        actor_id: "scheduler".to_string(),
        action: activity_log::ActivityAction::Poll,
        metadata: None,
        ip_address: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap(),
    }
}

fn workflow_client() -> Arc<WorkflowClient> {
    // Nothing listens here; enqueue failures must be swallowed by design
    Arc::new(WorkflowClient::new(&WorkflowConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        namespace: "default".to_string(),
        task_queue: "billing-sync".to_string(),
    }))
}

fn engine_on(conn: DatabaseConnection, upstream: StubUpstream) -> SyncEngine {
    let db = Arc::new(Database::from_connection(conn));
    SyncEngine::new(Services::new(db), Arc::new(upstream), workflow_client())
}

fn acquired_row(acquired: bool) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("acquired", Value::Bool(Some(acquired)))])
}

#[tokio::test]
async fn payment_sync_settles_an_approved_claim() {
    let clinic = clinic_model("Main Street Dental", "7");
    let approved = claim_model(&clinic, "C-100", ClaimStatus::Approved);
    let mut paid = approved.clone();
    paid.status = ClaimStatus::Paid;

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![clinic.clone()]])
        .append_query_results([vec![approved.clone()]])
        .append_query_results([Vec::<payment::Model>::new()])
        .append_query_results([vec![payment_model(&approved, PaymentStatus::Paid)]])
        .append_query_results([vec![paid]])
        .append_query_results([vec![activity_model()]])
        .into_connection();

    let mut upstream = StubUpstream::default();
    upstream.claims.insert(
        "C-100".to_string(),
        UpstreamClaim {
            claim_num: "C-100".to_string(),
            apt_num: "67890".to_string(),
            status: "Accepted".to_string(),
            total_fee: Some(dec!(120.00)),
        },
    );

    let engine = engine_on(conn, upstream);
    let summary = engine.run(SyncJob::Payments).await.unwrap();

    assert_eq!(summary.clinics, 1);
    assert_eq!(summary.records, 1);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn unknown_claim_status_only_bumps_the_watermark() {
    let clinic = clinic_model("Main Street Dental", "7");
    let submitted = claim_model(&clinic, "C-200", ClaimStatus::Submitted);

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![clinic.clone()]])
        .append_query_results([vec![submitted.clone()]])
        .append_query_results([vec![submitted]])
        .append_query_results([vec![activity_model()]])
        .into_connection();

    // Stub has no entry for C-200, so the poll reads as status "Unknown"
    let engine = engine_on(conn, StubUpstream::default());
    let summary = engine.run(SyncJob::Claims).await.unwrap();

    assert_eq!(summary.clinics, 1);
    assert_eq!(summary.records, 0, "no transition means no advanced record");
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn one_failing_tenant_does_not_stop_the_others() {
    let clinic_a = clinic_model("Alpha Dental", "1");
    let clinic_b = clinic_model("Beta Dental", "2");
    let claim_a = claim_model(&clinic_a, "C-A", ClaimStatus::Submitted);
    let claim_b = claim_model(&clinic_b, "C-B", ClaimStatus::Submitted);
    let mut claim_a_approved = claim_a.clone();
    claim_a_approved.status = ClaimStatus::Approved;

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![clinic_a.clone(), clinic_b.clone()]])
        .append_query_results([vec![claim_a]])
        .append_query_results([vec![claim_a_approved]])
        .append_query_results([vec![claim_b]])
        .append_query_results([vec![activity_model()]])
        .into_connection();

    let mut upstream = StubUpstream::default();
    upstream.claims.insert(
        "C-A".to_string(),
        UpstreamClaim {
            claim_num: "C-A".to_string(),
            apt_num: String::new(),
            status: "Accepted".to_string(),
            total_fee: None,
        },
    );
    upstream.fail_claims.insert("C-B".to_string());

    let engine = engine_on(conn, upstream);
    let summary = engine.run(SyncJob::Claims).await.unwrap();

    assert_eq!(summary.clinics, 2);
    assert_eq!(summary.records, 1, "the healthy tenant's update sticks");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].clinic_id, clinic_b.id);
}

#[tokio::test]
async fn appointment_sync_creates_patient_then_appointment() {
    let clinic = clinic_model("Main Street Dental", "7");
    let patient = patient_model(&clinic, "12345");
    let appointment =
        appointment_model(&clinic, patient.id, "67890", EligibilityStatus::Pending);

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![clinic.clone()]])
        .append_query_results([Vec::<patient::Model>::new()])
        .append_query_results([vec![patient]])
        .append_query_results([Vec::<appointment::Model>::new()])
        .append_query_results([vec![appointment]])
        .append_query_results([vec![activity_model()]])
        .into_connection();

    let mut upstream = StubUpstream::default();
    upstream.appointments.push(UpstreamAppointment {
        apt_num: "67890".to_string(),
        pat_num: "12345".to_string(),
        clinic_num: Some("7".to_string()),
        status: "Scheduled".to_string(),
        starts_at: Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
        length_minutes: 30,
        provider: None,
        note: None,
    });

    let engine = engine_on(conn, upstream);
    let summary = engine.run(SyncJob::TodaysAppointments).await.unwrap();

    assert_eq!(summary.clinics, 1);
    assert_eq!(summary.records, 1);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn eligibility_sync_settles_pending_appointments() {
    let clinic = clinic_model("Main Street Dental", "7");
    let pending = appointment_model(&clinic, Uuid::new_v4(), "67890", EligibilityStatus::Pending);
    let mut approved = pending.clone();
    approved.eligibility_status = EligibilityStatus::Approved;
    approved.insurance_coverage_amount = Some(dec!(80.00));
    approved.patient_responsibility_amount = Some(dec!(40.00));

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![clinic.clone()]])
        .append_query_results([vec![pending.clone()]])
        .append_query_results([vec![pending]])
        .append_query_results([vec![approved]])
        .append_query_results([vec![activity_model()]])
        .into_connection();

    let mut upstream = StubUpstream::default();
    upstream.eligibility.insert(
        "67890".to_string(),
        UpstreamEligibility {
            apt_num: "67890".to_string(),
            eligible: true,
            reason: None,
            coverage_amount: Some(dec!(80.00)),
            patient_portion: Some(dec!(40.00)),
        },
    );

    let engine = engine_on(conn, upstream);
    let summary = engine.run(SyncJob::Eligibility).await.unwrap();

    assert_eq!(summary.records, 1);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn decided_eligibility_is_never_rewritten() {
    let clinic = clinic_model("Main Street Dental", "7");
    let mut decided = appointment_model(&clinic, Uuid::new_v4(), "67890", EligibilityStatus::Approved);
    decided.insurance_coverage_amount = Some(dec!(80.00));

    // Only the lookup is stubbed: if the service tried to write, the mock
    // would run out of results and the call would fail.
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![decided.clone()]])
        .into_connection();

    let db = Arc::new(Database::from_connection(conn));
    let services = Services::new(db);

    let rejection = UpstreamEligibility {
        apt_num: "67890".to_string(),
        eligible: false,
        reason: Some("late upstream flip".to_string()),
        coverage_amount: None,
        patient_portion: None,
    };
    let result = services
        .appointments
        .update_eligibility(decided.id, EligibilityStatus::Rejected, &rejection)
        .await
        .unwrap();

    assert_eq!(result.eligibility_status, EligibilityStatus::Approved);
    assert_eq!(result.insurance_coverage_amount, Some(dec!(80.00)));
    assert_eq!(result.eligibility_details, None);
}

#[tokio::test]
async fn a_held_lock_makes_the_tick_a_silent_no_op() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![acquired_row(false)]])
        .into_connection();

    let db = Arc::new(Database::from_connection(conn));
    let engine = Arc::new(SyncEngine::new(
        Services::new(Arc::clone(&db)),
        Arc::new(StubUpstream::default()),
        workflow_client(),
    ));
    let scheduler = Scheduler::new(engine, Arc::new(DistributedLock::new(db)));

    let outcome = scheduler.tick(SyncJob::Claims).await.unwrap();
    assert!(outcome.is_none(), "losing the lock must skip without running");
}

#[tokio::test]
async fn an_acquired_lock_runs_the_job_and_releases() {
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![acquired_row(true)]])
        .append_query_results([vec![activity_model()]])
        .into_connection();

    let db = Arc::new(Database::from_connection(conn));
    let engine = Arc::new(SyncEngine::new(
        Services::new(Arc::clone(&db)),
        Arc::new(StubUpstream::default()),
        workflow_client(),
    ));
    let scheduler = Scheduler::new(engine, Arc::new(DistributedLock::new(db)));

    let summary = scheduler
        .tick(SyncJob::Heartbeat)
        .await
        .unwrap()
        .expect("lock was free, the job must run");
    assert_eq!(summary.job, "heartbeat");
    assert_eq!(summary.records, 1);
}
