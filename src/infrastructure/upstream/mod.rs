//! Typed gateway over the practice-management REST API
//!
//! Each operation maps one upstream endpoint to a local request/response
//! shape. Upstream 404s become caller-supplied empty values; every other
//! non-2xx status or network failure is an error. The gateway never retries;
//! failed polls are retried naturally at the next cadence tick.

use crate::config::UpstreamConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration as StdDuration;
use tracing::{debug, error};

pub mod types;

pub use types::{
    PatientSearch, UpstreamAppointment, UpstreamClaim, UpstreamClaimPayment, UpstreamEligibility,
    UpstreamError, UpstreamPatient, UpstreamResult,
};

/// The slice of the gateway the reconciliation engine drives. Kept narrow so
/// tests can substitute a canned implementation.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Appointments in the next seven days still marked scheduled
    async fn fetch_upcoming_appointments(
        &self,
        clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>>;

    /// All of today's appointments regardless of status
    async fn fetch_todays_appointments(
        &self,
        clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>>;

    /// Appointments completed in the last seven days
    async fn fetch_completed_appointments(
        &self,
        clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>>;

    /// One-shot eligibility check for an appointment; a missing record
    /// reads as not eligible
    async fn check_eligibility(&self, apt_num: &str) -> UpstreamResult<UpstreamEligibility>;

    /// Current adjudication state of a claim; a missing record reads as
    /// status "Unknown"
    async fn fetch_claim_status(&self, claim_num: &str) -> UpstreamResult<UpstreamClaim>;
}

/// Appointment listing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentWindow {
    Upcoming,
    Today,
    Completed,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// List appointments for a tenant within a window
    pub async fn list_appointments(
        &self,
        clinic_external_id: &str,
        window: AppointmentWindow,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        let (start, end, status) = window_bounds(window, Utc::now());
        let mut query = vec![
            ("ClinicNum", clinic_external_id.to_string()),
            ("StartDate", format_timestamp(start)),
            ("EndDate", format_timestamp(end)),
        ];
        if let Some(status) = status {
            query.push(("AptStatus", status.to_string()));
        }

        debug!(clinic = clinic_external_id, ?window, "fetching appointments");
        self.get_or("/appointments", &query, Vec::new()).await
    }

    /// Fetch one patient record; `None` when upstream has no such patient
    pub async fn get_patient(&self, pat_num: &str) -> UpstreamResult<Option<UpstreamPatient>> {
        self.get_or(
            "/patients/Simple",
            &[("PatNum", pat_num.to_string())],
            None,
        )
        .await
    }

    pub async fn search_patients(
        &self,
        filters: &PatientSearch,
    ) -> UpstreamResult<Vec<UpstreamPatient>> {
        let mut query = Vec::new();
        if let Some(last_name) = &filters.last_name {
            query.push(("LName", last_name.clone()));
        }
        if let Some(first_name) = &filters.first_name {
            query.push(("FName", first_name.clone()));
        }
        if let Some(birth_date) = &filters.birth_date {
            query.push(("Birthdate", birth_date.clone()));
        }
        self.get_or("/patients", &query, Vec::new()).await
    }

    pub async fn create_patient(
        &self,
        payload: &UpstreamPatient,
    ) -> UpstreamResult<UpstreamPatient> {
        self.post("/patients", payload).await
    }

    pub async fn update_patient(
        &self,
        pat_num: &str,
        payload: &UpstreamPatient,
    ) -> UpstreamResult<UpstreamPatient> {
        self.put(&format!("/patients/{pat_num}"), payload).await
    }

    pub async fn create_claim(&self, payload: &Value) -> UpstreamResult<UpstreamClaim> {
        self.post("/claims", payload).await
    }

    pub async fn update_claim(
        &self,
        claim_num: &str,
        payload: &Value,
    ) -> UpstreamResult<UpstreamClaim> {
        self.put(&format!("/claims/{claim_num}"), payload).await
    }

    pub async fn create_claim_payment(
        &self,
        payload: &UpstreamClaimPayment,
    ) -> UpstreamResult<UpstreamClaimPayment> {
        self.post("/claimpayments", payload).await
    }

    /// Tenant webhook/subscription lifecycle
    pub async fn list_subscriptions(&self) -> UpstreamResult<Vec<Value>> {
        self.get_or("/subscriptions", &[], Vec::new()).await
    }

    pub async fn create_subscription(&self, payload: &Value) -> UpstreamResult<Value> {
        self.post("/subscriptions", payload).await
    }

    pub async fn update_subscription(
        &self,
        subscription_num: &str,
        payload: &Value,
    ) -> UpstreamResult<Value> {
        self.put(&format!("/subscriptions/{subscription_num}"), payload)
            .await
    }

    pub async fn delete_subscription(&self, subscription_num: &str) -> UpstreamResult<()> {
        let endpoint = format!("/subscriptions/{subscription_num}");
        let resp = self
            .http
            .delete(self.url(&endpoint))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        error!(endpoint, %status, body, "upstream DELETE failed");
        Err(UpstreamError::Status {
            method: "DELETE",
            endpoint,
            status,
            body,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_or<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        fallback: T,
    ) -> UpstreamResult<T> {
        let resp = self
            .http
            .get(self.url(endpoint))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;
        self.read_json(resp, "GET", endpoint, Some(fallback)).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> UpstreamResult<T> {
        let resp = self
            .http
            .post(self.url(endpoint))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        self.read_json(resp, "POST", endpoint, None).await
    }

    async fn put<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> UpstreamResult<T> {
        let resp = self
            .http
            .put(self.url(endpoint))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        self.read_json(resp, "PUT", endpoint, None).await
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        resp: Response,
        method: &'static str,
        endpoint: &str,
        not_found: Option<T>,
    ) -> UpstreamResult<T> {
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            if let Some(fallback) = not_found {
                return Ok(fallback);
            }
        }

        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let body = resp.text().await.unwrap_or_default();
        error!(endpoint, %status, body, "upstream {} failed", method);
        Err(UpstreamError::Status {
            method,
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }
}

#[async_trait]
impl UpstreamApi for UpstreamClient {
    async fn fetch_upcoming_appointments(
        &self,
        clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        self.list_appointments(clinic_external_id, AppointmentWindow::Upcoming)
            .await
    }

    async fn fetch_todays_appointments(
        &self,
        clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        self.list_appointments(clinic_external_id, AppointmentWindow::Today)
            .await
    }

    async fn fetch_completed_appointments(
        &self,
        clinic_external_id: &str,
    ) -> UpstreamResult<Vec<UpstreamAppointment>> {
        self.list_appointments(clinic_external_id, AppointmentWindow::Completed)
            .await
    }

    async fn check_eligibility(&self, apt_num: &str) -> UpstreamResult<UpstreamEligibility> {
        let fallback = UpstreamEligibility {
            apt_num: apt_num.to_string(),
            eligible: false,
            reason: None,
            coverage_amount: None,
            patient_portion: None,
        };
        self.get_or(&format!("/eligibility/{apt_num}"), &[], fallback)
            .await
    }

    async fn fetch_claim_status(&self, claim_num: &str) -> UpstreamResult<UpstreamClaim> {
        let fallback = UpstreamClaim {
            claim_num: claim_num.to_string(),
            apt_num: String::new(),
            status: "Unknown".to_string(),
            total_fee: None,
        };
        self.get_or(&format!("/claims/{claim_num}"), &[], fallback)
            .await
    }
}

/// Compute the date bounds and status filter for an appointment window
fn window_bounds(
    window: AppointmentWindow,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>, Option<&'static str>) {
    match window {
        AppointmentWindow::Upcoming => (now, now + Duration::days(7), Some("Scheduled")),
        AppointmentWindow::Today => {
            let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
            let end = start + Duration::days(1) - Duration::seconds(1);
            (start, end, None)
        }
        AppointmentWindow::Completed => (now - Duration::days(7), now, Some("Complete")),
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
