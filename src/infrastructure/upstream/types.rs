//! Wire types for the practice-management API
//!
//! Field names follow the upstream JSON contract; identifiers are opaque
//! strings issued by the upstream system.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamAppointment {
    #[serde(rename = "AptNum")]
    pub apt_num: String,

    #[serde(rename = "PatNum")]
    pub pat_num: String,

    #[serde(rename = "ClinicNum", default)]
    pub clinic_num: Option<String>,

    #[serde(rename = "AptStatus")]
    pub status: String,

    #[serde(rename = "AptDateTime")]
    pub starts_at: chrono::DateTime<chrono::Utc>,

    /// Duration in minutes
    #[serde(rename = "AptLength")]
    pub length_minutes: i64,

    #[serde(rename = "ProviderNum", default)]
    pub provider: Option<String>,

    #[serde(rename = "Note", default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamPatient {
    #[serde(rename = "PatNum")]
    pub pat_num: String,

    #[serde(rename = "LName", default)]
    pub last_name: Option<String>,

    #[serde(rename = "FName", default)]
    pub first_name: Option<String>,

    /// `YYYY-MM-DD`
    #[serde(rename = "Birthdate", default)]
    pub birth_date: Option<String>,

    #[serde(rename = "ClinicNum", default)]
    pub clinic_num: Option<String>,

    #[serde(rename = "Email", default)]
    pub email: Option<String>,

    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamEligibility {
    #[serde(rename = "AptNum")]
    pub apt_num: String,

    #[serde(rename = "Eligible")]
    pub eligible: bool,

    #[serde(rename = "Reason", default)]
    pub reason: Option<String>,

    #[serde(rename = "CoverageAmount", default)]
    pub coverage_amount: Option<Decimal>,

    #[serde(rename = "PatientPortion", default)]
    pub patient_portion: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamClaim {
    #[serde(rename = "ClaimNum")]
    pub claim_num: String,

    #[serde(rename = "AptNum", default)]
    pub apt_num: String,

    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "TotalFee", default)]
    pub total_fee: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamClaimPayment {
    #[serde(rename = "ClaimPaymentNum", default)]
    pub claim_payment_num: Option<String>,

    #[serde(rename = "Amount", default)]
    pub amount: Option<Decimal>,

    #[serde(rename = "PatNum", default)]
    pub pat_num: Option<String>,

    #[serde(rename = "ClinicNum", default)]
    pub clinic_num: Option<String>,
}

/// Patient search filters; unset fields are omitted from the query
#[derive(Debug, Clone, Default)]
pub struct PatientSearch {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub birth_date: Option<String>,
}

/// Upstream call failures. A 404 never reaches this type: the gateway
/// normalizes it into the caller's empty value.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Non-2xx response, carrying the upstream status and body for logging
    #[error("upstream {method} {endpoint} returned {status}: {body}")]
    Status {
        method: &'static str,
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    /// Network-level failure, including timeouts
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;
