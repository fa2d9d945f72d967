//! Billing-lifecycle status machines
//!
//! Four coupled status fields stored on appointments, claims, and payments.
//! Upstream status strings are mapped case-insensitively; unrecognized values
//! map to `None` so callers decide between "keep current" and "initial state"
//! instead of a poll silently resetting a record.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Appointment scheduling lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "CHECKED_IN")]
    CheckedIn,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "NO_SHOW")]
    NoShow,
}

impl AppointmentStatus {
    /// Map an upstream appointment status string. Returns `None` for values
    /// the machine does not know.
    pub fn from_upstream(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "confirmed" => Some(Self::Confirmed),
            "arrived" => Some(Self::CheckedIn),
            "complete" | "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "noshow" | "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }
}

/// Insurance eligibility decision for an appointment. Approval and rejection
/// are terminal: the check runs once and is never re-polled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl EligibilityStatus {
    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Claim adjudication lifecycle. PAID is terminal and sticky: a stale poll can
/// never move a paid claim anywhere else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    #[sea_orm(string_value = "NOT_SUBMITTED")]
    NotSubmitted,
    #[sea_orm(string_value = "SUBMITTED")]
    Submitted,
    #[sea_orm(string_value = "IN_REVIEW")]
    InReview,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

impl ClaimStatus {
    /// Map an upstream claim status string
    pub fn from_upstream(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "received" => Some(Self::Submitted),
            "inreview" | "in_review" => Some(Self::InReview),
            "accepted" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Apply a polled status, refusing to regress the terminal PAID state
    pub fn apply_poll(self, incoming: Self) -> Self {
        if self == Self::Paid {
            Self::Paid
        } else {
            incoming
        }
    }
}

/// Payment settlement state, derived from the fee total reported on an
/// approved claim.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PARTIALLY_PAID")]
    PartiallyPaid,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl PaymentStatus {
    /// Classify a reported fee total against the billed amount
    pub fn from_fee(fee: Decimal, amount_billed: Decimal) -> Self {
        if fee <= Decimal::ZERO {
            Self::Failed
        } else if fee >= amount_billed {
            Self::Paid
        } else {
            Self::PartiallyPaid
        }
    }
}
