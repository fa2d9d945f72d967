//! Merge-by-external-id
//!
//! One explicit merge function per mirrored entity, taking the current local
//! record (if any) and the freshly fetched upstream fields. The precedence
//! rule is uniform: a field present upstream overwrites, a field the upstream
//! snapshot omits keeps its previous local value. Applying the same input
//! twice yields the same record, which is what makes every poll safe to
//! repeat.

use crate::domain::{AppointmentStatus, EligibilityStatus, PaymentStatus};
use crate::infrastructure::database::entities::{appointment, patient, payment};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Patient fields carried by an upstream snapshot. The appointment feed only
/// knows the upstream patient id, so everything else is optional.
#[derive(Debug, Clone, Default)]
pub struct PatientPatch {
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl PatientPatch {
    /// A patch carrying nothing but the upstream id; names fall back to
    /// placeholders only when the patient does not exist yet.
    pub fn stub(external_id: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            ..Self::default()
        }
    }
}

pub fn merge_patient(
    existing: Option<&patient::Model>,
    clinic_id: Uuid,
    patch: &PatientPatch,
    now: DateTime<Utc>,
) -> patient::Model {
    match existing {
        Some(current) => patient::Model {
            id: current.id,
            external_id: current.external_id.clone(),
            clinic_id,
            first_name: patch
                .first_name
                .clone()
                .unwrap_or_else(|| current.first_name.clone()),
            last_name: patch
                .last_name
                .clone()
                .unwrap_or_else(|| current.last_name.clone()),
            birth_date: patch.birth_date.or(current.birth_date),
            email: patch.email.clone().or_else(|| current.email.clone()),
            phone_number: patch
                .phone_number
                .clone()
                .or_else(|| current.phone_number.clone()),
            created_at: current.created_at,
            updated_at: now,
        },
        None => patient::Model {
            id: Uuid::new_v4(),
            external_id: patch.external_id.clone(),
            clinic_id,
            first_name: patch
                .first_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            last_name: patch
                .last_name
                .clone()
                .unwrap_or_else(|| "Patient".to_string()),
            birth_date: patch.birth_date,
            email: patch.email.clone(),
            phone_number: patch.phone_number.clone(),
            created_at: now,
            updated_at: now,
        },
    }
}

/// Appointment fields derived from one upstream record
#[derive(Debug, Clone)]
pub struct AppointmentPatch {
    pub external_apt_id: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    /// `None` when the upstream status string was unrecognized: an existing
    /// appointment keeps its current status, a new one starts SCHEDULED
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub operatory: Option<String>,
    pub provider_name: Option<String>,
}

pub fn merge_appointment(
    existing: Option<&appointment::Model>,
    clinic_id: Uuid,
    patient_id: Uuid,
    patch: &AppointmentPatch,
    now: DateTime<Utc>,
) -> appointment::Model {
    match existing {
        Some(current) => appointment::Model {
            id: current.id,
            external_apt_id: current.external_apt_id.clone(),
            clinic_id,
            patient_id,
            scheduled_start: patch.scheduled_start,
            scheduled_end: patch.scheduled_end,
            status: patch.status.unwrap_or(current.status),
            reason: patch.reason.clone().or_else(|| current.reason.clone()),
            notes: patch.notes.clone().or_else(|| current.notes.clone()),
            operatory: patch
                .operatory
                .clone()
                .or_else(|| current.operatory.clone()),
            provider_name: patch
                .provider_name
                .clone()
                .or_else(|| current.provider_name.clone()),
            // The eligibility one-shot and the derived amounts are advanced
            // by their own sync steps, never by the appointment feed
            eligibility_status: current.eligibility_status,
            eligibility_details: current.eligibility_details.clone(),
            insurance_coverage_amount: current.insurance_coverage_amount,
            patient_responsibility_amount: current.patient_responsibility_amount,
            discount_amount: current.discount_amount,
            created_at: current.created_at,
            updated_at: now,
        },
        None => appointment::Model {
            id: Uuid::new_v4(),
            external_apt_id: patch.external_apt_id.clone(),
            clinic_id,
            patient_id,
            scheduled_start: patch.scheduled_start,
            scheduled_end: patch.scheduled_end,
            status: patch.status.unwrap_or(AppointmentStatus::Scheduled),
            reason: patch.reason.clone(),
            notes: patch.notes.clone(),
            operatory: patch.operatory.clone(),
            provider_name: patch.provider_name.clone(),
            eligibility_status: EligibilityStatus::Pending,
            eligibility_details: None,
            insurance_coverage_amount: None,
            patient_responsibility_amount: None,
            discount_amount: None,
            created_at: now,
            updated_at: now,
        },
    }
}

pub fn merge_payment(
    existing: Option<&payment::Model>,
    clinic_id: Uuid,
    claim_id: Uuid,
    amount: Decimal,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> payment::Model {
    let received_at = match existing.and_then(|p| p.received_at) {
        Some(ts) => Some(ts),
        None if status == PaymentStatus::Paid => Some(now),
        None => None,
    };

    match existing {
        Some(current) => payment::Model {
            id: current.id,
            clinic_id,
            claim_id,
            amount,
            status,
            method: current.method.clone(),
            external_payment_id: current.external_payment_id.clone(),
            received_at,
            metadata: current.metadata.clone(),
            created_at: current.created_at,
            updated_at: now,
        },
        None => payment::Model {
            id: Uuid::new_v4(),
            clinic_id,
            claim_id,
            amount,
            status,
            method: None,
            external_payment_id: None,
            received_at,
            metadata: None,
            created_at: now,
            updated_at: now,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn scheduled_patch() -> AppointmentPatch {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        AppointmentPatch {
            external_apt_id: "67890".to_string(),
            scheduled_start: start,
            scheduled_end: start + chrono::Duration::minutes(30),
            status: AppointmentStatus::from_upstream("Scheduled"),
            reason: None,
            notes: None,
            operatory: None,
            provider_name: None,
        }
    }

    #[test]
    fn first_sighting_creates_a_scheduled_appointment() {
        let clinic_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let now = fixed_now();

        let created = merge_appointment(None, clinic_id, patient_id, &scheduled_patch(), now);

        assert_eq!(created.external_apt_id, "67890");
        assert_eq!(created.status, AppointmentStatus::Scheduled);
        assert_eq!(created.eligibility_status, EligibilityStatus::Pending);
        assert_eq!(
            created.scheduled_end - created.scheduled_start,
            chrono::Duration::minutes(30)
        );
    }

    #[test]
    fn reapplying_the_same_snapshot_is_a_no_op() {
        let clinic_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let now = fixed_now();
        let patch = scheduled_patch();

        let first = merge_appointment(None, clinic_id, patient_id, &patch, now);
        let second = merge_appointment(Some(&first), clinic_id, patient_id, &patch, now);

        assert_eq!(first, second);
    }

    #[test]
    fn status_update_mutates_the_same_record() {
        let clinic_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let now = fixed_now();

        let created = merge_appointment(None, clinic_id, patient_id, &scheduled_patch(), now);

        let mut completed_patch = scheduled_patch();
        completed_patch.status = AppointmentStatus::from_upstream("Complete");
        let updated =
            merge_appointment(Some(&created), clinic_id, patient_id, &completed_patch, now);

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.status, AppointmentStatus::Completed);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn unrecognized_status_keeps_the_current_one() {
        let clinic_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let now = fixed_now();

        let mut completed = merge_appointment(None, clinic_id, patient_id, &scheduled_patch(), now);
        completed.status = AppointmentStatus::Completed;

        let mut unknown_patch = scheduled_patch();
        unknown_patch.status = AppointmentStatus::from_upstream("SomethingNew");
        assert_eq!(unknown_patch.status, None);

        let merged =
            merge_appointment(Some(&completed), clinic_id, patient_id, &unknown_patch, now);
        assert_eq!(merged.status, AppointmentStatus::Completed);
    }

    #[test]
    fn appointment_feed_never_touches_eligibility() {
        let clinic_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let now = fixed_now();

        let mut approved = merge_appointment(None, clinic_id, patient_id, &scheduled_patch(), now);
        approved.eligibility_status = EligibilityStatus::Approved;
        approved.insurance_coverage_amount = Some(dec!(80.00));

        let merged =
            merge_appointment(Some(&approved), clinic_id, patient_id, &scheduled_patch(), now);
        assert_eq!(merged.eligibility_status, EligibilityStatus::Approved);
        assert_eq!(merged.insurance_coverage_amount, Some(dec!(80.00)));
    }

    #[test]
    fn patient_placeholders_apply_only_on_create() {
        let clinic_id = Uuid::new_v4();
        let now = fixed_now();

        let created = merge_patient(None, clinic_id, &PatientPatch::stub("12345"), now);
        assert_eq!(created.external_id, "12345");
        assert_eq!(created.first_name, "Unknown");
        assert_eq!(created.last_name, "Patient");

        let mut named = created.clone();
        named.first_name = "Ada".to_string();
        named.last_name = "Lovelace".to_string();

        let merged = merge_patient(Some(&named), clinic_id, &PatientPatch::stub("12345"), now);
        assert_eq!(merged.first_name, "Ada");
        assert_eq!(merged.last_name, "Lovelace");
    }

    #[test]
    fn patient_merge_is_idempotent() {
        let clinic_id = Uuid::new_v4();
        let now = fixed_now();
        let patch = PatientPatch {
            external_id: "12345".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 2),
            email: Some("ada@example.com".to_string()),
            phone_number: None,
        };

        let first = merge_patient(None, clinic_id, &patch, now);
        let second = merge_patient(Some(&first), clinic_id, &patch, now);
        assert_eq!(first, second);
    }

    #[test]
    fn payment_merge_is_idempotent_and_stamps_received_at_once() {
        let clinic_id = Uuid::new_v4();
        let claim_id = Uuid::new_v4();
        let now = fixed_now();

        let first = merge_payment(
            None,
            clinic_id,
            claim_id,
            dec!(120.00),
            PaymentStatus::Paid,
            now,
        );
        assert_eq!(first.received_at, Some(now));

        let later = now + chrono::Duration::hours(1);
        let second = merge_payment(
            Some(&first),
            clinic_id,
            claim_id,
            dec!(120.00),
            PaymentStatus::Paid,
            later,
        );
        assert_eq!(second.id, first.id);
        assert_eq!(second.received_at, Some(now));
        assert_eq!(second.amount, dec!(120.00));
    }
}
