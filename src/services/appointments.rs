//! Appointment store

use super::{StoreError, StoreResult};
use crate::domain::EligibilityStatus;
use crate::infrastructure::database::entities::{appointment, clinic, patient};
use crate::infrastructure::database::Database;
use crate::infrastructure::upstream::UpstreamEligibility;
use crate::sync::merge::{self, AppointmentPatch};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

pub struct AppointmentService {
    db: Arc<Database>,
}

impl AppointmentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Idempotent merge keyed by the upstream appointment id
    pub async fn upsert(
        &self,
        clinic: &clinic::Model,
        patient: &patient::Model,
        patch: &AppointmentPatch,
    ) -> StoreResult<appointment::Model> {
        let existing = appointment::Entity::find()
            .filter(appointment::Column::ExternalAptId.eq(patch.external_apt_id.as_str()))
            .one(self.db.conn())
            .await?;

        let merged = merge::merge_appointment(
            existing.as_ref(),
            clinic.id,
            patient.id,
            patch,
            Utc::now(),
        );
        let active = appointment::ActiveModel {
            id: Set(merged.id),
            external_apt_id: Set(merged.external_apt_id),
            clinic_id: Set(merged.clinic_id),
            patient_id: Set(merged.patient_id),
            scheduled_start: Set(merged.scheduled_start),
            scheduled_end: Set(merged.scheduled_end),
            status: Set(merged.status),
            reason: Set(merged.reason),
            notes: Set(merged.notes),
            operatory: Set(merged.operatory),
            provider_name: Set(merged.provider_name),
            eligibility_status: Set(merged.eligibility_status),
            eligibility_details: Set(merged.eligibility_details),
            insurance_coverage_amount: Set(merged.insurance_coverage_amount),
            patient_responsibility_amount: Set(merged.patient_responsibility_amount),
            discount_amount: Set(merged.discount_amount),
            created_at: Set(merged.created_at),
            updated_at: Set(merged.updated_at),
        };

        let saved = if existing.is_some() {
            active.update(self.db.conn()).await?
        } else {
            active.insert(self.db.conn()).await?
        };
        Ok(saved)
    }

    /// Appointments whose eligibility check has not run yet
    pub async fn list_pending_eligibility(
        &self,
        clinic_id: Uuid,
    ) -> StoreResult<Vec<appointment::Model>> {
        Ok(appointment::Entity::find()
            .filter(appointment::Column::ClinicId.eq(clinic_id))
            .filter(appointment::Column::EligibilityStatus.eq(EligibilityStatus::Pending))
            .all(self.db.conn())
            .await?)
    }

    /// Settle the eligibility one-shot. A decided appointment is returned
    /// unchanged no matter what the new result says.
    pub async fn update_eligibility(
        &self,
        id: Uuid,
        status: EligibilityStatus,
        details: &UpstreamEligibility,
    ) -> StoreResult<appointment::Model> {
        let current = appointment::Entity::find_by_id(id)
            .one(self.db.conn())
            .await?
            .ok_or(StoreError::AppointmentNotFound(id))?;

        if current.eligibility_status.is_decided() {
            return Ok(current);
        }

        let mut active: appointment::ActiveModel = current.into();
        active.eligibility_status = Set(status);
        active.eligibility_details = Set(Some(serde_json::to_value(details)?));
        if status == EligibilityStatus::Approved {
            active.insurance_coverage_amount = Set(details.coverage_amount);
            active.patient_responsibility_amount = Set(details.patient_portion);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(self.db.conn()).await?)
    }

    pub async fn find(&self, id: Uuid) -> StoreResult<appointment::Model> {
        appointment::Entity::find_by_id(id)
            .one(self.db.conn())
            .await?
            .ok_or(StoreError::AppointmentNotFound(id))
    }
}
