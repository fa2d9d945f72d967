//! Patient store

use super::{StoreError, StoreResult};
use crate::infrastructure::database::entities::{clinic, patient};
use crate::infrastructure::database::Database;
use crate::sync::merge::{self, PatientPatch};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

pub struct PatientService {
    db: Arc<Database>,
}

impl PatientService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Idempotent merge keyed by the upstream patient id
    pub async fn upsert(
        &self,
        clinic: &clinic::Model,
        patch: &PatientPatch,
    ) -> StoreResult<patient::Model> {
        let existing = patient::Entity::find()
            .filter(patient::Column::ExternalId.eq(patch.external_id.as_str()))
            .one(self.db.conn())
            .await?;

        let merged = merge::merge_patient(existing.as_ref(), clinic.id, patch, Utc::now());
        let active = patient::ActiveModel {
            id: Set(merged.id),
            external_id: Set(merged.external_id),
            clinic_id: Set(merged.clinic_id),
            first_name: Set(merged.first_name),
            last_name: Set(merged.last_name),
            birth_date: Set(merged.birth_date),
            email: Set(merged.email),
            phone_number: Set(merged.phone_number),
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

    pub async fn find(&self, id: Uuid) -> StoreResult<patient::Model> {
        patient::Entity::find_by_id(id)
            .one(self.db.conn())
            .await?
            .ok_or(StoreError::PatientNotFound(id))
    }
}
