//! Claim store

use super::{StoreError, StoreResult};
use crate::domain::ClaimStatus;
use crate::infrastructure::database::entities::claim;
use crate::infrastructure::database::Database;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

pub struct ClaimService {
    db: Arc<Database>,
}

impl ClaimService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Claims still worth polling: everything except the terminal PAID state
    pub async fn list_open(&self, clinic_id: Uuid) -> StoreResult<Vec<claim::Model>> {
        Ok(claim::Entity::find()
            .filter(claim::Column::ClinicId.eq(clinic_id))
            .filter(claim::Column::Status.ne(ClaimStatus::Paid))
            .all(self.db.conn())
            .await?)
    }

    /// Claims eligible for payment creation
    pub async fn list_approved(&self, clinic_id: Uuid) -> StoreResult<Vec<claim::Model>> {
        Ok(claim::Entity::find()
            .filter(claim::Column::ClinicId.eq(clinic_id))
            .filter(claim::Column::Status.eq(ClaimStatus::Approved))
            .all(self.db.conn())
            .await?)
    }

    /// Record one status poll: bump the freshness watermark and, when the
    /// polled status actually advances the machine, write the transition.
    /// Returns the stored claim and whether the status changed.
    pub async fn apply_poll(
        &self,
        claim: &claim::Model,
        incoming: Option<ClaimStatus>,
        rejection_reason: Option<String>,
    ) -> StoreResult<(claim::Model, bool)> {
        let next = match incoming {
            Some(status) => claim.status.apply_poll(status),
            None => claim.status,
        };
        let changed = next != claim.status;

        let mut active: claim::ActiveModel = claim.clone().into();
        active.last_polled_at = Set(Some(Utc::now()));
        if changed {
            active.status = Set(next);
            if next == ClaimStatus::Rejected {
                active.rejection_reason =
                    Set(rejection_reason.or_else(|| claim.rejection_reason.clone()));
            }
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.db.conn()).await?;
        Ok((updated, changed))
    }

    pub async fn find(&self, id: Uuid) -> StoreResult<claim::Model> {
        claim::Entity::find_by_id(id)
            .one(self.db.conn())
            .await?
            .ok_or(StoreError::ClaimNotFound(id))
    }
}
