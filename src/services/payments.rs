//! Payment store

use super::StoreResult;
use crate::domain::PaymentStatus;
use crate::infrastructure::database::entities::{claim, payment};
use crate::infrastructure::database::Database;
use crate::sync::merge;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;

pub struct PaymentService {
    db: Arc<Database>,
}

impl PaymentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Idempotent merge keyed by the claim: a claim has at most one payment,
    /// so re-polling the same fee total re-writes the same record.
    pub async fn upsert_for_claim(
        &self,
        claim: &claim::Model,
        amount: Decimal,
        status: PaymentStatus,
    ) -> StoreResult<payment::Model> {
        let existing = payment::Entity::find()
            .filter(payment::Column::ClaimId.eq(claim.id))
            .one(self.db.conn())
            .await?;

        let merged = merge::merge_payment(
            existing.as_ref(),
            claim.clinic_id,
            claim.id,
            amount,
            status,
            Utc::now(),
        );
        let active = payment::ActiveModel {
            id: Set(merged.id),
            clinic_id: Set(merged.clinic_id),
            claim_id: Set(merged.claim_id),
            amount: Set(merged.amount),
            status: Set(merged.status),
            method: Set(merged.method),
            external_payment_id: Set(merged.external_payment_id),
            received_at: Set(merged.received_at),
            metadata: Set(merged.metadata),
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
}
