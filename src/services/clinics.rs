//! Clinic store

use super::{StoreError, StoreResult};
use crate::infrastructure::database::entities::clinic;
use crate::infrastructure::database::Database;
use sea_orm::{EntityTrait, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

pub struct ClinicService {
    db: Arc<Database>,
}

impl ClinicService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Every tenant, in stable order. The sync loops iterate this.
    pub async fn list_all(&self) -> StoreResult<Vec<clinic::Model>> {
        Ok(clinic::Entity::find()
            .order_by_asc(clinic::Column::Name)
            .all(self.db.conn())
            .await?)
    }

    pub async fn find(&self, id: Uuid) -> StoreResult<clinic::Model> {
        clinic::Entity::find_by_id(id)
            .one(self.db.conn())
            .await?
            .ok_or(StoreError::ClinicNotFound(id))
    }
}
