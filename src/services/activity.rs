//! Append-only activity log sink

use super::StoreResult;
use crate::infrastructure::database::entities::activity_log::{
    self, ActivityAction, ActorType,
};
use crate::infrastructure::database::Database;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct ActivityLogService {
    db: Arc<Database>,
}

impl ActivityLogService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        actor_type: ActorType,
        actor_id: &str,
        action: ActivityAction,
        metadata: Option<Value>,
    ) -> StoreResult<activity_log::Model> {
        let entry = activity_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            actor_type: Set(actor_type),
            actor_id: Set(actor_id.to_string()),
            action: Set(action),
            metadata: Set(metadata),
            ip_address: Set(None),
            created_at: Set(Utc::now()),
        };
        Ok(entry.insert(self.db.conn()).await?)
    }
}
