//! Audit trail persisted to `ocpp_messages`

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, Set};

use crate::domain::audit::{AuditEntry, AuditLogger};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::ocpp_message;
use crate::infrastructure::database::repositories::db_err;

pub struct DatabaseAuditLogger {
    db: DatabaseConnection,
}

impl DatabaseAuditLogger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLogger for DatabaseAuditLogger {
    async fn record(&self, entry: AuditEntry) -> DomainResult<()> {
        ocpp_message::ActiveModel {
            id: NotSet,
            station_code: Set(entry.station_code),
            direction: Set(entry.direction.as_str().to_string()),
            message_type: Set(entry.message_type),
            action: Set(entry.action),
            message_id: Set(entry.message_id),
            payload: Set(entry.payload),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
