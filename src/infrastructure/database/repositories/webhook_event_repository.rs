//! SeaORM implementation of ProcessedEventRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::debug;

use crate::domain::webhook_event::{ProcessedEvent, ProcessedEventRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::webhook_event;

pub struct SeaOrmProcessedEventRepository {
    db: DatabaseConnection,
}

impl SeaOrmProcessedEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: webhook_event::Model) -> ProcessedEvent {
    ProcessedEvent {
        event_id: m.event_id,
        event_type: m.event_type,
        outcome: m.outcome,
        processed_at: m.processed_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── ProcessedEventRepository impl ───────────────────────────────

#[async_trait]
impl ProcessedEventRepository for SeaOrmProcessedEventRepository {
    async fn find(&self, event_id: &str) -> DomainResult<Option<ProcessedEvent>> {
        let model = webhook_event::Entity::find_by_id(event_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn record(&self, event: ProcessedEvent) -> DomainResult<()> {
        debug!(event_id = %event.event_id, event_type = %event.event_type, "Recording processed event");

        let model = webhook_event::ActiveModel {
            event_id: Set(event.event_id.clone()),
            event_type: Set(event.event_type.clone()),
            outcome: Set(event.outcome.clone()),
            processed_at: Set(event.processed_at),
        };

        match model.insert(&self.db).await {
            Ok(_) => Ok(()),
            // The primary key carries the dedup guarantee; a losing
            // racer surfaces as Conflict and is treated as a replay.
            Err(e) if e.to_string().contains("UNIQUE constraint") => Err(DomainError::Conflict(
                format!("event {} already processed", event.event_id),
            )),
            Err(e) => Err(db_err(e)),
        }
    }
}
