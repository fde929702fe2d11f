use async_trait::async_trait;

use super::model::ProcessedEvent;
use crate::shared::DomainResult;

/// Persistence port for the processed-event ledger.
#[async_trait]
pub trait ProcessedEventRepository: Send + Sync {
    async fn find(&self, event_id: &str) -> DomainResult<Option<ProcessedEvent>>;

    /// Record an applied event. Fails with `Conflict` if the event ID
    /// was already recorded, which callers treat as a benign replay.
    async fn record(&self, event: ProcessedEvent) -> DomainResult<()>;
}
