//! Processed webhook event ledger entry

use chrono::{DateTime, Utc};

/// One applied provider event. The uniqueness of `event_id` at the
/// storage layer is what makes webhook processing effectively-once.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// Provider-assigned event ID
    pub event_id: String,
    pub event_type: String,
    /// Short handler outcome recorded at processing time
    pub outcome: String,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            outcome: outcome.into(),
            processed_at: Utc::now(),
        }
    }
}
