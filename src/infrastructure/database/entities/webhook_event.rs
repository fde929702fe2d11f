//! Processed webhook event entity
//!
//! Dedup ledger for provider deliveries. The primary key on the
//! provider event id is what makes concurrent duplicate deliveries
//! collapse into one application.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: String,

    pub event_type: String,

    /// Short human-readable result the handler produced
    pub outcome: String,

    pub processed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
