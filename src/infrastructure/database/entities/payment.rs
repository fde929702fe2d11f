//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub reservation_id: i32,

    /// Provider checkout session (`cs_...`), one payment row per session
    #[sea_orm(unique)]
    pub session_id: String,

    /// Provider payment intent (`pi_...`), empty until the provider
    /// assigns one
    pub payment_intent_id: String,

    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,

    /// Local status: succeeded, pending, failed
    pub status: String,

    /// Raw provider payment status, kept verbatim for reconciliation
    pub external_status: String,

    #[sea_orm(nullable)]
    pub receipt_url: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reservation::Entity",
        from = "Column::ReservationId",
        to = "super::reservation::Column::Id"
    )]
    Reservation,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
