//! Archived reservation line item entity
//!
//! Items keep their original ids so recovery re-inserts them into the
//! live table unchanged.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "abandoned_reservation_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub reservation_id: i32,

    pub kind: String,
    pub catalog_id: i64,
    pub label: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::abandoned_reservation::Entity",
        from = "Column::ReservationId",
        to = "super::abandoned_reservation::Column::ReservationId",
        on_delete = "Cascade"
    )]
    AbandonedReservation,
}

impl Related<super::abandoned_reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AbandonedReservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
