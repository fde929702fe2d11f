//! Abandoned reservation archive entity
//!
//! Holds the sweeper demoted out of the live table. Keyed by the
//! original reservation id so a late payment can restore the row
//! under the identity its payment records reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "abandoned_reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reservation_id: i32,

    #[sea_orm(unique)]
    pub booking_code: String,

    pub agency_id: i32,
    pub turno_id: i32,

    pub customer_name: String,
    pub customer_email: String,

    pub total_amount: i64,
    pub currency: String,

    /// When the hold was originally placed
    pub created_at: DateTimeUtc,

    /// When the sweeper archived it
    pub abandoned_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::abandoned_reservation_item::Entity")]
    Items,
}

impl Related<super::abandoned_reservation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
