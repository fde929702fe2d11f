//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Customer-facing code, unique across live reservations
    #[sea_orm(unique)]
    pub booking_code: String,

    pub agency_id: i32,
    pub turno_id: i32,

    pub customer_name: String,
    pub customer_email: String,

    /// Total in minor currency units
    pub total_amount: i64,
    pub currency: String,

    /// Reservation status: hold, confirmed, cancelled
    pub status: String,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub expires_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::agency::Entity",
        from = "Column::AgencyId",
        to = "super::agency::Column::Id"
    )]
    Agency,

    #[sea_orm(
        belongs_to = "super::turno::Entity",
        from = "Column::TurnoId",
        to = "super::turno::Column::Id"
    )]
    Turno,

    #[sea_orm(has_many = "super::reservation_item::Entity")]
    Items,
}

impl Related<super::agency::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agency.def()
    }
}

impl Related<super::turno::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Turno.def()
    }
}

impl Related<super::reservation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
