//! Turno (tour departure) entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A scheduled departure with a seat ledger. Ids come from the
/// upstream catalog, so no auto increment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "turnos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub activity: String,
    pub starts_at: DateTimeUtc,

    pub max_capacity: i32,

    /// Seats currently taken by holds and confirmed reservations
    pub occupied: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
