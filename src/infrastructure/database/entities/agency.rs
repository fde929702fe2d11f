//! Agency entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agencies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub email: String,

    /// Provider connected account (`acct_...`), set after onboarding
    #[sea_orm(nullable)]
    pub connected_account_id: Option<String>,

    /// Platform commission in basis points
    pub commission_bps: i32,

    /// Flat processor fee withheld from refunds, minor units
    pub processor_fee: i64,

    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub authorized: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
