//! Create turnos table
//!
//! Scheduled departures with the seat ledger the whole booking flow
//! hangs off. Ids are assigned by the upstream catalog.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Turnos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Turnos::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Turnos::Activity).string().not_null())
                    .col(
                        ColumnDef::new(Turnos::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Turnos::MaxCapacity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Turnos::Occupied)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_turnos_starts_at")
                    .table(Turnos::Table)
                    .col(Turnos::StartsAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Turnos::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Turnos {
    Table,
    Id,
    Activity,
    StartsAt,
    MaxCapacity,
    Occupied,
}
