//! Create reservation_items table

use sea_orm_migration::prelude::*;

use super::m20250301_000003_create_reservations::Reservations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReservationItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::ReservationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::Kind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::CatalogId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservationItems::Label).string().not_null())
                    .col(
                        ColumnDef::new(ReservationItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::UnitPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationItems::Total)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_items_reservation")
                            .from(ReservationItems::Table, ReservationItems::ReservationId)
                            .to(Reservations::Table, Reservations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_items_reservation")
                    .table(ReservationItems::Table)
                    .col(ReservationItems::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationItems::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ReservationItems {
    Table,
    Id,
    ReservationId,
    Kind,
    CatalogId,
    Label,
    Quantity,
    UnitPrice,
    Total,
}
