//! Create abandoned_reservation_items table

use sea_orm_migration::prelude::*;

use super::m20250301_000007_create_abandoned_reservations::AbandonedReservations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AbandonedReservationItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AbandonedReservationItems::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::ReservationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::Kind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::CatalogId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::Label)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::UnitPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservationItems::Total)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_abandoned_items_reservation")
                            .from(
                                AbandonedReservationItems::Table,
                                AbandonedReservationItems::ReservationId,
                            )
                            .to(
                                AbandonedReservations::Table,
                                AbandonedReservations::ReservationId,
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_abandoned_items_reservation")
                    .table(AbandonedReservationItems::Table)
                    .col(AbandonedReservationItems::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AbandonedReservationItems::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
pub enum AbandonedReservationItems {
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
