//! Create abandoned_reservations table
//!
//! Archive for holds the sweeper demoted. Keyed by the original
//! reservation id so recovery restores the same identity.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AbandonedReservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AbandonedReservations::ReservationId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::BookingCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::AgencyId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::TurnoId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::CustomerName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::CustomerEmail)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AbandonedReservations::AbandonedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AbandonedReservations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
pub enum AbandonedReservations {
    Table,
    ReservationId,
    BookingCode,
    AgencyId,
    TurnoId,
    CustomerName,
    CustomerEmail,
    TotalAmount,
    Currency,
    CreatedAt,
    AbandonedAt,
}
