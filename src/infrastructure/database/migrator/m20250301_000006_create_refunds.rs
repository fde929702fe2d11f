//! Create refunds table

use sea_orm_migration::prelude::*;

use super::m20250301_000005_create_payments::Payments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Refunds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Refunds::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Refunds::ReservationId).integer().not_null())
                    .col(ColumnDef::new(Refunds::PaymentId).integer().not_null())
                    .col(
                        ColumnDef::new(Refunds::ProviderRefundId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Refunds::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Refunds::Status).string().not_null())
                    .col(
                        ColumnDef::new(Refunds::AuthorizedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Refunds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_refunds_payment")
                            .from(Refunds::Table, Refunds::PaymentId)
                            .to(Payments::Table, Payments::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_refunds_reservation")
                    .table(Refunds::Table)
                    .col(Refunds::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Refunds::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Refunds {
    Table,
    Id,
    ReservationId,
    PaymentId,
    ProviderRefundId,
    Amount,
    Status,
    AuthorizedBy,
    CreatedAt,
}
