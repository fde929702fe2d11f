//! Add fallback columns to refunds
//!
//! Records when a refund could not reverse the transfer and was
//! issued directly from the connected balance instead.

use sea_orm_migration::prelude::*;

use super::m20250301_000006_create_refunds::Refunds;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Refunds::Table)
                    .add_column(
                        ColumnDef::new(RefundsFallback::FallbackUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Refunds::Table)
                    .add_column(ColumnDef::new(RefundsFallback::FallbackReason).string())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite can't drop columns; leaving them is harmless
        Ok(())
    }
}

#[derive(Iden)]
enum RefundsFallback {
    FallbackUsed,
    FallbackReason,
}
