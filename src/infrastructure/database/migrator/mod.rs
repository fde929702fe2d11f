//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_agencies;
mod m20250301_000002_create_turnos;
mod m20250301_000003_create_reservations;
mod m20250301_000004_create_reservation_items;
mod m20250301_000005_create_payments;
mod m20250301_000006_create_refunds;
mod m20250301_000007_create_abandoned_reservations;
mod m20250301_000008_create_abandoned_reservation_items;
mod m20250301_000009_create_webhook_events;
mod m20250301_000010_add_fallback_to_refunds;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_agencies::Migration),
            Box::new(m20250301_000002_create_turnos::Migration),
            Box::new(m20250301_000003_create_reservations::Migration),
            Box::new(m20250301_000004_create_reservation_items::Migration),
            Box::new(m20250301_000005_create_payments::Migration),
            Box::new(m20250301_000006_create_refunds::Migration),
            Box::new(m20250301_000007_create_abandoned_reservations::Migration),
            Box::new(m20250301_000008_create_abandoned_reservation_items::Migration),
            Box::new(m20250301_000009_create_webhook_events::Migration),
            Box::new(m20250301_000010_add_fallback_to_refunds::Migration),
        ]
    }
}
