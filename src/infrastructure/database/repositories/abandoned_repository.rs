//! SeaORM implementation of AbandonedCartRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::debug;

use crate::domain::abandoned::{AbandonedCartRepository, AbandonedReservation};
use crate::domain::reservation::{ItemKind, ReservationItem};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{abandoned_reservation, abandoned_reservation_item};

pub struct SeaOrmAbandonedCartRepository {
    db: DatabaseConnection,
}

impl SeaOrmAbandonedCartRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: abandoned_reservation::Model) -> AbandonedReservation {
    AbandonedReservation {
        reservation_id: m.reservation_id,
        booking_code: m.booking_code,
        agency_id: m.agency_id,
        turno_id: m.turno_id,
        customer_name: m.customer_name,
        customer_email: m.customer_email,
        total_amount: m.total_amount,
        currency: m.currency,
        created_at: m.created_at,
        abandoned_at: m.abandoned_at,
    }
}

fn item_to_domain(m: abandoned_reservation_item::Model) -> ReservationItem {
    ReservationItem {
        id: m.id,
        reservation_id: m.reservation_id,
        kind: ItemKind::from_str(&m.kind).unwrap_or(ItemKind::Extra),
        catalog_id: m.catalog_id,
        label: m.label,
        quantity: m.quantity,
        unit_price: m.unit_price,
        total: m.total,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── AbandonedCartRepository impl ────────────────────────────────

#[async_trait]
impl AbandonedCartRepository for SeaOrmAbandonedCartRepository {
    async fn archive(
        &self,
        record: AbandonedReservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<()> {
        debug!(
            reservation_id = record.reservation_id,
            booking_code = %record.booking_code,
            "Archiving abandoned reservation"
        );

        let txn = self.db.begin().await.map_err(db_err)?;

        // Insert-or-replace: clear any earlier archive of the same
        // reservation so a re-sweep after a partial failure succeeds.
        abandoned_reservation_item::Entity::delete_many()
            .filter(
                abandoned_reservation_item::Column::ReservationId.eq(record.reservation_id),
            )
            .exec(&txn)
            .await
            .map_err(db_err)?;
        abandoned_reservation::Entity::delete_by_id(record.reservation_id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let model = abandoned_reservation::ActiveModel {
            reservation_id: Set(record.reservation_id),
            booking_code: Set(record.booking_code.clone()),
            agency_id: Set(record.agency_id),
            turno_id: Set(record.turno_id),
            customer_name: Set(record.customer_name.clone()),
            customer_email: Set(record.customer_email.clone()),
            total_amount: Set(record.total_amount),
            currency: Set(record.currency.clone()),
            created_at: Set(record.created_at),
            abandoned_at: Set(record.abandoned_at),
        };
        model.insert(&txn).await.map_err(db_err)?;

        for item in &items {
            let item_model = abandoned_reservation_item::ActiveModel {
                id: Set(item.id),
                reservation_id: Set(record.reservation_id),
                kind: Set(item.kind.as_str().to_string()),
                catalog_id: Set(item.catalog_id),
                label: Set(item.label.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total: Set(item.total),
            };
            item_model.insert(&txn).await.map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_booking_code(
        &self,
        code: &str,
    ) -> DomainResult<Option<AbandonedReservation>> {
        let model = abandoned_reservation::Entity::find()
            .filter(abandoned_reservation::Column::BookingCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn items_for(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>> {
        let models = abandoned_reservation_item::Entity::find()
            .filter(abandoned_reservation_item::Column::ReservationId.eq(reservation_id))
            .order_by_asc(abandoned_reservation_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(item_to_domain).collect())
    }

    async fn delete(&self, reservation_id: i32) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        abandoned_reservation_item::Entity::delete_many()
            .filter(abandoned_reservation_item::Column::ReservationId.eq(reservation_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        abandoned_reservation::Entity::delete_by_id(reservation_id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}
