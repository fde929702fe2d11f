//! SeaORM implementation of ReservationRepository
//!
//! Reservation and item rows move together: creation, restore and
//! delete each run inside a database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use crate::domain::reservation::{
    ItemKind, Reservation, ReservationItem, ReservationRepository, ReservationStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{reservation, reservation_item};

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> Reservation {
    Reservation {
        id: m.id,
        booking_code: m.booking_code,
        agency_id: m.agency_id,
        turno_id: m.turno_id,
        customer_name: m.customer_name,
        customer_email: m.customer_email,
        total_amount: m.total_amount,
        currency: m.currency,
        status: ReservationStatus::from_str(&m.status),
        created_at: m.created_at,
        expires_at: m.expires_at,
        cancelled_at: m.cancelled_at,
    }
}

fn item_to_domain(m: reservation_item::Model) -> ReservationItem {
    ReservationItem {
        id: m.id,
        reservation_id: m.reservation_id,
        // unknown kinds read back as extras, which carry no seat weight
        kind: ItemKind::from_str(&m.kind).unwrap_or(ItemKind::Extra),
        catalog_id: m.catalog_id,
        label: m.label,
        quantity: m.quantity,
        unit_price: m.unit_price,
        total: m.total,
    }
}

fn domain_to_active(r: &Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        id: Set(r.id),
        booking_code: Set(r.booking_code.clone()),
        agency_id: Set(r.agency_id),
        turno_id: Set(r.turno_id),
        customer_name: Set(r.customer_name.clone()),
        customer_email: Set(r.customer_email.clone()),
        total_amount: Set(r.total_amount),
        currency: Set(r.currency.clone()),
        status: Set(r.status.as_str().to_string()),
        created_at: Set(r.created_at),
        expires_at: Set(r.expires_at),
        cancelled_at: Set(r.cancelled_at),
    }
}

fn item_to_active(item: &ReservationItem, reservation_id: i32) -> reservation_item::ActiveModel {
    reservation_item::ActiveModel {
        id: if item.id == 0 { NotSet } else { Set(item.id) },
        reservation_id: Set(reservation_id),
        kind: Set(item.kind.as_str().to_string()),
        catalog_id: Set(item.catalog_id),
        label: Set(item.label.clone()),
        quantity: Set(item.quantity),
        unit_price: Set(item.unit_price),
        total: Set(item.total),
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

fn unique_violation(e: &sea_orm::DbErr) -> bool {
    e.to_string().contains("UNIQUE constraint")
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn create_with_items(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<Reservation> {
        debug!(booking_code = %reservation.booking_code, "Creating reservation");

        let txn = self.db.begin().await.map_err(db_err)?;

        let mut model = domain_to_active(&reservation);
        model.id = NotSet;
        let stored = match model.insert(&txn).await {
            Ok(stored) => stored,
            Err(e) if unique_violation(&e) => {
                return Err(DomainError::Conflict(format!(
                    "booking code {} already exists",
                    reservation.booking_code
                )));
            }
            Err(e) => return Err(db_err(e)),
        };

        for item in &items {
            item_to_active(item, stored.id)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(model_to_domain(stored))
    }

    async fn restore(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<()> {
        debug!(
            reservation_id = reservation.id,
            booking_code = %reservation.booking_code,
            "Restoring archived reservation"
        );

        let txn = self.db.begin().await.map_err(db_err)?;

        match domain_to_active(&reservation).insert(&txn).await {
            Ok(_) => {}
            Err(e) if unique_violation(&e) => {
                return Err(DomainError::Conflict(format!(
                    "reservation {} is already live",
                    reservation.id
                )));
            }
            Err(e) => return Err(db_err(e)),
        }

        for item in &items {
            item_to_active(item, reservation.id)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_booking_code(&self, code: &str) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find()
            .filter(reservation::Column::BookingCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn items_for(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>> {
        let models = reservation_item::Entity::find()
            .filter(reservation_item::Column::ReservationId.eq(reservation_id))
            .order_by_asc(reservation_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(item_to_domain).collect())
    }

    async fn update(&self, r: &Reservation) -> DomainResult<()> {
        let existing = reservation::Entity::find_by_id(r.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if existing.is_none() {
            return Err(DomainError::NotFound {
                entity: "reservation".into(),
                field: "id".into(),
                value: r.id.to_string(),
            });
        }

        domain_to_active(r).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        reservation_item::Entity::delete_many()
            .filter(reservation_item::Column::ReservationId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        reservation::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_stale_holds(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Hold.as_str()))
            .filter(reservation::Column::CreatedAt.lte(cutoff))
            .order_by_asc(reservation::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
