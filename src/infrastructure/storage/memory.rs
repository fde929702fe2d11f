//! In-memory repository implementations
//!
//! DashMap-backed storage for development and tests. Capacity
//! conditionals run under the map's per-key write guard, which gives
//! the same linearized occupy/release semantics the SQL layer gets
//! from its conditional UPDATE.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::abandoned::AbandonedCartRepository;
use crate::domain::agency::AgencyRepository;
use crate::domain::payment::{PaymentRepository, RefundRepository};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::turno::TurnoRepository;
use crate::domain::webhook_event::ProcessedEventRepository;
use crate::domain::{
    AbandonedReservation, Agency, DomainError, DomainResult, Payment, ProcessedEvent,
    Refund, Reservation, ReservationItem, Turno,
};

// ── Turnos ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryTurnoRepository {
    turnos: DashMap<i32, Turno>,
}

#[async_trait]
impl TurnoRepository for InMemoryTurnoRepository {
    async fn save(&self, turno: Turno) -> DomainResult<()> {
        self.turnos.insert(turno.id, turno);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Turno>> {
        Ok(self.turnos.get(&id).map(|t| t.clone()))
    }

    async fn occupy_seats(&self, turno_id: i32, count: i32) -> DomainResult<()> {
        let mut turno = self.turnos.get_mut(&turno_id).ok_or_else(|| {
            DomainError::NotFound {
                entity: "turno".into(),
                field: "id".into(),
                value: turno_id.to_string(),
            }
        })?;
        if turno.occupied + count > turno.max_capacity {
            let available = turno.max_capacity - turno.occupied;
            return Err(DomainError::CapacityExceeded {
                turno_id,
                requested: count,
                available,
            });
        }
        turno.occupied += count;
        Ok(())
    }

    async fn release_seats(&self, turno_id: i32, count: i32) -> DomainResult<()> {
        let mut turno = self.turnos.get_mut(&turno_id).ok_or_else(|| {
            DomainError::NotFound {
                entity: "turno".into(),
                field: "id".into(),
                value: turno_id.to_string(),
            }
        })?;
        if turno.occupied < count {
            let occupied = turno.occupied;
            return Err(DomainError::CapacityUnderflow {
                turno_id,
                requested: count,
                occupied,
            });
        }
        turno.occupied -= count;
        Ok(())
    }
}

// ── Reservations ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: DashMap<i32, Reservation>,
    items: DashMap<i32, Vec<ReservationItem>>,
    codes: DashMap<String, i32>,
    id_counter: AtomicI32,
    item_counter: AtomicI32,
}

impl InMemoryReservationRepository {
    fn stamp_items(&self, reservation_id: i32, mut items: Vec<ReservationItem>) -> Vec<ReservationItem> {
        for item in &mut items {
            item.id = self.item_counter.fetch_add(1, Ordering::SeqCst) + 1;
            item.reservation_id = reservation_id;
        }
        items
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn create_with_items(
        &self,
        mut reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<Reservation> {
        reservation.id = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;

        match self.codes.entry(reservation.booking_code.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "booking code {} already exists",
                    reservation.booking_code
                )))
            }
            Entry::Vacant(v) => {
                v.insert(reservation.id);
            }
        }

        let items = self.stamp_items(reservation.id, items);
        self.items.insert(reservation.id, items);
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn restore(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<()> {
        if self.reservations.contains_key(&reservation.id) {
            return Err(DomainError::Conflict(format!(
                "reservation {} is already live",
                reservation.id
            )));
        }
        match self.codes.entry(reservation.booking_code.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "booking code {} already exists",
                    reservation.booking_code
                )))
            }
            Entry::Vacant(v) => {
                v.insert(reservation.id);
            }
        }

        self.id_counter.fetch_max(reservation.id, Ordering::SeqCst);
        let items = self.stamp_items(reservation.id, items);
        self.items.insert(reservation.id, items);
        self.reservations.insert(reservation.id, reservation);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(&id).map(|r| r.clone()))
    }

    async fn find_by_booking_code(&self, code: &str) -> DomainResult<Option<Reservation>> {
        let Some(id) = self.codes.get(code).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.reservations.get(&id).map(|r| r.clone()))
    }

    async fn items_for(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>> {
        Ok(self
            .items
            .get(&reservation_id)
            .map(|i| i.clone())
            .unwrap_or_default())
    }

    async fn update(&self, reservation: &Reservation) -> DomainResult<()> {
        if !self.reservations.contains_key(&reservation.id) {
            return Err(DomainError::NotFound {
                entity: "reservation".into(),
                field: "id".into(),
                value: reservation.id.to_string(),
            });
        }
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let (_, removed) = self.reservations.remove(&id).ok_or_else(|| {
            DomainError::NotFound {
                entity: "reservation".into(),
                field: "id".into(),
                value: id.to_string(),
            }
        })?;
        self.items.remove(&id);
        self.codes.remove(&removed.booking_code);
        Ok(())
    }

    async fn find_stale_holds(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.is_hold() && r.created_at <= cutoff)
            .map(|r| r.clone())
            .collect())
    }
}

// ── Agencies ───────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAgencyRepository {
    agencies: DashMap<i32, Agency>,
    id_counter: AtomicI32,
}

#[async_trait]
impl AgencyRepository for InMemoryAgencyRepository {
    async fn save(&self, mut agency: Agency) -> DomainResult<Agency> {
        if agency.id == 0 {
            agency.id = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        } else {
            self.id_counter.fetch_max(agency.id, Ordering::SeqCst);
        }
        self.agencies.insert(agency.id, agency.clone());
        Ok(agency)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Agency>> {
        Ok(self.agencies.get(&id).map(|a| a.clone()))
    }

    async fn find_by_connected_account(&self, account_id: &str) -> DomainResult<Option<Agency>> {
        Ok(self
            .agencies
            .iter()
            .find(|a| a.connected_account_id.as_deref() == Some(account_id))
            .map(|a| a.clone()))
    }

    async fn update(&self, agency: &Agency) -> DomainResult<()> {
        if !self.agencies.contains_key(&agency.id) {
            return Err(DomainError::NotFound {
                entity: "agency".into(),
                field: "id".into(),
                value: agency.id.to_string(),
            });
        }
        self.agencies.insert(agency.id, agency.clone());
        Ok(())
    }
}

// ── Payments ───────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: DashMap<i32, Payment>,
    id_counter: AtomicI32,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, mut payment: Payment) -> DomainResult<Payment> {
        payment.id = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn update(&self, payment: &Payment) -> DomainResult<()> {
        if !self.payments.contains_key(&payment.id) {
            return Err(DomainError::NotFound {
                entity: "payment".into(),
                field: "id".into(),
                value: payment.id.to_string(),
            });
        }
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Payment>> {
        let mut rows: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.reservation_id == reservation_id)
            .map(|p| p.clone())
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn find_by_session(&self, session_id: &str) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| p.session_id == session_id)
            .max_by_key(|p| (p.created_at, p.id))
            .map(|p| p.clone()))
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| p.payment_intent_id == payment_intent_id)
            .max_by_key(|p| (p.created_at, p.id))
            .map(|p| p.clone()))
    }
}

// ── Refunds ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRefundRepository {
    refunds: DashMap<i32, Refund>,
    id_counter: AtomicI32,
}

#[async_trait]
impl RefundRepository for InMemoryRefundRepository {
    async fn create(&self, mut refund: Refund) -> DomainResult<Refund> {
        refund.id = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.refunds.insert(refund.id, refund.clone());
        Ok(refund)
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Refund>> {
        let mut rows: Vec<Refund> = self
            .refunds
            .iter()
            .filter(|r| r.reservation_id == reservation_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }
}

// ── Abandoned carts ────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAbandonedCartRepository {
    records: DashMap<i32, AbandonedReservation>,
    items: DashMap<i32, Vec<ReservationItem>>,
    codes: DashMap<String, i32>,
}

#[async_trait]
impl AbandonedCartRepository for InMemoryAbandonedCartRepository {
    async fn archive(
        &self,
        record: AbandonedReservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<()> {
        // insert-or-replace by original reservation id
        self.codes
            .insert(record.booking_code.clone(), record.reservation_id);
        self.items.insert(record.reservation_id, items);
        self.records.insert(record.reservation_id, record);
        Ok(())
    }

    async fn find_by_booking_code(
        &self,
        code: &str,
    ) -> DomainResult<Option<AbandonedReservation>> {
        let Some(id) = self.codes.get(code).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn items_for(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>> {
        Ok(self
            .items
            .get(&reservation_id)
            .map(|i| i.clone())
            .unwrap_or_default())
    }

    async fn delete(&self, reservation_id: i32) -> DomainResult<()> {
        let (_, removed) = self.records.remove(&reservation_id).ok_or_else(|| {
            DomainError::NotFound {
                entity: "abandoned reservation".into(),
                field: "reservation_id".into(),
                value: reservation_id.to_string(),
            }
        })?;
        self.items.remove(&reservation_id);
        self.codes.remove(&removed.booking_code);
        Ok(())
    }
}

// ── Processed events ───────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryProcessedEventRepository {
    events: DashMap<String, ProcessedEvent>,
}

#[async_trait]
impl ProcessedEventRepository for InMemoryProcessedEventRepository {
    async fn find(&self, event_id: &str) -> DomainResult<Option<ProcessedEvent>> {
        Ok(self.events.get(event_id).map(|e| e.clone()))
    }

    async fn record(&self, event: ProcessedEvent) -> DomainResult<()> {
        match self.events.entry(event.event_id.clone()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "event {} already recorded",
                event.event_id
            ))),
            Entry::Vacant(v) => {
                v.insert(event);
                Ok(())
            }
        }
    }
}

// ── Provider ───────────────────────────────────────────────────

/// Unified in-memory provider for development and tests.
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    agencies: InMemoryAgencyRepository,
    turnos: InMemoryTurnoRepository,
    reservations: InMemoryReservationRepository,
    payments: InMemoryPaymentRepository,
    refunds: InMemoryRefundRepository,
    abandoned_carts: InMemoryAbandonedCartRepository,
    processed_events: InMemoryProcessedEventRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn agencies(&self) -> &dyn AgencyRepository {
        &self.agencies
    }

    fn turnos(&self) -> &dyn TurnoRepository {
        &self.turnos
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn refunds(&self) -> &dyn RefundRepository {
        &self.refunds
    }

    fn abandoned_carts(&self) -> &dyn AbandonedCartRepository {
        &self.abandoned_carts
    }

    fn processed_events(&self) -> &dyn ProcessedEventRepository {
        &self.processed_events
    }
}

// ── Tests ──────────────────────────────────────────────────────
