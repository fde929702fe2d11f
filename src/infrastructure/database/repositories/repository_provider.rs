//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::abandoned::AbandonedCartRepository;
use crate::domain::agency::AgencyRepository;
use crate::domain::payment::{PaymentRepository, RefundRepository};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::turno::TurnoRepository;
use crate::domain::webhook_event::ProcessedEventRepository;

use super::abandoned_repository::SeaOrmAbandonedCartRepository;
use super::agency_repository::SeaOrmAgencyRepository;
use super::payment_repository::{SeaOrmPaymentRepository, SeaOrmRefundRepository};
use super::reservation_repository::SeaOrmReservationRepository;
use super::turno_repository::SeaOrmTurnoRepository;
use super::webhook_event_repository::SeaOrmProcessedEventRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let turno = repos.turnos().find_by_id(7).await?;
/// let res = repos.reservations().find_by_booking_code("VB-A1B2C3").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    agencies: SeaOrmAgencyRepository,
    turnos: SeaOrmTurnoRepository,
    reservations: SeaOrmReservationRepository,
    payments: SeaOrmPaymentRepository,
    refunds: SeaOrmRefundRepository,
    abandoned_carts: SeaOrmAbandonedCartRepository,
    processed_events: SeaOrmProcessedEventRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            agencies: SeaOrmAgencyRepository::new(db.clone()),
            turnos: SeaOrmTurnoRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db.clone()),
            refunds: SeaOrmRefundRepository::new(db.clone()),
            abandoned_carts: SeaOrmAbandonedCartRepository::new(db.clone()),
            processed_events: SeaOrmProcessedEventRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
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
