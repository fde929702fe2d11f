//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` — unified access to all per-aggregate repositories
//! - `DomainResult` — standard result type for domain operations

use super::abandoned::AbandonedCartRepository;
use super::agency::AgencyRepository;
use super::payment::{PaymentRepository, RefundRepository};
use super::reservation::ReservationRepository;
use super::turno::TurnoRepository;
use super::webhook_event::ProcessedEventRepository;

pub use crate::shared::errors::DomainResult;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let turno = repos.turnos().find_by_id(7).await?;
///     let res = repos.reservations().find_by_booking_code("VB-A1B2C3").await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn agencies(&self) -> &dyn AgencyRepository;
    fn turnos(&self) -> &dyn TurnoRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn refunds(&self) -> &dyn RefundRepository;
    fn abandoned_carts(&self) -> &dyn AbandonedCartRepository;
    fn processed_events(&self) -> &dyn ProcessedEventRepository;
}
