use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Reservation, ReservationItem};
use crate::shared::DomainResult;

/// Persistence port for reservations and their line items.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Persist a reservation together with its items in one atomic
    /// write. Returns the stored reservation with its assigned ID;
    /// items get the reservation's ID stamped on them.
    ///
    /// Fails with `Conflict` if the booking code is already taken.
    async fn create_with_items(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<Reservation>;

    /// Re-insert a previously archived reservation under its original
    /// ID, together with its items. Fails with `Conflict` if the ID or
    /// booking code is already live.
    async fn restore(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<()>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>>;

    async fn find_by_booking_code(&self, code: &str) -> DomainResult<Option<Reservation>>;

    async fn items_for(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>>;

    /// Persist status/stamp changes of an existing reservation.
    async fn update(&self, reservation: &Reservation) -> DomainResult<()>;

    /// Remove a reservation and its items. Used by the sweeper after
    /// archiving; never exposed as a public operation.
    async fn delete(&self, id: i32) -> DomainResult<()>;

    /// All reservations still in `hold` created at or before `cutoff`.
    async fn find_stale_holds(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;
}
