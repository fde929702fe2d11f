use async_trait::async_trait;

use super::model::AbandonedReservation;
use crate::domain::reservation::ReservationItem;
use crate::shared::DomainResult;

/// Persistence port for the abandoned-cart archive.
#[async_trait]
pub trait AbandonedCartRepository: Send + Sync {
    /// Archive a swept hold with copies of its line items.
    /// Insert-or-replace on the reservation ID, so re-sweeping the
    /// same reservation after a partial failure cannot error out.
    async fn archive(
        &self,
        record: AbandonedReservation,
        items: Vec<ReservationItem>,
    ) -> DomainResult<()>;

    async fn find_by_booking_code(&self, code: &str)
        -> DomainResult<Option<AbandonedReservation>>;

    async fn items_for(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>>;

    /// Drop an archived record and its items after recovery.
    async fn delete(&self, reservation_id: i32) -> DomainResult<()>;
}
