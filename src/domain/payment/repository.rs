use async_trait::async_trait;

use super::model::{Payment, Refund};
use crate::shared::DomainResult;

/// Persistence port for payment attempts. Rows are append-then-update;
/// nothing here deletes.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persist a new payment attempt; returns it with its assigned ID.
    async fn create(&self, payment: Payment) -> DomainResult<Payment>;

    /// Persist status changes of an existing payment.
    async fn update(&self, payment: &Payment) -> DomainResult<()>;

    /// All payment rows for a reservation, newest first.
    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Payment>>;

    async fn find_by_session(&self, session_id: &str) -> DomainResult<Option<Payment>>;

    async fn find_by_intent(&self, payment_intent_id: &str) -> DomainResult<Option<Payment>>;
}

/// Persistence port for refund records. Insert-only; a row is written
/// only after the provider accepted the refund.
#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn create(&self, refund: Refund) -> DomainResult<Refund>;

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Refund>>;
}
