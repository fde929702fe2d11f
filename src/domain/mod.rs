pub mod abandoned;
pub mod agency;
pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod turno;
pub mod webhook_event;

// Re-export commonly used types
pub use abandoned::AbandonedReservation;
pub use agency::Agency;
pub use payment::{
    authoritative_payment, refunded_total, Payment, PaymentStatus, Refund,
    PAID_EXTERNAL_STATUSES,
};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{
    items_total, occupant_count, ItemKind, Reservation, ReservationItem, ReservationStatus,
};
pub use turno::Turno;
pub use webhook_event::ProcessedEvent;

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
