//! Database entities module

pub mod abandoned_reservation;
pub mod abandoned_reservation_item;
pub mod agency;
pub mod payment;
pub mod refund;
pub mod reservation;
pub mod reservation_item;
pub mod turno;
pub mod webhook_event;

pub use abandoned_reservation::Entity as AbandonedReservation;
pub use abandoned_reservation_item::Entity as AbandonedReservationItem;
pub use agency::Entity as Agency;
pub use payment::Entity as Payment;
pub use refund::Entity as Refund;
pub use reservation::Entity as Reservation;
pub use reservation_item::Entity as ReservationItem;
pub use turno::Entity as Turno;
pub use webhook_event::Entity as WebhookEvent;
