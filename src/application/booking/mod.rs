//! Booking services: capacity ledger, reservation lifecycle, sweeper

pub mod capacity;
pub mod reservations;
pub mod sweeper;

pub use capacity::CapacityLedger;
pub use reservations::{generate_booking_code, NewHold, ReservationService};
pub use sweeper::{start_sweeper_task, SweepSummary, SweeperService};
