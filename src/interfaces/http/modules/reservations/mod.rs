//! Reservation module: hold placement, lifecycle transitions, refunds.

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
