//! Agency module: payout info, manual payouts, schedule management.

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
