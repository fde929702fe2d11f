//! # Vistamar Booking Engine
//!
//! Reservation-payment lifecycle reconciliation engine for a
//! multi-tenant tour-booking platform: timed-capacity holds, webhook
//! driven confirmation, abandoned-cart sweeping and recovery, refunds
//! against connected sub-accounts, and payout reconciliation.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, types and repository traits
//! - **application**: Business logic: capacity ledger, reservation
//!   state machine, sweeper, webhook dispatcher, refunds, payouts
//! - **infrastructure**: External concerns (database, payment gateway,
//!   in-memory storage)
//! - **interfaces**: REST API + provider webhook endpoint with Swagger
//!   documentation
//! - **notifications**: Fire-and-forget customer messaging
//! - **shared**: Error taxonomy and shutdown plumbing

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod notifications;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, SeaOrmRepositoryProvider};

// Re-export API router
pub use interfaces::http::create_api_router;
