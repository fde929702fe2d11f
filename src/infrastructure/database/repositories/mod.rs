//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod abandoned_repository;
pub mod agency_repository;
pub mod payment_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod turno_repository;
pub mod webhook_event_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
