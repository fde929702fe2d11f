//! Infrastructure layer - external concerns

pub mod database;
pub mod gateway;
pub mod storage;

pub use database::{init_database, Migrator, SeaOrmRepositoryProvider};
pub use gateway::{MockGateway, StripeGateway};
pub use storage::InMemoryRepositoryProvider;
