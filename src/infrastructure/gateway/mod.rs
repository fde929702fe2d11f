//! Payment gateway implementations

pub mod mock;
pub mod stripe;

pub use mock::MockGateway;
pub use stripe::StripeGateway;
