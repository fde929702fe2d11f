
pub mod agencies;
pub mod health;
pub mod maintenance;
pub mod metrics;
pub mod request_id;
pub mod reservations;
pub mod webhooks;
