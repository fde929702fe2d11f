//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports that depend on application-layer types live here.

pub mod gateway;

pub use gateway::{GatewayError, PaymentGateway};
