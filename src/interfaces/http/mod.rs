//! HTTP REST API interfaces
//!
//! - `common`: Response envelope, error mapping, validated extractors
//! - `modules`: One module per resource (handlers + DTOs)
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod modules;
pub mod router;

pub use router::create_api_router;
