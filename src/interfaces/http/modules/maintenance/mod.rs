//! Maintenance module: on-demand sweeper pass.

pub mod handlers;

pub use handlers::*;
