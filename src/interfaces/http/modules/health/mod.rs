//! Health module: liveness + database ping.

pub mod handlers;

pub use handlers::*;
