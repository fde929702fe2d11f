//! Inbound interfaces: the REST/webhook surface of the engine.

pub mod http;
