//! Application layer: use cases orchestrating the domain model over
//! the repository and gateway ports.

pub mod booking;
pub mod payments;
pub mod ports;
