pub mod errors;
pub mod shutdown;

pub use errors::{AppError, DomainError, DomainResult, InfraError};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
