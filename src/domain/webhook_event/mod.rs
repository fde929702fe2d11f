pub mod model;
pub mod repository;

pub use model::ProcessedEvent;
pub use repository::ProcessedEventRepository;
