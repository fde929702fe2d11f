pub mod model;
pub mod repository;

pub use model::AbandonedReservation;
pub use repository::AbandonedCartRepository;
