pub mod model;
pub mod repository;

pub use model::Agency;
pub use repository::AgencyRepository;
