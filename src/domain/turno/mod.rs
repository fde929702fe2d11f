pub mod model;
pub mod repository;

pub use model::Turno;
pub use repository::TurnoRepository;
