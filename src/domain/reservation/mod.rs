pub mod model;
pub mod repository;

pub use model::{
    items_total, occupant_count, ItemKind, Reservation, ReservationItem, ReservationStatus,
};
pub use repository::ReservationRepository;
