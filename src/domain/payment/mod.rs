pub mod model;
pub mod repository;

pub use model::{
    authoritative_payment, refunded_total, Payment, PaymentStatus, Refund,
    PAID_EXTERNAL_STATUSES,
};
pub use repository::{PaymentRepository, RefundRepository};
