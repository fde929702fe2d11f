//! Notifications module
//!
//! Customer-facing messages dispatched after lifecycle transitions.
//!
//! # Usage
//! ```ignore
//! use vistamar_booking::notifications::{send_detached, CustomerMessage, LogMailer};
//! use std::sync::Arc;
//!
//! let mailer = Arc::new(LogMailer);
//! send_detached(mailer, message); // never awaited by the transition
//! ```

pub mod mailer;
pub mod messages;

pub use mailer::{send_detached, LogMailer, Mailer, MailerError};
pub use messages::{
    BookingConfirmedMessage, BookingRecoveredMessage, CustomerMessage, RefundIssuedMessage,
};
