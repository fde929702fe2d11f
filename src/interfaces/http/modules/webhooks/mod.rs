//! Inbound provider webhooks: signature verification + dispatch.

pub mod handlers;
pub mod signature;

pub use handlers::{receive_payment_webhook, WebhookState};
