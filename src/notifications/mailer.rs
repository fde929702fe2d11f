//! Mailer port and fire-and-forget dispatch
//!
//! State transitions never wait on mail delivery: [`send_detached`]
//! spawns the send and only logs the outcome, so a mail failure cannot
//! fail or delay the transition that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use super::messages::CustomerMessage;

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailerError(pub String);

/// Outbound port for customer mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: CustomerMessage) -> Result<(), MailerError>;
}

/// Mailer that writes messages to the log instead of sending them.
/// Used in development and tests; a real SMTP/API mailer slots in
/// behind the same trait.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: CustomerMessage) -> Result<(), MailerError> {
        info!(
            message_type = message.message_type(),
            recipient = message.recipient(),
            booking_code = message.booking_code(),
            "Customer notification"
        );
        Ok(())
    }
}

/// Dispatch a message on a detached task. The caller gets back a
/// `JoinHandle` it may inspect in tests but never needs to await.
pub fn send_detached(
    mailer: Arc<dyn Mailer>,
    message: CustomerMessage,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let message_type = message.message_type();
        let booking_code = message.booking_code().to_string();
        if let Err(e) = mailer.send(message).await {
            warn!(
                message_type,
                booking_code,
                error = %e,
                "Customer notification failed"
            );
        }
    })
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::messages::BookingConfirmedMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMailer {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for CountingMailer {
        async fn send(&self, _message: CustomerMessage) -> Result<(), MailerError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MailerError("smtp unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn confirmed_message() -> CustomerMessage {
        CustomerMessage::BookingConfirmed(BookingConfirmedMessage {
            booking_code: "VB-A1B2C3".into(),
            customer_name: "Ana Torres".into(),
            customer_email: "ana@example.com".into(),
            total_amount: 9000,
            currency: "eur".into(),
        })
    }

    #[tokio::test]
    async fn detached_send_delivers() {
        let mailer = Arc::new(CountingMailer { sent: AtomicUsize::new(0), fail: false });
        send_detached(mailer.clone(), confirmed_message())
            .await
            .unwrap();
        assert_eq!(mailer.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detached_send_swallows_failures() {
        let mailer = Arc::new(CountingMailer { sent: AtomicUsize::new(0), fail: true });
        // the task must complete cleanly even though the mailer errored
        send_detached(mailer.clone(), confirmed_message())
            .await
            .unwrap();
        assert_eq!(mailer.sent.load(Ordering::SeqCst), 1);
    }
}
