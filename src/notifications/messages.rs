//! Customer notification messages
//!
//! Defines the messages the engine sends to customers after a state
//! transition commits.

use serde::{Deserialize, Serialize};

/// Message types for customer notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerMessage {
    /// Booking confirmed after successful payment
    BookingConfirmed(BookingConfirmedMessage),
    /// Booking recovered from the abandoned archive by a late payment
    BookingRecovered(BookingRecoveredMessage),
    /// Refund issued for a booking
    RefundIssued(RefundIssuedMessage),
}

impl CustomerMessage {
    /// Get the message type name
    pub fn message_type(&self) -> &'static str {
        match self {
            CustomerMessage::BookingConfirmed(_) => "booking_confirmed",
            CustomerMessage::BookingRecovered(_) => "booking_recovered",
            CustomerMessage::RefundIssued(_) => "refund_issued",
        }
    }

    /// Get the recipient address
    pub fn recipient(&self) -> &str {
        match self {
            CustomerMessage::BookingConfirmed(m) => &m.customer_email,
            CustomerMessage::BookingRecovered(m) => &m.customer_email,
            CustomerMessage::RefundIssued(m) => &m.customer_email,
        }
    }

    /// Get the booking code the message refers to
    pub fn booking_code(&self) -> &str {
        match self {
            CustomerMessage::BookingConfirmed(m) => &m.booking_code,
            CustomerMessage::BookingRecovered(m) => &m.booking_code,
            CustomerMessage::RefundIssued(m) => &m.booking_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmedMessage {
    pub booking_code: String,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecoveredMessage {
    pub booking_code: String,
    pub customer_name: String,
    pub customer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundIssuedMessage {
    pub booking_code: String,
    pub customer_name: String,
    pub customer_email: String,
    pub amount: i64,
    pub currency: String,
    /// Set when the refund went through the no-reversal fallback path
    pub fallback_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accessors() {
        let msg = CustomerMessage::RefundIssued(RefundIssuedMessage {
            booking_code: "VB-A1B2C3".into(),
            customer_name: "Ana Torres".into(),
            customer_email: "ana@example.com".into(),
            amount: 4500,
            currency: "eur".into(),
            fallback_note: None,
        });
        assert_eq!(msg.message_type(), "refund_issued");
        assert_eq!(msg.recipient(), "ana@example.com");
        assert_eq!(msg.booking_code(), "VB-A1B2C3");
    }

    #[test]
    fn messages_serialize_tagged() {
        let msg = CustomerMessage::BookingConfirmed(BookingConfirmedMessage {
            booking_code: "VB-X9Y8Z7".into(),
            customer_name: "Luis Vega".into(),
            customer_email: "luis@example.com".into(),
            total_amount: 12000,
            currency: "eur".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "BookingConfirmed");
        assert_eq!(json["data"]["booking_code"], "VB-X9Y8Z7");
    }
}
