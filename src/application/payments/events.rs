//! Typed webhook events
//!
//! Parses the provider's JSON envelope into a closed set of event
//! kinds. Unrecognized types land in `Unknown` and are accepted
//! without effect, so provider schema growth never breaks ingestion.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{DomainError, DomainResult};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const ACCOUNT_UPDATED: &str = "account.updated";
pub const ACCOUNT_AUTHORIZED: &str = "account.application.authorized";
pub const ACCOUNT_DEAUTHORIZED: &str = "account.application.deauthorized";

/// Checkout session snapshot carried by a `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionData {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionData {
    pub fn booking_code(&self) -> Option<&str> {
        self.metadata.get("booking_code").map(String::as_str)
    }

    /// Whether the provider reports the session as settled.
    pub fn is_paid(&self) -> bool {
        crate::domain::PAID_EXTERNAL_STATUSES.contains(&self.payment_status.as_str())
    }
}

/// Payment intent snapshot carried by a `payment_intent.succeeded`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentData {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub latest_charge: Option<String>,
}

/// Connected-account snapshot carried by an `account.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountData {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
}

/// Authorization change; the account comes from the event envelope,
/// not the payload object.
#[derive(Debug, Clone)]
pub struct AccountAuthData {
    pub account_id: String,
}

#[derive(Debug, Clone)]
pub enum WebhookEventKind {
    CheckoutSessionCompleted(CheckoutSessionData),
    PaymentIntentSucceeded(PaymentIntentData),
    AccountUpdated(AccountData),
    AccountAuthorized(AccountAuthData),
    AccountDeauthorized(AccountAuthData),
    Unknown(String),
}

/// One provider event, parsed and ready for dispatch.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Provider-assigned event ID, the idempotency handle
    pub id: String,
    /// Raw type string, kept for the ledger
    pub event_type: String,
    pub kind: WebhookEventKind,
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    account: Option<String>,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

impl WebhookEvent {
    /// Parse a raw (signature-verified) webhook body.
    pub fn parse(payload: &[u8]) -> DomainResult<Self> {
        let envelope: Envelope = serde_json::from_slice(payload)
            .map_err(|e| DomainError::Validation(format!("malformed webhook payload: {e}")))?;

        let kind = match envelope.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                WebhookEventKind::CheckoutSessionCompleted(parse_object(envelope.data.object)?)
            }
            PAYMENT_INTENT_SUCCEEDED => {
                WebhookEventKind::PaymentIntentSucceeded(parse_object(envelope.data.object)?)
            }
            ACCOUNT_UPDATED => {
                WebhookEventKind::AccountUpdated(parse_object(envelope.data.object)?)
            }
            ACCOUNT_AUTHORIZED => {
                WebhookEventKind::AccountAuthorized(auth_data(&envelope)?)
            }
            ACCOUNT_DEAUTHORIZED => {
                WebhookEventKind::AccountDeauthorized(auth_data(&envelope)?)
            }
            other => WebhookEventKind::Unknown(other.to_string()),
        };

        Ok(Self {
            id: envelope.id,
            event_type: envelope.event_type,
            kind,
        })
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(object: serde_json::Value) -> DomainResult<T> {
    serde_json::from_value(object)
        .map_err(|e| DomainError::Validation(format!("malformed webhook object: {e}")))
}

fn auth_data(envelope: &Envelope) -> DomainResult<AccountAuthData> {
    let account_id = envelope
        .account
        .clone()
        .ok_or_else(|| {
            DomainError::Validation("authorization event without account field".into())
        })?;
    Ok(AccountAuthData { account_id })
}

// ── Tests ──────────────────────────────────────────────────────
