//! Outbound port — interface to the payment provider
//!
//! [`PaymentGateway`] is the architectural contract that decouples the
//! booking and payment services from the concrete provider transport.
//!
//! The production implementation lives in
//! [`StripeGateway`](crate::infrastructure::gateway::stripe::StripeGateway);
//! tests use [`MockGateway`](crate::infrastructure::gateway::mock::MockGateway).

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::shared::DomainError;

// ── Wire types (provider-shaped, version-agnostic) ─────────────

/// A provider payment intent, as returned by `retrieve_payment_intent`.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    /// Provider status string (`succeeded`, `processing`, `canceled`, ...)
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub latest_charge: Option<String>,
}

impl PaymentIntent {
    /// Whether the intent holds settled funds that can be refunded.
    pub fn is_refundable(&self) -> bool {
        self.status == "succeeded"
    }
}

/// A provider checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    /// Absent for zero-amount sessions
    pub payment_intent: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`
    pub payment_status: String,
    /// `open`, `complete` or `expired`
    pub status: String,
    pub amount_total: i64,
    pub currency: String,
    /// String map attached at session creation; carries `booking_code`
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub payment_intent_id: String,
    /// Amount in minor currency units
    pub amount: i64,
    /// Pull the refunded funds back from the connected account
    pub reverse_transfer: bool,
    pub connected_account_id: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

/// One per-currency balance bucket.
#[derive(Debug, Clone)]
pub struct BalanceEntry {
    pub amount: i64,
    pub currency: String,
}

/// A connected account's balance split by settlement state.
#[derive(Debug, Clone, Default)]
pub struct Balance {
    pub available: Vec<BalanceEntry>,
    pub pending: Vec<BalanceEntry>,
}

impl Balance {
    /// Available amount in one currency (case-insensitive), summed
    /// across buckets.
    pub fn available_in(&self, currency: &str) -> i64 {
        self.available
            .iter()
            .filter(|e| e.currency.eq_ignore_ascii_case(currency))
            .map(|e| e.amount)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub amount: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
    pub connected_account_id: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone)]
pub struct PayoutReceipt {
    pub id: String,
    pub status: String,
    /// Expected arrival as a unix timestamp, when the provider gives one
    pub arrival_date: Option<i64>,
}

/// Payout cadence on a connected account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutInterval {
    Daily,
    Weekly,
    Monthly,
    Manual,
}

impl PayoutInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for PayoutInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutSchedule {
    pub interval: PayoutInterval,
    /// Weekday name, required when interval is weekly
    pub weekly_anchor: Option<String>,
    /// Day of month 1-31, required when interval is monthly
    pub monthly_anchor: Option<u8>,
}

impl PayoutSchedule {
    pub fn manual() -> Self {
        Self {
            interval: PayoutInterval::Manual,
            weekly_anchor: None,
            monthly_anchor: None,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.interval == PayoutInterval::Manual
    }
}

/// A provider connected account, as returned by `retrieve_account`.
#[derive(Debug, Clone)]
pub struct ConnectedAccount {
    pub id: String,
    pub payouts_enabled: bool,
    pub charges_enabled: bool,
    pub payout_schedule: PayoutSchedule,
    pub external_account_count: u32,
}

// ── Errors ─────────────────────────────────────────────────────

/// Failure talking to the payment provider.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Provider rejected the request with a typed error code
    #[error("provider error {code}: {message}")]
    Api { code: String, message: String },
    /// Refund rejected specifically over transfer-reversal constraints
    #[error("transfer reversal rejected: {message}")]
    TransferReversal { message: String },
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("provider request timed out")]
    Timeout,
}

impl From<GatewayError> for DomainError {
    fn from(e: GatewayError) -> Self {
        DomainError::Provider(e.to_string())
    }
}

// ── PaymentGateway ─────────────────────────────────────────────

/// Port for every call the engine makes to the payment provider.
///
/// All connected-account scoped calls take the account ID explicitly;
/// implementations route it via the provider's account header.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Sessions that produced the given payment intent, newest first.
    async fn list_checkout_sessions(
        &self,
        payment_intent: &str,
    ) -> Result<Vec<CheckoutSession>, GatewayError>;

    async fn create_refund(&self, request: RefundRequest)
        -> Result<RefundReceipt, GatewayError>;

    async fn retrieve_balance(
        &self,
        connected_account_id: &str,
    ) -> Result<Balance, GatewayError>;

    async fn create_payout(&self, request: PayoutRequest)
        -> Result<PayoutReceipt, GatewayError>;

    async fn retrieve_account(&self, id: &str) -> Result<ConnectedAccount, GatewayError>;

    async fn update_payout_schedule(
        &self,
        account_id: &str,
        schedule: PayoutSchedule,
    ) -> Result<(), GatewayError>;
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_succeeded_intents_are_refundable() {
        let mut intent = PaymentIntent {
            id: "pi_1".into(),
            status: "succeeded".into(),
            amount: 5000,
            currency: "eur".into(),
            latest_charge: Some("ch_1".into()),
        };
        assert!(intent.is_refundable());

        intent.status = "processing".into();
        assert!(!intent.is_refundable());
    }

    #[test]
    fn balance_lookup_sums_matching_currency() {
        let balance = Balance {
            available: vec![
                BalanceEntry { amount: 1000, currency: "eur".into() },
                BalanceEntry { amount: 250, currency: "EUR".into() },
                BalanceEntry { amount: 9999, currency: "usd".into() },
            ],
            pending: vec![],
        };
        assert_eq!(balance.available_in("eur"), 1250);
        assert_eq!(balance.available_in("gbp"), 0);
    }

    #[test]
    fn interval_roundtrip() {
        for interval in &[
            PayoutInterval::Daily,
            PayoutInterval::Weekly,
            PayoutInterval::Monthly,
            PayoutInterval::Manual,
        ] {
            assert_eq!(
                PayoutInterval::from_str(interval.as_str()).as_ref(),
                Some(interval)
            );
        }
        assert!(PayoutInterval::from_str("hourly").is_none());
    }
}
