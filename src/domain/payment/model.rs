//! Payment and refund domain entities

use chrono::{DateTime, Utc};

/// Provider-reported external statuses that count as paid.
pub const PAID_EXTERNAL_STATUSES: [&str; 3] = ["paid", "succeeded", "no_payment_required"];

/// Internal payment state, derived from the provider's external status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Succeeded,
    Pending,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "succeeded" => Self::Succeeded,
            "pending" => Self::Pending,
            _ => Self::Failed,
        }
    }

    /// Map a provider-reported status string to the internal state.
    pub fn from_external(external: &str) -> Self {
        if PAID_EXTERNAL_STATUSES.contains(&external) {
            Self::Succeeded
        } else if external == "unpaid" || external == "pending" || external == "processing" {
            Self::Pending
        } else {
            Self::Failed
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One provider payment attempt against a reservation.
///
/// Rows are never deleted; retried checkouts produce additional rows
/// and the most recent paid one is authoritative for refunds.
#[derive(Debug, Clone)]
pub struct Payment {
    /// Unique payment ID (0 until persisted)
    pub id: i32,
    pub reservation_id: i32,
    /// Provider checkout session ID
    pub session_id: String,
    /// Provider payment intent ID
    pub payment_intent_id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Raw provider-reported status string
    pub external_status: String,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        reservation_id: i32,
        session_id: impl Into<String>,
        payment_intent_id: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        external_status: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let external_status = external_status.into();
        Self {
            id: 0,
            reservation_id,
            session_id: session_id.into(),
            payment_intent_id: payment_intent_id.into(),
            amount,
            currency: currency.into(),
            status: PaymentStatus::from_external(&external_status),
            external_status,
            receipt_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the provider reported this payment as settled.
    pub fn is_paid(&self) -> bool {
        PAID_EXTERNAL_STATUSES.contains(&self.external_status.as_str())
    }

    /// Apply a newer provider-reported status.
    pub fn reconcile_external(&mut self, external_status: impl Into<String>) {
        self.external_status = external_status.into();
        self.status = PaymentStatus::from_external(&self.external_status);
        self.updated_at = Utc::now();
    }
}

/// The refund-authoritative payment among a reservation's rows: the
/// most recently created one with a paid external status.
pub fn authoritative_payment(payments: &[Payment]) -> Option<&Payment> {
    payments
        .iter()
        .filter(|p| p.is_paid())
        .max_by_key(|p| p.created_at)
}

// ── Refunds ────────────────────────────────────────────────────

/// A provider refund issued against a reservation's payment.
///
/// Inserted only after the provider accepted the refund; the
/// per-reservation sum of `amount` never exceeds the authoritative
/// payment amount.
#[derive(Debug, Clone)]
pub struct Refund {
    /// Unique refund ID (0 until persisted)
    pub id: i32,
    pub reservation_id: i32,
    pub payment_id: i32,
    /// Provider-assigned refund ID
    pub provider_refund_id: String,
    /// Refunded amount in minor currency units
    pub amount: i64,
    /// Provider-reported refund status
    pub status: String,
    /// Operator who authorized the refund
    pub authorized_by: String,
    /// Whether the transfer-reversal fallback path was taken
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Refund {
    pub fn new(
        reservation_id: i32,
        payment_id: i32,
        provider_refund_id: impl Into<String>,
        amount: i64,
        status: impl Into<String>,
        authorized_by: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            reservation_id,
            payment_id,
            provider_refund_id: provider_refund_id.into(),
            amount,
            status: status.into(),
            authorized_by: authorized_by.into(),
            fallback_used: false,
            fallback_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_fallback(mut self, reason: impl Into<String>) -> Self {
        self.fallback_used = true;
        self.fallback_reason = Some(reason.into());
        self
    }
}

/// Total already refunded across a reservation's refund rows.
pub fn refunded_total(refunds: &[Refund]) -> i64 {
    refunds.iter().map(|r| r.amount).sum()
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_payment(external: &str) -> Payment {
        Payment::new(1, "cs_test_1", "pi_test_1", 12000, "eur", external)
    }

    #[test]
    fn paid_statuses_are_recognized() {
        for s in PAID_EXTERNAL_STATUSES {
            assert!(sample_payment(s).is_paid(), "{s} should count as paid");
        }
        assert!(!sample_payment("unpaid").is_paid());
        assert!(!sample_payment("requires_payment_method").is_paid());
    }

    #[test]
    fn external_status_drives_internal_state() {
        assert_eq!(
            sample_payment("paid").status,
            PaymentStatus::Succeeded
        );
        assert_eq!(
            sample_payment("unpaid").status,
            PaymentStatus::Pending
        );
        assert_eq!(
            sample_payment("canceled").status,
            PaymentStatus::Failed
        );
    }

    #[test]
    fn reconcile_updates_both_statuses() {
        let mut p = sample_payment("unpaid");
        p.reconcile_external("paid");
        assert_eq!(p.status, PaymentStatus::Succeeded);
        assert_eq!(p.external_status, "paid");
    }

    #[test]
    fn latest_paid_row_is_authoritative() {
        let mut first = sample_payment("paid");
        first.created_at = Utc::now() - Duration::minutes(10);
        let mut retry = sample_payment("paid");
        retry.session_id = "cs_test_2".into();
        let unpaid = sample_payment("unpaid");

        let rows = vec![first, retry.clone(), unpaid];
        let auth = authoritative_payment(&rows).unwrap();
        assert_eq!(auth.session_id, retry.session_id);
    }

    #[test]
    fn no_paid_row_means_no_authority() {
        let rows = vec![sample_payment("unpaid"), sample_payment("canceled")];
        assert!(authoritative_payment(&rows).is_none());
    }

    #[test]
    fn refund_totals_accumulate() {
        let refunds = vec![
            Refund::new(1, 1, "re_1", 4000, "succeeded", "ops@vistamar"),
            Refund::new(1, 1, "re_2", 2500, "succeeded", "ops@vistamar"),
        ];
        assert_eq!(refunded_total(&refunds), 6500);
    }

    #[test]
    fn fallback_marker_carries_reason() {
        let r = Refund::new(1, 1, "re_3", 1000, "succeeded", "ops@vistamar")
            .with_fallback("insufficient funds on transfer reversal");
        assert!(r.fallback_used);
        assert!(r.fallback_reason.unwrap().contains("reversal"));
    }
}
