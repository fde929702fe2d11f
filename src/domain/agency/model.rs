//! Agency domain entity

use chrono::{DateTime, Utc};

/// A tour agency tenant with its provider sub-account linkage and
/// platform fee configuration.
#[derive(Debug, Clone)]
pub struct Agency {
    /// Unique agency ID (0 until persisted)
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Provider connected-account ID; absent until onboarding completes
    pub connected_account_id: Option<String>,
    /// Platform commission in basis points (250 = 2.5%)
    pub commission_bps: i32,
    /// Flat processor fee retained per refund, in minor currency units
    pub processor_fee: i64,
    /// Provider-reported: account can accept charges
    pub charges_enabled: bool,
    /// Provider-reported: account can receive payouts
    pub payouts_enabled: bool,
    /// Account completed platform authorization
    pub authorized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agency {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            connected_account_id: None,
            commission_bps: 0,
            processor_fee: 0,
            charges_enabled: false,
            payouts_enabled: false,
            authorized: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Commission retained on a gross amount, rounded down.
    pub fn commission_on(&self, gross: i64) -> i64 {
        gross * self.commission_bps as i64 / 10_000
    }

    /// Default refund amount for a gross payment: the gross minus the
    /// platform commission and the flat processor fee. The platform's
    /// own cut is never returned through the agency balance.
    pub fn net_refund(&self, gross: i64) -> i64 {
        gross - self.commission_on(gross) - self.processor_fee
    }

    /// Apply provider-reported capability flags from an account event.
    pub fn sync_capabilities(&mut self, charges_enabled: bool, payouts_enabled: bool) {
        self.charges_enabled = charges_enabled;
        self.payouts_enabled = payouts_enabled;
        self.updated_at = Utc::now();
    }

    /// Flip platform authorization. Deauthorization also clears the
    /// capability flags; they are stale once access is gone.
    pub fn set_authorized(&mut self, authorized: bool) {
        self.authorized = authorized;
        if !authorized {
            self.charges_enabled = false;
            self.payouts_enabled = false;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agency() -> Agency {
        let mut a = Agency::new("Vistamar Tours", "ops@vistamar.example");
        a.connected_account_id = Some("acct_test_1".into());
        a.commission_bps = 250;
        a.processor_fee = 35;
        a
    }

    #[test]
    fn commission_rounds_down() {
        let a = sample_agency();
        // 2.5% of 9999 = 249.975
        assert_eq!(a.commission_on(9_999), 249);
        assert_eq!(a.commission_on(10_000), 250);
    }

    #[test]
    fn net_refund_subtracts_commission_and_fee() {
        let a = sample_agency();
        assert_eq!(a.net_refund(10_000), 10_000 - 250 - 35);
    }

    #[test]
    fn zero_fee_agency_refunds_gross() {
        let a = Agency::new("Playa Azul", "hola@playaazul.example");
        assert_eq!(a.net_refund(10_000), 10_000);
    }

    #[test]
    fn capability_sync_updates_flags() {
        let mut a = sample_agency();
        a.sync_capabilities(true, true);
        assert!(a.charges_enabled);
        assert!(a.payouts_enabled);
    }

    #[test]
    fn deauthorization_clears_capabilities() {
        let mut a = sample_agency();
        a.sync_capabilities(true, true);
        a.set_authorized(false);
        assert!(!a.authorized);
        assert!(!a.charges_enabled);
        assert!(!a.payouts_enabled);
    }
}
