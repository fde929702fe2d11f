//! Payout visibility and manual payouts
//!
//! Balances live at the provider in per-currency buckets; this module
//! aggregates them for display, converts them into the platform's
//! primary currency with a static rate table, and drives manual
//! payouts for agencies that switched their schedule to `manual`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::application::ports::gateway::{
    GatewayError, PaymentGateway, PayoutInterval, PayoutReceipt, PayoutRequest, PayoutSchedule,
};
use crate::config::PayoutConfig;
use crate::domain::{Agency, DomainError, DomainResult, RepositoryProvider};

/// One currency's balance, both settlement states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyBalance {
    pub currency: String,
    pub available: i64,
    pub pending: i64,
}

impl CurrencyBalance {
    pub fn total(&self) -> i64 {
        self.available + self.pending
    }
}

/// The payout picture for one agency: provider capabilities, the
/// active schedule, raw per-currency balances and the converted
/// totals in the primary display currency.
#[derive(Debug, Clone)]
pub struct PayoutInfo {
    pub agency_id: i32,
    pub connected_account_id: String,
    pub payouts_enabled: bool,
    pub external_account_count: u32,
    pub schedule: PayoutSchedule,
    pub balances: Vec<CurrencyBalance>,
    pub primary_currency: String,
    pub total_available_primary: i64,
    pub total_pending_primary: i64,
}

pub struct PayoutService {
    repos: Arc<dyn RepositoryProvider>,
    gateway: Arc<dyn PaymentGateway>,
    primary_currency: String,
    fx_rates: HashMap<String, f64>,
}

impl PayoutService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<dyn PaymentGateway>,
        config: &PayoutConfig,
    ) -> Self {
        Self {
            repos,
            gateway,
            primary_currency: config.primary_currency.to_lowercase(),
            fx_rates: config.fx_rates.clone(),
        }
    }

    /// Aggregate the provider balance and account state for display.
    pub async fn payout_info(&self, agency_id: i32) -> DomainResult<PayoutInfo> {
        let (_, account_id) = self.connected_agency(agency_id).await?;
        let account = self.gateway.retrieve_account(&account_id).await?;
        let balance = self.gateway.retrieve_balance(&account_id).await?;

        let mut buckets: BTreeMap<String, CurrencyBalance> = BTreeMap::new();
        for entry in &balance.available {
            bucket(&mut buckets, &entry.currency).available += entry.amount;
        }
        for entry in &balance.pending {
            bucket(&mut buckets, &entry.currency).pending += entry.amount;
        }

        let mut total_available = Decimal::ZERO;
        let mut total_pending = Decimal::ZERO;
        for b in buckets.values() {
            let Some(rate) = self.rate_for(&b.currency) else {
                warn!(
                    agency_id,
                    currency = %b.currency,
                    "No conversion rate configured, excluding from primary totals"
                );
                continue;
            };
            total_available += Decimal::from(b.available) * rate;
            total_pending += Decimal::from(b.pending) * rate;
        }

        Ok(PayoutInfo {
            agency_id,
            connected_account_id: account_id,
            payouts_enabled: account.payouts_enabled,
            external_account_count: account.external_account_count,
            schedule: account.payout_schedule,
            balances: buckets.into_values().collect(),
            primary_currency: self.primary_currency.clone(),
            total_available_primary: total_available.round().to_i64().unwrap_or(0),
            total_pending_primary: total_pending.round().to_i64().unwrap_or(0),
        })
    }

    /// Push a manual payout to the agency's bank. Only valid while the
    /// account's payout schedule is `manual`.
    pub async fn create_manual_payout(
        &self,
        agency_id: i32,
        amount: i64,
        currency: &str,
    ) -> DomainResult<PayoutReceipt> {
        if amount <= 0 {
            return Err(DomainError::Validation(
                "payout amount must be positive".into(),
            ));
        }
        let currency = currency.to_lowercase();
        let (_, account_id) = self.connected_agency(agency_id).await?;
        let account = self.gateway.retrieve_account(&account_id).await?;

        if !account.payout_schedule.is_manual() {
            return Err(DomainError::ScheduleNotManual {
                current: account.payout_schedule.interval.to_string(),
            });
        }
        if !account.payouts_enabled {
            return Err(DomainError::PayoutsDisabled);
        }
        if account.external_account_count == 0 {
            return Err(DomainError::NoExternalBankAccount);
        }

        let balance = self.gateway.retrieve_balance(&account_id).await?;
        let available = balance.available_in(&currency);
        if available < amount {
            return Err(DomainError::InsufficientBalance {
                currency,
                available,
                requested: amount,
            });
        }

        let bucket = Utc::now().timestamp() / 60;
        let request = PayoutRequest {
            amount,
            currency: currency.clone(),
            metadata: HashMap::from([("agency_id".to_string(), agency_id.to_string())]),
            connected_account_id: account_id,
            idempotency_key: format!("payout-{agency_id}-{bucket}"),
        };
        let receipt = self.gateway.create_payout(request).await?;

        info!(
            agency_id,
            amount,
            currency = %currency,
            payout_id = %receipt.id,
            status = %receipt.status,
            "Manual payout created"
        );
        metrics::counter!("payouts_created_total").increment(1);
        Ok(receipt)
    }

    /// Change the account's payout schedule at the provider. Anchors
    /// are validated locally first so the common mistakes never leave
    /// the process.
    pub async fn update_payout_schedule(
        &self,
        agency_id: i32,
        schedule: PayoutSchedule,
    ) -> DomainResult<PayoutSchedule> {
        validate_schedule(&schedule)?;
        let (_, account_id) = self.connected_agency(agency_id).await?;

        match self
            .gateway
            .update_payout_schedule(&account_id, schedule.clone())
            .await
        {
            Ok(()) => {
                info!(
                    agency_id,
                    interval = %schedule.interval,
                    "Payout schedule updated"
                );
                Ok(schedule)
            }
            Err(GatewayError::Api { code, message }) => {
                warn!(agency_id, code = %code, message = %message, "Provider rejected schedule update");
                Err(DomainError::InvalidSchedule(translate_schedule_rejection(
                    &code,
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn connected_agency(&self, agency_id: i32) -> DomainResult<(Agency, String)> {
        let agency = self
            .repos
            .agencies()
            .find_by_id(agency_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "agency".into(),
                field: "id".into(),
                value: agency_id.to_string(),
            })?;
        let Some(account_id) = agency.connected_account_id.clone() else {
            return Err(DomainError::MissingConnectedAccount { agency_id });
        };
        Ok((agency, account_id))
    }

    /// Conversion rate into the primary currency, if known.
    fn rate_for(&self, currency: &str) -> Option<Decimal> {
        if currency == self.primary_currency {
            return Some(Decimal::ONE);
        }
        self.fx_rates
            .get(currency)
            .copied()
            .and_then(Decimal::from_f64)
    }
}

fn bucket<'a>(
    buckets: &'a mut BTreeMap<String, CurrencyBalance>,
    currency: &str,
) -> &'a mut CurrencyBalance {
    let key = currency.to_lowercase();
    buckets.entry(key.clone()).or_insert_with(|| CurrencyBalance {
        currency: key,
        available: 0,
        pending: 0,
    })
}

fn validate_schedule(schedule: &PayoutSchedule) -> DomainResult<()> {
    const WEEKDAYS: [&str; 7] = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];

    match schedule.interval {
        PayoutInterval::Weekly => {
            let anchor = schedule.weekly_anchor.as_deref().unwrap_or_default();
            if !WEEKDAYS.contains(&anchor) {
                return Err(DomainError::InvalidSchedule(
                    "weekly schedules need a weekday anchor".into(),
                ));
            }
        }
        PayoutInterval::Monthly => match schedule.monthly_anchor {
            Some(day) if (1..=31).contains(&day) => {}
            _ => {
                return Err(DomainError::InvalidSchedule(
                    "monthly schedules need a day of month between 1 and 31".into(),
                ));
            }
        },
        PayoutInterval::Daily | PayoutInterval::Manual => {}
    }
    Ok(())
}

/// Collapse provider error codes into the handful of messages the
/// dashboard shows agencies.
fn translate_schedule_rejection(code: &str) -> String {
    match code {
        "account_invalid" => "the connected account is not active".into(),
        "payouts_not_allowed" => "payouts are not enabled for this account".into(),
        _ => "the provider rejected the schedule change".into(),
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use crate::application::ports::gateway::{Balance, BalanceEntry, ConnectedAccount};
    use crate::infrastructure::gateway::MockGateway;
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;

    fn payout_config() -> PayoutConfig {
        PayoutConfig {
            primary_currency: "eur".into(),
            fx_rates: HashMap::from([("usd".to_string(), 0.9)]),
        }
    }

    fn manual_account() -> ConnectedAccount {
        ConnectedAccount {
            id: "acct_1".into(),
            payouts_enabled: true,
            charges_enabled: true,
            payout_schedule: PayoutSchedule::manual(),
            external_account_count: 1,
        }
    }

    fn rich_balance() -> Balance {
        Balance {
            available: vec![
                BalanceEntry { amount: 50_000, currency: "eur".into() },
                BalanceEntry { amount: 10_000, currency: "usd".into() },
            ],
            pending: vec![BalanceEntry { amount: 2_000, currency: "eur".into() }],
        }
    }

    async fn fixture(gateway: MockGateway) -> (Arc<MockGateway>, PayoutService) {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let mut agency = Agency::new("Vistamar Tours", "ops@vistamar.example");
        agency.connected_account_id = Some("acct_1".into());
        repos.agencies().save(agency).await.unwrap();

        let gateway = Arc::new(gateway);
        let service = PayoutService::new(repos, gateway.clone(), &payout_config());
        (gateway, service)
    }

    #[tokio::test]
    async fn payout_info_aggregates_and_converts() {
        let (_, service) = fixture(
            MockGateway::new()
                .with_account(manual_account())
                .with_balance("acct_1", rich_balance()),
        )
        .await;

        let info = service.payout_info(1).await.unwrap();
        assert_eq!(info.connected_account_id, "acct_1");
        assert!(info.payouts_enabled);
        assert_eq!(info.external_account_count, 1);
        assert!(info.schedule.is_manual());

        assert_eq!(
            info.balances,
            vec![
                CurrencyBalance { currency: "eur".into(), available: 50_000, pending: 2_000 },
                CurrencyBalance { currency: "usd".into(), available: 10_000, pending: 0 },
            ]
        );
        // 50_000 eur + 10_000 usd at 0.9
        assert_eq!(info.total_available_primary, 59_000);
        assert_eq!(info.total_pending_primary, 2_000);
    }

    #[tokio::test]
    async fn currencies_without_a_rate_stay_out_of_the_totals() {
        let mut balance = rich_balance();
        balance.available.push(BalanceEntry { amount: 7_000, currency: "gbp".into() });
        let (_, service) = fixture(
            MockGateway::new()
                .with_account(manual_account())
                .with_balance("acct_1", balance),
        )
        .await;

        let info = service.payout_info(1).await.unwrap();
        assert!(info.balances.iter().any(|b| b.currency == "gbp"));
        assert_eq!(info.total_available_primary, 59_000);
    }

    #[tokio::test]
    async fn manual_payout_reaches_the_provider() {
        let (gateway, service) = fixture(
            MockGateway::new()
                .with_account(manual_account())
                .with_balance("acct_1", rich_balance()),
        )
        .await;

        let receipt = service.create_manual_payout(1, 10_000, "EUR").await.unwrap();
        assert_eq!(receipt.id, "po_mock_1");

        let calls = gateway.payout_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].amount, 10_000);
        assert_eq!(calls[0].currency, "eur");
        assert_eq!(calls[0].connected_account_id, "acct_1");
        assert!(calls[0].idempotency_key.starts_with("payout-1-"));
        assert_eq!(calls[0].metadata.get("agency_id").unwrap(), "1");
    }

    #[tokio::test]
    async fn manual_payout_requires_a_manual_schedule() {
        let mut account = manual_account();
        account.payout_schedule = PayoutSchedule {
            interval: PayoutInterval::Daily,
            weekly_anchor: None,
            monthly_anchor: None,
        };
        let (gateway, service) = fixture(
            MockGateway::new()
                .with_account(account)
                .with_balance("acct_1", rich_balance()),
        )
        .await;

        let err = service.create_manual_payout(1, 10_000, "eur").await.unwrap_err();
        assert!(matches!(err, DomainError::ScheduleNotManual { ref current } if current == "daily"));
        assert!(gateway.payout_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_payout_requires_payouts_enabled() {
        let mut account = manual_account();
        account.payouts_enabled = false;
        let (_, service) = fixture(
            MockGateway::new()
                .with_account(account)
                .with_balance("acct_1", rich_balance()),
        )
        .await;

        let err = service.create_manual_payout(1, 10_000, "eur").await.unwrap_err();
        assert!(matches!(err, DomainError::PayoutsDisabled));
    }

    #[tokio::test]
    async fn manual_payout_requires_an_external_account() {
        let mut account = manual_account();
        account.external_account_count = 0;
        let (_, service) = fixture(
            MockGateway::new()
                .with_account(account)
                .with_balance("acct_1", rich_balance()),
        )
        .await;

        let err = service.create_manual_payout(1, 10_000, "eur").await.unwrap_err();
        assert!(matches!(err, DomainError::NoExternalBankAccount));
    }

    #[tokio::test]
    async fn manual_payout_cannot_exceed_available_balance() {
        let (gateway, service) = fixture(
            MockGateway::new()
                .with_account(manual_account())
                .with_balance("acct_1", rich_balance()),
        )
        .await;

        let err = service.create_manual_payout(1, 60_000, "eur").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientBalance { available: 50_000, requested: 60_000, .. }
        ));
        assert!(gateway.payout_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weekly_schedule_needs_a_weekday_anchor() {
        let (gateway, service) = fixture(MockGateway::new().with_account(manual_account())).await;

        let err = service
            .update_payout_schedule(
                1,
                PayoutSchedule {
                    interval: PayoutInterval::Weekly,
                    weekly_anchor: None,
                    monthly_anchor: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSchedule(_)));
        assert!(gateway.schedule_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn monthly_anchor_must_be_a_real_day() {
        let (_, service) = fixture(MockGateway::new().with_account(manual_account())).await;

        let err = service
            .update_payout_schedule(
                1,
                PayoutSchedule {
                    interval: PayoutInterval::Monthly,
                    weekly_anchor: None,
                    monthly_anchor: Some(40),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSchedule(_)));
    }

    #[tokio::test]
    async fn schedule_update_reaches_the_provider() {
        let (gateway, service) = fixture(MockGateway::new().with_account(manual_account())).await;

        let schedule = PayoutSchedule {
            interval: PayoutInterval::Weekly,
            weekly_anchor: Some("friday".into()),
            monthly_anchor: None,
        };
        let updated = service.update_payout_schedule(1, schedule.clone()).await.unwrap();
        assert_eq!(updated, schedule);

        let calls = gateway.schedule_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "acct_1");
        assert_eq!(calls[0].1, schedule);
    }

    #[tokio::test]
    async fn provider_rejection_becomes_a_fixed_message() {
        let (gateway, service) = fixture(MockGateway::new().with_account(manual_account())).await;
        *gateway.schedule_error_code.lock().unwrap() = Some("account_invalid".into());

        let err = service
            .update_payout_schedule(
                1,
                PayoutSchedule {
                    interval: PayoutInterval::Monthly,
                    weekly_anchor: None,
                    monthly_anchor: Some(15),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidSchedule(ref msg) if msg == "the connected account is not active"
        ));
    }

    #[tokio::test]
    async fn agency_without_account_cannot_see_payouts() {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .agencies()
            .save(Agency::new("Vistamar Tours", "ops@vistamar.example"))
            .await
            .unwrap();
        let service =
            PayoutService::new(repos, Arc::new(MockGateway::new()), &payout_config());

        let err = service.payout_info(1).await.unwrap_err();
        assert!(matches!(err, DomainError::MissingConnectedAccount { agency_id: 1 }));
    }
}
