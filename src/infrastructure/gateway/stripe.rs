//! Stripe-backed implementation of the payment gateway port
//!
//! Thin REST client over the provider's form-encoded API. Connected
//! accounts are addressed with the `Stripe-Account` header; mutating
//! calls carry the caller's `Idempotency-Key`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::gateway::{
    Balance, BalanceEntry, CheckoutSession, ConnectedAccount, GatewayError, PaymentGateway,
    PaymentIntent, PayoutInterval, PayoutReceipt, PayoutRequest, PayoutSchedule, RefundReceipt,
    RefundRequest,
};
use crate::config::ProviderConfig;

const DEFAULT_TIMEOUT_MS: u64 = 15_000;

pub struct StripeGateway {
    http: Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(config: &ProviderConfig) -> Result<Self, GatewayError> {
        let timeout_ms = if config.timeout_ms > 0 {
            config.timeout_ms
        } else {
            DEFAULT_TIMEOUT_MS
        };
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn get_json(
        &self,
        path: &str,
        account: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, GatewayError> {
        let mut request = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .query(query);
        if let Some(account) = account {
            request = request.header("Stripe-Account", account);
        }

        let response = request.send().await.map_err(map_transport)?;
        decode_response(response).await
    }

    async fn post_form(
        &self,
        path: &str,
        account: Option<&str>,
        idempotency_key: Option<&str>,
        form: &[(String, String)],
    ) -> Result<serde_json::Value, GatewayError> {
        let mut request = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form);
        if let Some(account) = account {
            request = request.header("Stripe-Account", account);
        }
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await.map_err(map_transport)?;
        decode_response(response).await
    }
}

fn map_transport(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

async fn decode_response(response: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    let code = body["error"]["code"].as_str().unwrap_or("unknown").to_string();
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or("provider request failed")
        .to_string();
    debug!(status = status.as_u16(), code, "Provider rejected request");
    Err(GatewayError::Api { code, message })
}

/// Whether a provider rejection is about transfer-reversal
/// constraints, which is the one condition the refund fallback
/// retries without reversal.
fn is_reversal_rejection(code: &str, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    code == "transfer_reversal_balance_insufficient"
        || message.contains("reverse_transfer")
        || message.contains("reversal")
}

// ── Response payloads ──────────────────────────────────────────

#[derive(Deserialize)]
struct IntentPayload {
    id: String,
    status: String,
    amount: i64,
    currency: String,
    latest_charge: Option<String>,
}

#[derive(Deserialize)]
struct SessionPayload {
    id: String,
    payment_intent: Option<String>,
    payment_status: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<SessionPayload> for CheckoutSession {
    fn from(p: SessionPayload) -> Self {
        CheckoutSession {
            id: p.id,
            payment_intent: p.payment_intent,
            payment_status: p.payment_status,
            status: p.status.unwrap_or_default(),
            amount_total: p.amount_total.unwrap_or_default(),
            currency: p.currency.unwrap_or_default(),
            metadata: p.metadata,
        }
    }
}

#[derive(Deserialize)]
struct ListPayload<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct BalanceEntryPayload {
    amount: i64,
    currency: String,
}

#[derive(Deserialize)]
struct BalancePayload {
    #[serde(default)]
    available: Vec<BalanceEntryPayload>,
    #[serde(default)]
    pending: Vec<BalanceEntryPayload>,
}

#[derive(Deserialize)]
struct RefundPayload {
    id: String,
    amount: i64,
    status: String,
}

#[derive(Deserialize)]
struct PayoutPayload {
    id: String,
    status: String,
    #[serde(default)]
    arrival_date: Option<i64>,
}

#[derive(Deserialize)]
struct SchedulePayload {
    #[serde(default)]
    interval: String,
    #[serde(default)]
    weekly_anchor: Option<String>,
    #[serde(default)]
    monthly_anchor: Option<u8>,
}

#[derive(Deserialize)]
struct AccountPayload {
    id: String,
    #[serde(default)]
    payouts_enabled: bool,
    #[serde(default)]
    charges_enabled: bool,
    #[serde(default)]
    settings: Option<AccountSettingsPayload>,
    #[serde(default)]
    external_accounts: Option<ExternalAccountsPayload>,
}

#[derive(Deserialize)]
struct AccountSettingsPayload {
    #[serde(default)]
    payouts: Option<PayoutSettingsPayload>,
}

#[derive(Deserialize)]
struct PayoutSettingsPayload {
    #[serde(default)]
    schedule: Option<SchedulePayload>,
}

#[derive(Deserialize)]
struct ExternalAccountsPayload {
    #[serde(default)]
    total_count: u32,
}

fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, GatewayError> {
    serde_json::from_value(value)
        .map_err(|e| GatewayError::Transport(format!("unexpected provider payload: {e}")))
}

// ── PaymentGateway impl ────────────────────────────────────────

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let body = self
            .get_json(&format!("/payment_intents/{id}"), None, &[])
            .await?;
        let payload: IntentPayload = parse(body)?;
        Ok(PaymentIntent {
            id: payload.id,
            status: payload.status,
            amount: payload.amount,
            currency: payload.currency,
            latest_charge: payload.latest_charge,
        })
    }

    async fn list_checkout_sessions(
        &self,
        payment_intent: &str,
    ) -> Result<Vec<CheckoutSession>, GatewayError> {
        let body = self
            .get_json("/checkout/sessions", None, &[("payment_intent", payment_intent)])
            .await?;
        let payload: ListPayload<SessionPayload> = parse(body)?;
        Ok(payload.data.into_iter().map(CheckoutSession::from).collect())
    }

    async fn create_refund(
        &self,
        request: RefundRequest,
    ) -> Result<RefundReceipt, GatewayError> {
        let form = vec![
            ("payment_intent".to_string(), request.payment_intent_id.clone()),
            ("amount".to_string(), request.amount.to_string()),
            (
                "reverse_transfer".to_string(),
                request.reverse_transfer.to_string(),
            ),
        ];

        let result = self
            .post_form(
                "/refunds",
                Some(&request.connected_account_id),
                Some(&request.idempotency_key),
                &form,
            )
            .await;

        match result {
            Ok(body) => {
                let payload: RefundPayload = parse(body)?;
                Ok(RefundReceipt {
                    id: payload.id,
                    amount: payload.amount,
                    status: payload.status,
                })
            }
            Err(GatewayError::Api { code, message })
                if request.reverse_transfer && is_reversal_rejection(&code, &message) =>
            {
                Err(GatewayError::TransferReversal { message })
            }
            Err(e) => Err(e),
        }
    }

    async fn retrieve_balance(
        &self,
        connected_account_id: &str,
    ) -> Result<Balance, GatewayError> {
        let body = self
            .get_json("/balance", Some(connected_account_id), &[])
            .await?;
        let payload: BalancePayload = parse(body)?;
        Ok(Balance {
            available: payload
                .available
                .into_iter()
                .map(|e| BalanceEntry { amount: e.amount, currency: e.currency })
                .collect(),
            pending: payload
                .pending
                .into_iter()
                .map(|e| BalanceEntry { amount: e.amount, currency: e.currency })
                .collect(),
        })
    }

    async fn create_payout(
        &self,
        request: PayoutRequest,
    ) -> Result<PayoutReceipt, GatewayError> {
        let mut form = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
        ];
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        let body = self
            .post_form(
                "/payouts",
                Some(&request.connected_account_id),
                Some(&request.idempotency_key),
                &form,
            )
            .await?;
        let payload: PayoutPayload = parse(body)?;
        Ok(PayoutReceipt {
            id: payload.id,
            status: payload.status,
            arrival_date: payload.arrival_date,
        })
    }

    async fn retrieve_account(&self, id: &str) -> Result<ConnectedAccount, GatewayError> {
        let body = self.get_json(&format!("/accounts/{id}"), None, &[]).await?;
        let payload: AccountPayload = parse(body)?;

        let schedule = payload
            .settings
            .and_then(|s| s.payouts)
            .and_then(|p| p.schedule)
            .map(|s| PayoutSchedule {
                interval: PayoutInterval::from_str(&s.interval)
                    .unwrap_or(PayoutInterval::Manual),
                weekly_anchor: s.weekly_anchor,
                monthly_anchor: s.monthly_anchor,
            })
            .unwrap_or_else(PayoutSchedule::manual);

        Ok(ConnectedAccount {
            id: payload.id,
            payouts_enabled: payload.payouts_enabled,
            charges_enabled: payload.charges_enabled,
            payout_schedule: schedule,
            external_account_count: payload
                .external_accounts
                .map(|e| e.total_count)
                .unwrap_or_default(),
        })
    }

    async fn update_payout_schedule(
        &self,
        account_id: &str,
        schedule: PayoutSchedule,
    ) -> Result<(), GatewayError> {
        let mut form = vec![(
            "settings[payouts][schedule][interval]".to_string(),
            schedule.interval.as_str().to_string(),
        )];
        if let Some(anchor) = schedule.weekly_anchor {
            form.push(("settings[payouts][schedule][weekly_anchor]".to_string(), anchor));
        }
        if let Some(anchor) = schedule.monthly_anchor {
            form.push((
                "settings[payouts][schedule][monthly_anchor]".to_string(),
                anchor.to_string(),
            ));
        }

        self.post_form(&format!("/accounts/{account_id}"), None, None, &form)
            .await?;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversal_rejections_are_detected() {
        assert!(is_reversal_rejection(
            "transfer_reversal_balance_insufficient",
            "not enough funds"
        ));
        assert!(is_reversal_rejection(
            "invalid_request_error",
            "The transfer reversal could not be completed"
        ));
        assert!(!is_reversal_rejection(
            "charge_already_refunded",
            "Charge ch_1 has already been refunded"
        ));
    }

    #[test]
    fn session_payload_fills_defaults() {
        let session: SessionPayload = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_intent": "pi_1",
            "payment_status": "paid"
        }))
        .unwrap();
        let session = CheckoutSession::from(session);
        assert_eq!(session.id, "cs_1");
        assert_eq!(session.amount_total, 0);
        assert!(session.metadata.is_empty());
    }

    #[test]
    fn account_payload_defaults_to_manual_schedule() {
        let payload: AccountPayload = serde_json::from_value(serde_json::json!({
            "id": "acct_1",
            "payouts_enabled": true
        }))
        .unwrap();
        assert!(payload.settings.is_none());
        assert!(!payload.charges_enabled);
    }
}
