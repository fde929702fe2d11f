//! Scriptable in-process payment gateway
//!
//! Stands in for the provider in development and tests: state is
//! seeded up front, every mutating call is recorded, and failure
//! modes (reversal rejection, forced errors) can be switched on per
//! scenario.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::gateway::{
    Balance, CheckoutSession, ConnectedAccount, GatewayError, PaymentGateway, PaymentIntent,
    PayoutReceipt, PayoutRequest, PayoutSchedule, RefundReceipt, RefundRequest,
};

#[derive(Default)]
pub struct MockGateway {
    intents: DashMap<String, PaymentIntent>,
    sessions: DashMap<String, Vec<CheckoutSession>>,
    balances: DashMap<String, Balance>,
    accounts: DashMap<String, ConnectedAccount>,
    pub refund_calls: Mutex<Vec<RefundRequest>>,
    pub payout_calls: Mutex<Vec<PayoutRequest>>,
    pub schedule_calls: Mutex<Vec<(String, PayoutSchedule)>>,
    /// When set, refunds with `reverse_transfer` fail with a
    /// transfer-reversal rejection (the fallback trigger)
    pub reject_reversals: AtomicBool,
    /// When set, schedule updates fail with the given provider code
    pub schedule_error_code: Mutex<Option<String>>,
    refund_counter: AtomicU64,
    payout_counter: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intent(self, intent: PaymentIntent) -> Self {
        self.intents.insert(intent.id.clone(), intent);
        self
    }

    /// Seed the sessions returned for a payment intent, newest first.
    pub fn with_sessions(self, payment_intent: &str, sessions: Vec<CheckoutSession>) -> Self {
        self.sessions.insert(payment_intent.to_string(), sessions);
        self
    }

    pub fn with_balance(self, account_id: &str, balance: Balance) -> Self {
        self.balances.insert(account_id.to_string(), balance);
        self
    }

    /// Post-construction variants for tests that hold the gateway
    /// behind an `Arc`.
    pub fn insert_intent(&self, intent: PaymentIntent) {
        self.intents.insert(intent.id.clone(), intent);
    }

    pub fn insert_sessions(&self, payment_intent: &str, sessions: Vec<CheckoutSession>) {
        self.sessions.insert(payment_intent.to_string(), sessions);
    }

    pub fn insert_balance(&self, account_id: &str, balance: Balance) {
        self.balances.insert(account_id.to_string(), balance);
    }

    pub fn insert_account(&self, account: ConnectedAccount) {
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn with_account(self, account: ConnectedAccount) -> Self {
        self.accounts.insert(account.id.clone(), account);
        self
    }

    pub fn refund_call_count(&self) -> usize {
        self.refund_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.intents
            .get(id)
            .map(|i| i.clone())
            .ok_or_else(|| GatewayError::Api {
                code: "resource_missing".into(),
                message: format!("No such payment_intent: {id}"),
            })
    }

    async fn list_checkout_sessions(
        &self,
        payment_intent: &str,
    ) -> Result<Vec<CheckoutSession>, GatewayError> {
        Ok(self
            .sessions
            .get(payment_intent)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn create_refund(&self, request: RefundRequest) -> Result<RefundReceipt, GatewayError> {
        self.refund_calls.lock().unwrap().push(request.clone());

        if request.reverse_transfer && self.reject_reversals.load(Ordering::SeqCst) {
            return Err(GatewayError::TransferReversal {
                message: "insufficient funds to reverse the transfer".into(),
            });
        }

        let n = self.refund_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RefundReceipt {
            id: format!("re_mock_{n}"),
            amount: request.amount,
            status: "succeeded".into(),
        })
    }

    async fn retrieve_balance(
        &self,
        connected_account_id: &str,
    ) -> Result<Balance, GatewayError> {
        Ok(self
            .balances
            .get(connected_account_id)
            .map(|b| b.clone())
            .unwrap_or_default())
    }

    async fn create_payout(&self, request: PayoutRequest) -> Result<PayoutReceipt, GatewayError> {
        self.payout_calls.lock().unwrap().push(request.clone());
        let n = self.payout_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PayoutReceipt {
            id: format!("po_mock_{n}"),
            status: "in_transit".into(),
            arrival_date: None,
        })
    }

    async fn retrieve_account(&self, id: &str) -> Result<ConnectedAccount, GatewayError> {
        self.accounts
            .get(id)
            .map(|a| a.clone())
            .ok_or_else(|| GatewayError::Api {
                code: "account_invalid".into(),
                message: format!("No such account: {id}"),
            })
    }

    async fn update_payout_schedule(
        &self,
        account_id: &str,
        schedule: PayoutSchedule,
    ) -> Result<(), GatewayError> {
        if let Some(code) = self.schedule_error_code.lock().unwrap().clone() {
            return Err(GatewayError::Api {
                code,
                message: "schedule update rejected".into(),
            });
        }

        if let Some(mut account) = self.accounts.get_mut(account_id) {
            account.payout_schedule = schedule.clone();
        }
        self.schedule_calls
            .lock()
            .unwrap()
            .push((account_id.to_string(), schedule));
        Ok(())
    }
}
