//! Webhook event dispatcher
//!
//! Applies provider events to local state effectively once: the
//! processed-event ledger deduplicates provider redeliveries, and the
//! ledger row is written only after the handler ran, so a crash
//! mid-processing leaves the event unrecorded and the provider's
//! retry reprocesses it safely.
//!
//! Handlers distinguish expected business conditions (returned as
//! `success: false`, recorded, acknowledged) from genuinely
//! unexpected failures (propagated as errors, not recorded, so the
//! provider retries).

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::events::{
    AccountAuthData, AccountData, CheckoutSessionData, PaymentIntentData, WebhookEvent,
    WebhookEventKind,
};
use crate::application::booking::{ReservationService, SweeperService};
use crate::application::ports::gateway::{CheckoutSession, PaymentGateway};
use crate::domain::{
    DomainError, DomainResult, Payment, ProcessedEvent, RepositoryProvider,
};

/// Structured handler result. `success: false` is an expected
/// condition worth recording, not a failure.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub success: bool,
    pub message: String,
}

impl HandlerOutcome {
    pub fn applied(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }

    fn summary(&self) -> String {
        if self.success {
            format!("ok: {}", self.message)
        } else {
            format!("rejected: {}", self.message)
        }
    }
}

pub struct WebhookDispatcher {
    repos: Arc<dyn RepositoryProvider>,
    gateway: Arc<dyn PaymentGateway>,
    reservations: Arc<ReservationService>,
    sweeper: Arc<SweeperService>,
}

impl WebhookDispatcher {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<dyn PaymentGateway>,
        reservations: Arc<ReservationService>,
        sweeper: Arc<SweeperService>,
    ) -> Self {
        Self {
            repos,
            gateway,
            reservations,
            sweeper,
        }
    }

    /// Apply one event. Replays (same event ID) return success
    /// without side effects.
    pub async fn dispatch(&self, event: WebhookEvent) -> DomainResult<HandlerOutcome> {
        let event_id = event.id.clone();
        let event_type = event.event_type.clone();

        if self.repos.processed_events().find(&event_id).await?.is_some() {
            debug!(event_id = %event_id, event_type = %event_type, "Webhook replay skipped");
            metrics::counter!("webhook_events_total", "type" => event_type, "outcome" => "replay")
                .increment(1);
            return Ok(HandlerOutcome::applied("event already processed"));
        }

        let outcome = match event.kind {
            WebhookEventKind::CheckoutSessionCompleted(data) => {
                self.handle_checkout_completed(data).await?
            }
            WebhookEventKind::PaymentIntentSucceeded(data) => {
                self.handle_intent_succeeded(data).await?
            }
            WebhookEventKind::AccountUpdated(data) => self.handle_account_updated(data).await?,
            WebhookEventKind::AccountAuthorized(data) => {
                self.handle_account_authorization(data, true).await?
            }
            WebhookEventKind::AccountDeauthorized(data) => {
                self.handle_account_authorization(data, false).await?
            }
            WebhookEventKind::Unknown(kind) => {
                HandlerOutcome::applied(format!("ignored event type {kind}"))
            }
        };

        let record = ProcessedEvent::new(&event_id, &event_type, outcome.summary());
        match self.repos.processed_events().record(record).await {
            Ok(()) => {}
            Err(DomainError::Conflict(_)) => {
                // concurrent duplicate delivery won the race
                debug!(event_id = %event_id, "Webhook processed concurrently elsewhere");
                metrics::counter!("webhook_events_total", "type" => event_type, "outcome" => "replay")
                    .increment(1);
                return Ok(HandlerOutcome::applied("event already processed"));
            }
            Err(e) => return Err(e),
        }

        let outcome_label = if outcome.success { "applied" } else { "rejected" };
        if outcome.success {
            info!(
                event_id = %event_id,
                event_type = %event_type,
                message = %outcome.message,
                "Webhook applied"
            );
        } else {
            warn!(
                event_id = %event_id,
                event_type = %event_type,
                message = %outcome.message,
                "Webhook rejected"
            );
        }
        metrics::counter!("webhook_events_total", "type" => event_type, "outcome" => outcome_label)
            .increment(1);

        Ok(outcome)
    }

    /// Confirm the reservation a completed session paid for; resurrect
    /// it first if the sweeper already archived it.
    async fn handle_checkout_completed(
        &self,
        data: CheckoutSessionData,
    ) -> DomainResult<HandlerOutcome> {
        let Some(code) = data.booking_code().map(str::to_string) else {
            return Ok(HandlerOutcome::rejected(
                "session carries no booking_code metadata",
            ));
        };

        let reservation = match self
            .repos
            .reservations()
            .find_by_booking_code(&code)
            .await?
        {
            Some(r) => r,
            None if !data.is_paid() => {
                return Ok(HandlerOutcome::rejected(format!(
                    "no live reservation for {code} and session not paid"
                )));
            }
            None => match self.sweeper.recover(&code).await {
                Ok(r) => r,
                Err(DomainError::NotFound { .. }) => {
                    return Ok(HandlerOutcome::rejected(format!(
                        "unknown booking code {code}"
                    )));
                }
                // capacity conflicts and storage failures stay loud
                Err(e) => return Err(e),
            },
        };

        // idempotent payment upsert keyed by the provider session
        match self.repos.payments().find_by_session(&data.id).await? {
            Some(mut payment) => {
                if payment.external_status != data.payment_status {
                    payment.reconcile_external(&data.payment_status);
                    self.repos.payments().update(&payment).await?;
                }
            }
            None => {
                let payment = Payment::new(
                    reservation.id,
                    &data.id,
                    data.payment_intent.clone().unwrap_or_default(),
                    data.amount_total.unwrap_or(reservation.total_amount),
                    data.currency
                        .clone()
                        .unwrap_or_else(|| reservation.currency.clone()),
                    &data.payment_status,
                );
                self.repos.payments().create(payment).await?;
            }
        }

        if !data.is_paid() {
            return Ok(HandlerOutcome::rejected("payment not yet paid"));
        }

        match self.reservations.confirm(reservation.id).await {
            Ok(_) => Ok(HandlerOutcome::applied(format!(
                "reservation {code} confirmed"
            ))),
            Err(DomainError::InvalidState { .. }) => {
                Ok(HandlerOutcome::rejected("reservation already cancelled"))
            }
            Err(e) => Err(e),
        }
    }

    /// Reconcile a succeeded intent onto its payment row and make sure
    /// the reservation ended up confirmed.
    async fn handle_intent_succeeded(
        &self,
        data: PaymentIntentData,
    ) -> DomainResult<HandlerOutcome> {
        let mut session: Option<CheckoutSession> = None;

        let payment = match self.repos.payments().find_by_intent(&data.id).await? {
            Some(p) => Some(p),
            None => {
                // locate the originating session at the provider
                let sessions = self.gateway.list_checkout_sessions(&data.id).await?;
                match sessions.into_iter().next() {
                    None => {
                        return Ok(HandlerOutcome::rejected(format!(
                            "no checkout session for intent {}",
                            data.id
                        )));
                    }
                    Some(s) => {
                        let p = self.repos.payments().find_by_session(&s.id).await?;
                        session = Some(s);
                        p
                    }
                }
            }
        };

        let Some(mut payment) = payment else {
            // stale or out-of-order delivery; the session event will create the row
            return Ok(HandlerOutcome::rejected("no payment row for intent yet"));
        };

        payment.reconcile_external("succeeded");
        self.repos.payments().update(&payment).await?;

        match self.reservations.confirm(payment.reservation_id).await {
            Ok(r) => Ok(HandlerOutcome::applied(format!(
                "reservation {} confirmed",
                r.booking_code
            ))),
            Err(DomainError::NotFound { .. }) => {
                self.recover_for_intent(&data.id, session).await
            }
            Err(DomainError::InvalidState { .. }) => {
                Ok(HandlerOutcome::rejected("reservation already cancelled"))
            }
            Err(e) => Err(e),
        }
    }

    /// The live row was swept between payment creation and intent
    /// settlement; pull the booking code out of the session metadata
    /// and resurrect the archived reservation.
    async fn recover_for_intent(
        &self,
        intent_id: &str,
        session: Option<CheckoutSession>,
    ) -> DomainResult<HandlerOutcome> {
        let session = match session {
            Some(s) => Some(s),
            None => {
                self.gateway
                    .list_checkout_sessions(intent_id)
                    .await?
                    .into_iter()
                    .next()
            }
        };
        let code = session.and_then(|s| s.metadata.get("booking_code").cloned());

        let Some(code) = code else {
            return Ok(HandlerOutcome::rejected(
                "reservation gone and no booking code to recover",
            ));
        };

        match self.sweeper.recover(&code).await {
            Ok(_) => Ok(HandlerOutcome::applied(format!("booking {code} recovered"))),
            Err(DomainError::NotFound { .. }) => Ok(HandlerOutcome::rejected(format!(
                "no archived booking {code}"
            ))),
            Err(e) => Err(e),
        }
    }

    async fn handle_account_updated(&self, data: AccountData) -> DomainResult<HandlerOutcome> {
        let Some(mut agency) = self
            .repos
            .agencies()
            .find_by_connected_account(&data.id)
            .await?
        else {
            return Ok(HandlerOutcome::rejected(format!(
                "no agency for account {}",
                data.id
            )));
        };

        agency.sync_capabilities(data.charges_enabled, data.payouts_enabled);
        self.repos.agencies().update(&agency).await?;
        Ok(HandlerOutcome::applied(format!(
            "agency {} capabilities synced",
            agency.id
        )))
    }

    async fn handle_account_authorization(
        &self,
        data: AccountAuthData,
        authorized: bool,
    ) -> DomainResult<HandlerOutcome> {
        let Some(mut agency) = self
            .repos
            .agencies()
            .find_by_connected_account(&data.account_id)
            .await?
        else {
            return Ok(HandlerOutcome::rejected(format!(
                "no agency for account {}",
                data.account_id
            )));
        };

        agency.set_authorized(authorized);
        self.repos.agencies().update(&agency).await?;
        Ok(HandlerOutcome::applied(format!(
            "agency {} authorization set to {authorized}",
            agency.id
        )))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::{Duration, Utc};

    use crate::application::booking::{CapacityLedger, NewHold};
    use crate::config::{BookingConfig, SweeperConfig};
    use crate::domain::{Agency, ItemKind, PaymentStatus, Reservation, ReservationItem, Turno};
    use crate::infrastructure::gateway::MockGateway;
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;
    use crate::notifications::LogMailer;

    struct Fixture {
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<MockGateway>,
        sweeper: Arc<SweeperService>,
        dispatcher: WebhookDispatcher,
    }

    async fn fixture_with_gateway(gateway: MockGateway) -> Fixture {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .turnos()
            .save(Turno::new(7, "Sunset kayak", Utc::now(), 10))
            .await
            .unwrap();
        let mut agency = Agency::new("Vistamar Tours", "ops@vistamar.example");
        agency.connected_account_id = Some("acct_1".into());
        repos.agencies().save(agency).await.unwrap();

        let gateway = Arc::new(gateway);
        let capacity = Arc::new(CapacityLedger::new(repos.clone()));
        let mailer = Arc::new(LogMailer);
        let reservations = Arc::new(ReservationService::new(
            repos.clone(),
            capacity.clone(),
            mailer.clone(),
            &BookingConfig { hold_ttl_secs: 420, code_prefix: "VB".into() },
        ));
        let sweeper = Arc::new(SweeperService::new(
            repos.clone(),
            capacity,
            mailer,
            &SweeperConfig { interval_secs: 60, max_age_secs: 420 },
        ));
        let dispatcher = WebhookDispatcher::new(
            repos.clone(),
            gateway.clone(),
            reservations,
            sweeper.clone(),
        );
        Fixture { repos, gateway, sweeper, dispatcher }
    }

    async fn fixture() -> Fixture {
        fixture_with_gateway(MockGateway::new()).await
    }

    async fn place_hold(f: &Fixture) -> Reservation {
        let items = vec![ReservationItem::new(ItemKind::Tarifa, 11, "Adult", 2, 4500)];
        let reservation = Reservation::new_hold(
            crate::application::booking::generate_booking_code("VB"),
            1,
            7,
            "Ana Torres",
            "ana@example.com",
            9000,
            "eur",
            Duration::minutes(7),
        );
        f.repos.turnos().occupy_seats(7, 2).await.unwrap();
        f.repos
            .reservations()
            .create_with_items(reservation, items)
            .await
            .unwrap()
    }

    fn session_event(
        event_id: &str,
        session_id: &str,
        intent: Option<&str>,
        code: &str,
        payment_status: &str,
    ) -> WebhookEvent {
        let mut metadata = HashMap::new();
        metadata.insert("booking_code".to_string(), code.to_string());
        WebhookEvent {
            id: event_id.into(),
            event_type: "checkout.session.completed".into(),
            kind: WebhookEventKind::CheckoutSessionCompleted(CheckoutSessionData {
                id: session_id.into(),
                payment_intent: intent.map(str::to_string),
                payment_status: payment_status.into(),
                amount_total: Some(9000),
                currency: Some("eur".into()),
                metadata,
            }),
        }
    }

    fn intent_event(event_id: &str, intent_id: &str) -> WebhookEvent {
        WebhookEvent {
            id: event_id.into(),
            event_type: "payment_intent.succeeded".into(),
            kind: WebhookEventKind::PaymentIntentSucceeded(PaymentIntentData {
                id: intent_id.into(),
                status: "succeeded".into(),
                amount: Some(9000),
                currency: Some("eur".into()),
                latest_charge: Some("ch_1".into()),
            }),
        }
    }

    #[tokio::test]
    async fn paid_session_confirms_and_records_payment() {
        let f = fixture().await;
        let hold = place_hold(&f).await;

        let outcome = f
            .dispatcher
            .dispatch(session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "paid"))
            .await
            .unwrap();
        assert!(outcome.success);

        let reservation = f.repos.reservations().find_by_id(hold.id).await.unwrap().unwrap();
        assert!(reservation.is_confirmed());

        let payments = f.repos.payments().find_by_reservation(hold.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].session_id, "cs_1");
        assert_eq!(payments[0].status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn replayed_event_id_is_applied_once() {
        let f = fixture().await;
        let hold = place_hold(&f).await;
        let event = session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "paid");

        f.dispatcher.dispatch(event.clone()).await.unwrap();
        let replay = f.dispatcher.dispatch(event).await.unwrap();
        assert!(replay.success);
        assert_eq!(replay.message, "event already processed");

        let payments = f.repos.payments().find_by_reservation(hold.id).await.unwrap();
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn unpaid_session_records_pending_and_rejects() {
        let f = fixture().await;
        let hold = place_hold(&f).await;

        let outcome = f
            .dispatcher
            .dispatch(session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "unpaid"))
            .await
            .unwrap();
        assert!(!outcome.success);

        // still a hold, but the pending payment row exists for later reconciliation
        let reservation = f.repos.reservations().find_by_id(hold.id).await.unwrap().unwrap();
        assert!(reservation.is_hold());
        let payments = f.repos.payments().find_by_reservation(hold.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Pending);

        // the rejected outcome was still recorded in the ledger
        assert!(f.repos.processed_events().find("evt_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_event_types_are_accepted_and_ignored() {
        let f = fixture().await;
        let outcome = f
            .dispatcher
            .dispatch(WebhookEvent {
                id: "evt_9".into(),
                event_type: "invoice.finalized".into(),
                kind: WebhookEventKind::Unknown("invoice.finalized".into()),
            })
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(f.repos.processed_events().find("evt_9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn late_paid_session_recovers_a_swept_hold() {
        let f = fixture().await;
        let hold = place_hold(&f).await;

        // age the hold and sweep it out of the live table
        let mut aged = hold.clone();
        aged.created_at = Utc::now() - Duration::minutes(30);
        f.repos.reservations().update(&aged).await.unwrap();
        f.sweeper.sweep().await.unwrap();
        assert!(f.repos.reservations().find_by_id(hold.id).await.unwrap().is_none());

        let outcome = f
            .dispatcher
            .dispatch(session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "paid"))
            .await
            .unwrap();
        assert!(outcome.success);

        let reservation = f.repos.reservations().find_by_id(hold.id).await.unwrap().unwrap();
        assert!(reservation.is_confirmed());
        let turno = f.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 2);
    }

    #[tokio::test]
    async fn blocked_recovery_leaves_the_event_unrecorded() {
        let f = fixture().await;
        let hold = place_hold(&f).await;
        let mut aged = hold.clone();
        aged.created_at = Utc::now() - Duration::minutes(30);
        f.repos.reservations().update(&aged).await.unwrap();
        f.sweeper.sweep().await.unwrap();

        // someone books the whole turno before the late payment lands
        f.repos.turnos().occupy_seats(7, 10).await.unwrap();

        let err = f
            .dispatcher
            .dispatch(session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "paid"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));

        // unrecorded, so the provider's retry will reprocess it
        assert!(f.repos.processed_events().find("evt_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn intent_succeeded_settles_a_pending_payment() {
        let f = fixture().await;
        let hold = place_hold(&f).await;

        f.dispatcher
            .dispatch(session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "unpaid"))
            .await
            .unwrap();

        let outcome = f.dispatcher.dispatch(intent_event("evt_2", "pi_1")).await.unwrap();
        assert!(outcome.success);

        let reservation = f.repos.reservations().find_by_id(hold.id).await.unwrap().unwrap();
        assert!(reservation.is_confirmed());
        let payments = f.repos.payments().find_by_reservation(hold.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert!(payments[0].is_paid());
    }

    #[tokio::test]
    async fn intent_without_any_session_is_rejected() {
        let f = fixture().await;
        let outcome = f.dispatcher.dispatch(intent_event("evt_1", "pi_lost")).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn intent_recovers_swept_hold_via_session_metadata() {
        let f = fixture().await;
        let hold = place_hold(&f).await;

        // pending payment row exists, then the hold is swept
        f.dispatcher
            .dispatch(session_event("evt_1", "cs_1", Some("pi_1"), &hold.booking_code, "unpaid"))
            .await
            .unwrap();
        let mut aged = hold.clone();
        aged.created_at = Utc::now() - Duration::minutes(30);
        f.repos.reservations().update(&aged).await.unwrap();
        f.sweeper.sweep().await.unwrap();

        // the provider still knows which session the intent came from
        let mut metadata = HashMap::new();
        metadata.insert("booking_code".to_string(), hold.booking_code.clone());
        f.gateway.insert_sessions(
            "pi_1",
            vec![CheckoutSession {
                id: "cs_1".into(),
                payment_intent: Some("pi_1".into()),
                payment_status: "paid".into(),
                status: "complete".into(),
                amount_total: 9000,
                currency: "eur".into(),
                metadata,
            }],
        );

        let outcome = f.dispatcher.dispatch(intent_event("evt_2", "pi_1")).await.unwrap();
        assert!(outcome.success);

        let reservation = f.repos.reservations().find_by_id(hold.id).await.unwrap().unwrap();
        assert!(reservation.is_confirmed());
    }

    #[tokio::test]
    async fn account_updated_syncs_agency_flags() {
        let f = fixture().await;
        let outcome = f
            .dispatcher
            .dispatch(WebhookEvent {
                id: "evt_1".into(),
                event_type: "account.updated".into(),
                kind: WebhookEventKind::AccountUpdated(AccountData {
                    id: "acct_1".into(),
                    charges_enabled: true,
                    payouts_enabled: true,
                }),
            })
            .await
            .unwrap();
        assert!(outcome.success);

        let agency = f.repos.agencies().find_by_id(1).await.unwrap().unwrap();
        assert!(agency.charges_enabled);
        assert!(agency.payouts_enabled);
    }

    #[tokio::test]
    async fn deauthorization_clears_agency_capabilities() {
        let f = fixture().await;
        let mut agency = f.repos.agencies().find_by_id(1).await.unwrap().unwrap();
        agency.sync_capabilities(true, true);
        agency.set_authorized(true);
        f.repos.agencies().update(&agency).await.unwrap();

        let outcome = f
            .dispatcher
            .dispatch(WebhookEvent {
                id: "evt_1".into(),
                event_type: "account.application.deauthorized".into(),
                kind: WebhookEventKind::AccountDeauthorized(AccountAuthData {
                    account_id: "acct_1".into(),
                }),
            })
            .await
            .unwrap();
        assert!(outcome.success);

        let agency = f.repos.agencies().find_by_id(1).await.unwrap().unwrap();
        assert!(!agency.authorized);
        assert!(!agency.payouts_enabled);
    }

    #[tokio::test]
    async fn account_event_for_unknown_account_is_rejected() {
        let f = fixture().await;
        let outcome = f
            .dispatcher
            .dispatch(WebhookEvent {
                id: "evt_1".into(),
                event_type: "account.updated".into(),
                kind: WebhookEventKind::AccountUpdated(AccountData {
                    id: "acct_stranger".into(),
                    charges_enabled: true,
                    payouts_enabled: true,
                }),
            })
            .await
            .unwrap();
        assert!(!outcome.success);
    }
}
