//! Refund orchestration
//!
//! Returns money through the provider with the platform commission
//! withheld. Every precondition that can be checked locally or
//! cheaply at the provider runs before any money moves; once the
//! provider refund succeeds, local bookkeeping is best-effort and
//! failures become reconciliation work instead of request errors.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::application::booking::ReservationService;
use crate::application::ports::gateway::{
    GatewayError, PaymentGateway, RefundReceipt, RefundRequest,
};
use crate::domain::{
    authoritative_payment, refunded_total, DomainError, DomainResult, Payment, PaymentStatus,
    Refund, RepositoryProvider, Reservation,
};
use crate::notifications::{send_detached, CustomerMessage, Mailer, RefundIssuedMessage};

/// Width of the idempotency window in seconds. Repeated requests for
/// the same reservation within one window reach the provider under
/// the same key and collapse into a single refund.
const IDEMPOTENCY_BUCKET_SECS: i64 = 600;

pub struct RefundOrchestrator {
    repos: Arc<dyn RepositoryProvider>,
    gateway: Arc<dyn PaymentGateway>,
    reservations: Arc<ReservationService>,
    mailer: Arc<dyn Mailer>,
}

impl RefundOrchestrator {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<dyn PaymentGateway>,
        reservations: Arc<ReservationService>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            repos,
            gateway,
            reservations,
            mailer,
        }
    }

    /// Refund a reservation's payment. `requested_amount: None` means
    /// the customer-facing default: the payment minus the agency's
    /// commission and processor fee.
    pub async fn refund(
        &self,
        reservation_id: i32,
        requested_amount: Option<i64>,
        authorized_by: &str,
    ) -> DomainResult<Refund> {
        let reservation = self
            .repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "reservation".into(),
                field: "id".into(),
                value: reservation_id.to_string(),
            })?;
        if reservation.is_cancelled() {
            return Err(DomainError::InvalidState {
                entity: "reservation".into(),
                expected: "hold or confirmed".into(),
                actual: reservation.status.to_string(),
            });
        }

        let payment = self.paid_payment(&reservation).await?;

        let agency = self
            .repos
            .agencies()
            .find_by_id(reservation.agency_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "agency".into(),
                field: "id".into(),
                value: reservation.agency_id.to_string(),
            })?;
        let Some(account_id) = agency.connected_account_id.clone() else {
            return Err(DomainError::MissingConnectedAccount {
                agency_id: agency.id,
            });
        };

        let intent = self
            .gateway
            .retrieve_payment_intent(&payment.payment_intent_id)
            .await?;
        if !intent.is_refundable() {
            return Err(DomainError::NotRefundable(format!(
                "payment intent {} is {}",
                intent.id, intent.status
            )));
        }

        // what is still unrefunded across earlier (possibly partial) refunds
        let prior = refunded_total(
            &self
                .repos
                .refunds()
                .find_by_reservation(reservation_id)
                .await?,
        );
        let remaining = payment.amount - prior;
        if remaining <= 0 {
            return Err(DomainError::NotRefundable(
                "payment already fully refunded".into(),
            ));
        }

        let amount = match requested_amount {
            Some(requested) => {
                if requested <= 0 {
                    return Err(DomainError::Validation(
                        "refund amount must be positive".into(),
                    ));
                }
                let clamped = requested.min(payment.amount);
                if clamped > remaining {
                    return Err(DomainError::RefundExceedsPayment {
                        requested: clamped,
                        refundable: remaining,
                    });
                }
                clamped
            }
            None => {
                let net = agency.net_refund(payment.amount);
                if net <= 0 {
                    return Err(DomainError::NotRefundable(
                        "nothing left to refund after commission and fees".into(),
                    ));
                }
                net.min(remaining)
            }
        };

        // never hand the provider a refund the connected account
        // cannot cover; the provider would park it and retry opaquely
        let balance = self.gateway.retrieve_balance(&account_id).await?;
        let available = balance.available_in(&payment.currency);
        if available < amount {
            return Err(DomainError::InsufficientBalance {
                currency: payment.currency.clone(),
                available,
                requested: amount,
            });
        }

        let (receipt, fallback_reason) = self
            .execute(&payment, amount, &account_id, reservation_id)
            .await?;

        Ok(self
            .settle_locally(&reservation, &payment, receipt, fallback_reason, authorized_by)
            .await)
    }

    /// The newest paid payment for the reservation. A row stuck in a
    /// non-final external status gets one re-verification against the
    /// provider's checkout sessions before we give up.
    async fn paid_payment(&self, reservation: &Reservation) -> DomainResult<Payment> {
        let payments = self
            .repos
            .payments()
            .find_by_reservation(reservation.id)
            .await?;
        if let Some(payment) = authoritative_payment(&payments) {
            return Ok(payment.clone());
        }

        for payment in payments.iter().filter(|p| p.status == PaymentStatus::Pending) {
            if payment.payment_intent_id.is_empty() {
                continue;
            }
            let sessions = self
                .gateway
                .list_checkout_sessions(&payment.payment_intent_id)
                .await?;
            let Some(session) = sessions.iter().find(|s| s.id == payment.session_id) else {
                continue;
            };
            if session.payment_status != payment.external_status {
                let mut updated = payment.clone();
                updated.reconcile_external(&session.payment_status);
                self.repos.payments().update(&updated).await?;
                info!(
                    reservation_id = reservation.id,
                    session_id = %updated.session_id,
                    external_status = %updated.external_status,
                    "Reconciled stale payment against the provider"
                );
            }
        }

        let payments = self
            .repos
            .payments()
            .find_by_reservation(reservation.id)
            .await?;
        authoritative_payment(&payments)
            .cloned()
            .ok_or(DomainError::MissingPayment {
                reservation_id: reservation.id,
            })
    }

    /// Issue the provider refund, reversing the transfer so the
    /// platform recoups its share. A reversal rejection gets exactly
    /// one retry as a plain refund from the connected balance.
    async fn execute(
        &self,
        payment: &Payment,
        amount: i64,
        connected_account_id: &str,
        reservation_id: i32,
    ) -> DomainResult<(RefundReceipt, Option<String>)> {
        let bucket = Utc::now().timestamp() / IDEMPOTENCY_BUCKET_SECS;
        let key = format!("refund-{reservation_id}-{bucket}");

        let request = RefundRequest {
            payment_intent_id: payment.payment_intent_id.clone(),
            amount,
            reverse_transfer: true,
            connected_account_id: connected_account_id.to_string(),
            idempotency_key: key.clone(),
        };

        match self.gateway.create_refund(request.clone()).await {
            Ok(receipt) => Ok((receipt, None)),
            Err(GatewayError::TransferReversal { message }) => {
                warn!(
                    reservation_id,
                    reason = %message,
                    "Transfer reversal rejected, retrying as a direct refund"
                );
                let retry = RefundRequest {
                    reverse_transfer: false,
                    idempotency_key: format!("{key}-direct"),
                    ..request
                };
                let receipt = self.gateway.create_refund(retry).await?;
                Ok((receipt, Some(message)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Local bookkeeping once the provider refund went through. Money
    /// already moved, so nothing here may fail the request: a failed
    /// step is logged as a reconciliation discrepancy for an operator.
    async fn settle_locally(
        &self,
        reservation: &Reservation,
        payment: &Payment,
        receipt: RefundReceipt,
        fallback_reason: Option<String>,
        authorized_by: &str,
    ) -> Refund {
        let mut refund = Refund::new(
            reservation.id,
            payment.id,
            &receipt.id,
            receipt.amount,
            &receipt.status,
            authorized_by,
        );
        if let Some(reason) = &fallback_reason {
            refund = refund.with_fallback(reason);
        }

        if let Err(e) = self.reservations.cancel(reservation.id, "refunded").await {
            error!(
                reservation_id = reservation.id,
                provider_refund_id = %receipt.id,
                category = "reconciliation",
                error = %e,
                "Refund succeeded at the provider but the reservation could not be cancelled"
            );
            metrics::counter!("reconciliation_discrepancies_total").increment(1);
        }

        let stored = match self.repos.refunds().create(refund.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    reservation_id = reservation.id,
                    provider_refund_id = %receipt.id,
                    amount = receipt.amount,
                    category = "reconciliation",
                    error = %e,
                    "Refund succeeded at the provider but the refund row could not be written"
                );
                metrics::counter!("reconciliation_discrepancies_total").increment(1);
                refund
            }
        };

        let fallback_note = fallback_reason
            .map(|reason| format!("issued directly from the account balance ({reason})"));
        send_detached(
            self.mailer.clone(),
            CustomerMessage::RefundIssued(RefundIssuedMessage {
                booking_code: reservation.booking_code.clone(),
                customer_name: reservation.customer_name.clone(),
                customer_email: reservation.customer_email.clone(),
                amount: stored.amount,
                currency: payment.currency.clone(),
                fallback_note,
            }),
        );

        info!(
            reservation_id = reservation.id,
            booking_code = %reservation.booking_code,
            amount = stored.amount,
            fallback = stored.fallback_used,
            authorized_by,
            "Refund issued"
        );
        let fallback_label = if stored.fallback_used { "true" } else { "false" };
        metrics::counter!("payment_refunds_total", "fallback" => fallback_label).increment(1);

        stored
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    use crate::application::booking::{generate_booking_code, CapacityLedger};
    use crate::application::ports::gateway::{Balance, BalanceEntry, CheckoutSession, PaymentIntent};
    use crate::config::BookingConfig;
    use crate::domain::{Agency, ItemKind, ReservationItem, Turno};
    use crate::infrastructure::gateway::MockGateway;
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;
    use crate::notifications::LogMailer;

    struct Fixture {
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<MockGateway>,
        orchestrator: RefundOrchestrator,
    }

    async fn fixture() -> Fixture {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .turnos()
            .save(Turno::new(7, "Sunset kayak", Utc::now(), 10))
            .await
            .unwrap();

        let mut agency = Agency::new("Vistamar Tours", "ops@vistamar.example");
        agency.connected_account_id = Some("acct_1".into());
        agency.commission_bps = 1000;
        agency.processor_fee = 200;
        repos.agencies().save(agency).await.unwrap();

        let gateway = Arc::new(
            MockGateway::new()
                .with_intent(PaymentIntent {
                    id: "pi_1".into(),
                    status: "succeeded".into(),
                    amount: 9000,
                    currency: "eur".into(),
                    latest_charge: Some("ch_1".into()),
                })
                .with_balance(
                    "acct_1",
                    Balance {
                        available: vec![BalanceEntry { amount: 50_000, currency: "eur".into() }],
                        pending: vec![],
                    },
                ),
        );

        let capacity = Arc::new(CapacityLedger::new(repos.clone()));
        let mailer = Arc::new(LogMailer);
        let reservations = Arc::new(ReservationService::new(
            repos.clone(),
            capacity,
            mailer.clone(),
            &BookingConfig { hold_ttl_secs: 420, code_prefix: "VB".into() },
        ));
        let orchestrator = RefundOrchestrator::new(
            repos.clone(),
            gateway.clone(),
            reservations,
            mailer,
        );
        Fixture { repos, gateway, orchestrator }
    }

    /// Confirmed reservation with a succeeded payment of 9000 eur.
    async fn paid_reservation(f: &Fixture) -> (Reservation, Payment) {
        let mut reservation = Reservation::new_hold(
            generate_booking_code("VB"),
            1,
            7,
            "Ana Torres",
            "ana@example.com",
            9000,
            "eur",
            Duration::minutes(7),
        );
        reservation.confirm();
        let items = vec![ReservationItem::new(ItemKind::Tarifa, 11, "Adult", 2, 4500)];
        let reservation = f
            .repos
            .reservations()
            .create_with_items(reservation, items)
            .await
            .unwrap();
        f.repos.turnos().occupy_seats(7, 2).await.unwrap();

        let payment = f
            .repos
            .payments()
            .create(Payment::new(reservation.id, "cs_1", "pi_1", 9000, "eur", "paid"))
            .await
            .unwrap();
        (reservation, payment)
    }

    #[tokio::test]
    async fn default_refund_withholds_commission_and_fee() {
        let f = fixture().await;
        let (reservation, payment) = paid_reservation(&f).await;

        let refund = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap();

        // 9000 minus 10% commission minus the 200 processor fee
        assert_eq!(refund.amount, 7900);
        assert_eq!(refund.payment_id, payment.id);
        assert_eq!(refund.authorized_by, "ops@vistamar");
        assert!(!refund.fallback_used);

        let calls = f.gateway.refund_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].reverse_transfer);
        assert_eq!(calls[0].amount, 7900);
        assert!(calls[0].idempotency_key.starts_with("refund-"));
        drop(calls);

        // the reservation was cancelled and its seats released
        let reservation = f.repos.reservations().find_by_id(reservation.id).await.unwrap().unwrap();
        assert!(reservation.is_cancelled());
        let turno = f.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 0);
    }

    #[tokio::test]
    async fn explicit_amount_is_clamped_to_the_payment() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;

        let refund = f
            .orchestrator
            .refund(reservation.id, Some(20_000), "ops@vistamar")
            .await
            .unwrap();
        assert_eq!(refund.amount, 9000);
    }

    #[tokio::test]
    async fn refund_cannot_exceed_the_unrefunded_remainder() {
        let f = fixture().await;
        let (reservation, payment) = paid_reservation(&f).await;

        // a prior partial refund whose bookkeeping already landed
        f.repos
            .refunds()
            .create(Refund::new(reservation.id, payment.id, "re_prior", 5000, "succeeded", "ops"))
            .await
            .unwrap();

        let err = f
            .orchestrator
            .refund(reservation.id, Some(5000), "ops@vistamar")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::RefundExceedsPayment { requested: 5000, refundable: 4000 }
        ));
        assert_eq!(f.gateway.refund_call_count(), 0);
    }

    #[tokio::test]
    async fn insufficient_balance_blocks_before_the_provider() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;
        f.gateway.insert_balance(
            "acct_1",
            Balance {
                available: vec![BalanceEntry { amount: 1000, currency: "eur".into() }],
                pending: vec![],
            },
        );

        let err = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientBalance { available: 1000, requested: 7900, .. }
        ));
        assert_eq!(f.gateway.refund_call_count(), 0);
    }

    #[tokio::test]
    async fn reversal_rejection_falls_back_to_a_direct_refund() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;
        f.gateway.reject_reversals.store(true, Ordering::SeqCst);

        let refund = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap();
        assert!(refund.fallback_used);
        assert!(refund.fallback_reason.as_deref().unwrap().contains("insufficient funds"));

        let calls = f.gateway.refund_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].reverse_transfer);
        assert!(!calls[1].reverse_transfer);
        assert_ne!(calls[0].idempotency_key, calls[1].idempotency_key);
        drop(calls);

        let reservation = f.repos.reservations().find_by_id(reservation.id).await.unwrap().unwrap();
        assert!(reservation.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_reservation_is_rejected() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;
        let mut cancelled = reservation.clone();
        cancelled.cancel();
        f.repos.reservations().update(&cancelled).await.unwrap();

        let err = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn reservation_without_payment_is_rejected() {
        let f = fixture().await;
        let mut reservation = Reservation::new_hold(
            generate_booking_code("VB"),
            1,
            7,
            "Ana Torres",
            "ana@example.com",
            9000,
            "eur",
            Duration::minutes(7),
        );
        reservation.confirm();
        let items = vec![ReservationItem::new(ItemKind::Tarifa, 11, "Adult", 2, 4500)];
        let reservation = f
            .repos
            .reservations()
            .create_with_items(reservation, items)
            .await
            .unwrap();

        let err = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap_err();
        assert!(matches!(err, DomainError::MissingPayment { .. }));
    }

    #[tokio::test]
    async fn pending_payment_self_heals_against_the_provider() {
        let f = fixture().await;
        let (reservation, payment) = paid_reservation(&f).await;

        // demote the row to a stuck non-final status
        let mut stuck = payment.clone();
        stuck.reconcile_external("unpaid");
        f.repos.payments().update(&stuck).await.unwrap();

        // the provider has since settled the session
        f.gateway.insert_sessions(
            "pi_1",
            vec![CheckoutSession {
                id: "cs_1".into(),
                payment_intent: Some("pi_1".into()),
                payment_status: "paid".into(),
                status: "complete".into(),
                amount_total: 9000,
                currency: "eur".into(),
                metadata: Default::default(),
            }],
        );

        let refund = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap();
        assert_eq!(refund.amount, 7900);

        let payments = f.repos.payments().find_by_reservation(reservation.id).await.unwrap();
        assert!(payments[0].is_paid());
    }

    #[tokio::test]
    async fn agency_without_connected_account_is_rejected() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;
        let mut agency = f.repos.agencies().find_by_id(1).await.unwrap().unwrap();
        agency.connected_account_id = None;
        f.repos.agencies().update(&agency).await.unwrap();

        let err = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap_err();
        assert!(matches!(err, DomainError::MissingConnectedAccount { agency_id: 1 }));
    }

    #[tokio::test]
    async fn unrefundable_intent_is_rejected() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;
        f.gateway.insert_intent(PaymentIntent {
            id: "pi_1".into(),
            status: "requires_payment_method".into(),
            amount: 9000,
            currency: "eur".into(),
            latest_charge: None,
        });

        let err = f.orchestrator.refund(reservation.id, None, "ops@vistamar").await.unwrap_err();
        assert!(matches!(err, DomainError::NotRefundable(_)));
        assert_eq!(f.gateway.refund_call_count(), 0);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let f = fixture().await;
        let (reservation, _) = paid_reservation(&f).await;

        let err = f.orchestrator.refund(reservation.id, Some(0), "ops@vistamar").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
