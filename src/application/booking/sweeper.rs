//! Abandoned-cart sweeper
//!
//! Demotes stale holds out of the live reservation table into the
//! abandoned archive, returning their seats. The archive exists so a
//! late-arriving payment can resurrect the booking through
//! [`SweeperService::recover`]; sweeping is not a cancellation.
//!
//! The periodic loop runs in a tokio::spawn gated by the shutdown
//! signal; `sweep()` itself is a single idempotent pass that can also
//! be driven by an external scheduler.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use super::capacity::CapacityLedger;
use crate::config::SweeperConfig;
use crate::domain::{
    occupant_count, AbandonedReservation, DomainError, DomainResult, Reservation,
    RepositoryProvider,
};
use crate::notifications::{send_detached, BookingRecoveredMessage, CustomerMessage, Mailer};
use crate::shared::shutdown::ShutdownSignal;

/// Outcome of one sweep pass. Failures are per-reservation; one bad
/// row never aborts the batch.
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub moved: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Service that archives stale holds and resurrects them on demand.
pub struct SweeperService {
    repos: Arc<dyn RepositoryProvider>,
    capacity: Arc<CapacityLedger>,
    mailer: Arc<dyn Mailer>,
    max_age: Duration,
}

impl SweeperService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        capacity: Arc<CapacityLedger>,
        mailer: Arc<dyn Mailer>,
        config: &SweeperConfig,
    ) -> Self {
        Self {
            repos,
            capacity,
            mailer,
            max_age: Duration::seconds(config.max_age_secs),
        }
    }

    /// One pass: archive every hold older than the age threshold,
    /// release its seats and drop the live row.
    pub async fn sweep(&self) -> DomainResult<SweepSummary> {
        let cutoff = Utc::now() - self.max_age;
        let stale = self.repos.reservations().find_stale_holds(cutoff).await?;

        let mut summary = SweepSummary::default();
        for reservation in stale {
            let booking_code = reservation.booking_code.clone();
            match self.sweep_one(reservation).await {
                Ok(()) => summary.moved += 1,
                Err(e) => {
                    warn!(booking_code = %booking_code, error = %e, "Sweep failed for hold");
                    summary.failed += 1;
                    summary.errors.push(format!("{booking_code}: {e}"));
                }
            }
        }

        if summary.moved > 0 || summary.failed > 0 {
            info!(
                moved = summary.moved,
                failed = summary.failed,
                "Stale holds swept"
            );
            metrics::counter!("booking_swept_holds_total").increment(summary.moved as u64);
            metrics::counter!("booking_sweep_failures_total").increment(summary.failed as u64);
        }

        Ok(summary)
    }

    /// Archive first so a partial failure can be retried on the next
    /// pass (the archive write is insert-or-replace), then release the
    /// seats, then drop the live row.
    async fn sweep_one(&self, reservation: Reservation) -> DomainResult<()> {
        let items = self.repos.reservations().items_for(reservation.id).await?;
        let occupants = occupant_count(&items);

        let record = AbandonedReservation::from_reservation(&reservation);
        self.repos.abandoned_carts().archive(record, items).await?;

        self.capacity
            .release_seats(reservation.turno_id, occupants)
            .await?;

        self.repos.reservations().delete(reservation.id).await?;

        info!(
            reservation_id = reservation.id,
            booking_code = %reservation.booking_code,
            occupants,
            "Hold archived as abandoned"
        );
        Ok(())
    }

    /// Resurrect an archived booking after a late successful payment:
    /// re-occupy the seats that were released at sweep time, re-insert
    /// the reservation as confirmed, drop the archive record.
    ///
    /// An occupancy failure here is a real double-booking risk and is
    /// surfaced loudly, never swallowed.
    pub async fn recover(&self, booking_code: &str) -> DomainResult<Reservation> {
        let archived = self
            .repos
            .abandoned_carts()
            .find_by_booking_code(booking_code)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "abandoned reservation".into(),
                field: "booking_code".into(),
                value: booking_code.into(),
            })?;

        let items = self
            .repos
            .abandoned_carts()
            .items_for(archived.reservation_id)
            .await?;
        let occupants = occupant_count(&items);
        let turno_id = archived.turno_id;

        if let Err(e) = self.capacity.occupy_seats(turno_id, occupants).await {
            error!(
                booking_code,
                turno_id,
                occupants,
                error = %e,
                "Recovery blocked: seats no longer available"
            );
            return Err(e);
        }

        let reservation = archived.into_confirmed_reservation();
        if let Err(e) = self
            .repos
            .reservations()
            .restore(reservation.clone(), items)
            .await
        {
            // give the seats back before surfacing the failure
            if let Err(release_err) = self.capacity.release_seats(turno_id, occupants).await {
                error!(
                    booking_code,
                    turno_id,
                    error = %release_err,
                    "Seat compensation failed after recovery insert error"
                );
            }
            return Err(e);
        }

        self.repos
            .abandoned_carts()
            .delete(reservation.id)
            .await?;

        info!(
            reservation_id = reservation.id,
            booking_code,
            occupants,
            "Abandoned booking recovered"
        );
        metrics::counter!("booking_recoveries_total").increment(1);

        send_detached(
            self.mailer.clone(),
            CustomerMessage::BookingRecovered(BookingRecoveredMessage {
                booking_code: reservation.booking_code.clone(),
                customer_name: reservation.customer_name.clone(),
                customer_email: reservation.customer_email.clone(),
            }),
        );

        Ok(reservation)
    }
}

/// Start the periodic sweep task.
///
/// Ticks every `interval_secs`, sweeping stale holds until the
/// shutdown signal fires.
pub fn start_sweeper_task(
    sweeper: Arc<SweeperService>,
    shutdown: ShutdownSignal,
    interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(interval = interval_secs, "Abandoned-cart sweeper started");

        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = sweeper.sweep().await {
                        warn!(error = %e, "Sweep pass error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("Abandoned-cart sweeper shutting down");
                    break;
                }
            }
        }

        info!("Abandoned-cart sweeper stopped");
    });
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookingConfig;
    use crate::application::booking::reservations::{NewHold, ReservationService};
    use crate::domain::{ItemKind, ReservationItem, Turno};
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;
    use crate::notifications::LogMailer;

    struct Fixture {
        repos: Arc<dyn RepositoryProvider>,
        reservations: ReservationService,
        sweeper: SweeperService,
    }

    fn sweeper_config() -> SweeperConfig {
        SweeperConfig {
            interval_secs: 60,
            max_age_secs: 420,
        }
    }

    async fn fixture(max_capacity: i32) -> Fixture {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .turnos()
            .save(Turno::new(7, "Sunset kayak", Utc::now(), max_capacity))
            .await
            .unwrap();
        let capacity = Arc::new(CapacityLedger::new(repos.clone()));
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        let reservations = ReservationService::new(
            repos.clone(),
            capacity.clone(),
            mailer.clone(),
            &BookingConfig {
                hold_ttl_secs: 420,
                code_prefix: "VB".into(),
            },
        );
        let sweeper = SweeperService::new(repos.clone(), capacity, mailer, &sweeper_config());
        Fixture {
            repos,
            reservations,
            sweeper,
        }
    }

    async fn place_hold(f: &Fixture, adults: i32) -> Reservation {
        let items = vec![ReservationItem::new(ItemKind::Tarifa, 11, "Adult", adults, 4500)];
        let total = items.iter().map(|i| i.total).sum();
        f.reservations
            .create_hold(NewHold {
                agency_id: 1,
                turno_id: 7,
                customer_name: "Ana Torres".into(),
                customer_email: "ana@example.com".into(),
                total_amount: total,
                currency: "eur".into(),
                items,
            })
            .await
            .unwrap()
    }

    async fn backdate(f: &Fixture, reservation: &Reservation, minutes: i64) {
        let mut aged = reservation.clone();
        aged.created_at = Utc::now() - Duration::minutes(minutes);
        f.repos.reservations().update(&aged).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_archives_only_stale_holds() {
        let f = fixture(10).await;
        let stale = place_hold(&f, 2).await;
        let fresh = place_hold(&f, 3).await;
        backdate(&f, &stale, 10).await;

        let summary = f.sweeper.sweep().await.unwrap();
        assert_eq!(summary.moved, 1);
        assert_eq!(summary.failed, 0);

        // stale hold is gone from the live table, archived by code
        assert!(f
            .repos
            .reservations()
            .find_by_id(stale.id)
            .await
            .unwrap()
            .is_none());
        assert!(f
            .repos
            .abandoned_carts()
            .find_by_booking_code(&stale.booking_code)
            .await
            .unwrap()
            .is_some());

        // fresh hold untouched, its seats still held
        assert!(f
            .repos
            .reservations()
            .find_by_id(fresh.id)
            .await
            .unwrap()
            .is_some());
        let turno = f.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 3);
    }

    #[tokio::test]
    async fn sweep_ignores_confirmed_reservations() {
        let f = fixture(10).await;
        let hold = place_hold(&f, 2).await;
        backdate(&f, &hold, 10).await;
        f.reservations.confirm(hold.id).await.unwrap();

        let summary = f.sweeper.sweep().await.unwrap();
        assert_eq!(summary.moved, 0);
    }

    #[tokio::test]
    async fn sweep_with_nothing_stale_is_empty() {
        let f = fixture(10).await;
        place_hold(&f, 2).await;

        let summary = f.sweeper.sweep().await.unwrap();
        assert_eq!(summary.moved, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn recover_restores_a_confirmed_booking() {
        let f = fixture(10).await;
        let hold = place_hold(&f, 2).await;
        backdate(&f, &hold, 10).await;
        f.sweeper.sweep().await.unwrap();

        let recovered = f.sweeper.recover(&hold.booking_code).await.unwrap();
        assert_eq!(recovered.id, hold.id);
        assert!(recovered.is_confirmed());

        // live again under the same ID, archive gone, seats re-taken
        assert!(f
            .repos
            .reservations()
            .find_by_id(hold.id)
            .await
            .unwrap()
            .is_some());
        assert!(f
            .repos
            .abandoned_carts()
            .find_by_booking_code(&hold.booking_code)
            .await
            .unwrap()
            .is_none());
        let turno = f.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 2);

        // items came back with the reservation
        let items = f.repos.reservations().items_for(hold.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn recover_fails_loudly_when_seats_are_gone() {
        let f = fixture(2).await;
        let hold = place_hold(&f, 2).await;
        backdate(&f, &hold, 10).await;
        f.sweeper.sweep().await.unwrap();

        // someone else takes the freed seats
        place_hold(&f, 2).await;

        let err = f.sweeper.recover(&hold.booking_code).await.unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));

        // archive record stays for manual follow-up
        assert!(f
            .repos
            .abandoned_carts()
            .find_by_booking_code(&hold.booking_code)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn recover_unknown_code_is_not_found() {
        let f = fixture(10).await;
        let err = f.sweeper.recover("VB-MISSING").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn sweep_then_recover_roundtrips_capacity() {
        let f = fixture(4).await;
        let hold = place_hold(&f, 4).await;
        backdate(&f, &hold, 10).await;

        f.sweeper.sweep().await.unwrap();
        let turno = f.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 0);

        f.sweeper.recover(&hold.booking_code).await.unwrap();
        let turno = f.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 4);
    }
}
