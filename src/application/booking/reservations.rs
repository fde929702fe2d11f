//! Reservation lifecycle service
//!
//! Owns the hold → confirmed / cancelled transitions. Capacity is
//! consumed when the hold is created and given back on cancellation or
//! sweep, so a hold blocks the seats it asked for the whole time it
//! exists.

use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use tracing::{error, info};

use super::capacity::CapacityLedger;
use crate::config::BookingConfig;
use crate::domain::{
    occupant_count, DomainError, DomainResult, Reservation, ReservationItem, ReservationStatus,
    RepositoryProvider,
};
use crate::notifications::{
    send_detached, BookingConfirmedMessage, CustomerMessage, Mailer,
};

/// Booking-code charset without lookalike characters (0/O, 1/I).
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// Mint a fresh booking code, e.g. `VB-K7KP2Q`.
pub fn generate_booking_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{prefix}-{suffix}")
}

/// Input for a new hold. Items arrive unpersisted (IDs zero).
#[derive(Debug, Clone)]
pub struct NewHold {
    pub agency_id: i32,
    pub turno_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    /// Declared total in minor units; must equal the sum of item totals
    pub total_amount: i64,
    pub currency: String,
    pub items: Vec<ReservationItem>,
}

/// Service for reservation lifecycle operations
pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    capacity: Arc<CapacityLedger>,
    mailer: Arc<dyn Mailer>,
    hold_ttl: Duration,
    code_prefix: String,
}

impl ReservationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        capacity: Arc<CapacityLedger>,
        mailer: Arc<dyn Mailer>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            repos,
            capacity,
            mailer,
            hold_ttl: Duration::seconds(config.hold_ttl_secs),
            code_prefix: config.code_prefix.clone(),
        }
    }

    /// Place a hold: validate items, occupy seats, insert the
    /// reservation with its items and an expiry stamp.
    ///
    /// If the insert fails after seats were taken, the seats are
    /// released again before the error propagates.
    pub async fn create_hold(&self, new_hold: NewHold) -> DomainResult<Reservation> {
        validate_items(&new_hold.items, new_hold.total_amount)?;
        let occupants = occupant_count(&new_hold.items);

        self.capacity
            .occupy_seats(new_hold.turno_id, occupants)
            .await?;

        let reservation = Reservation::new_hold(
            generate_booking_code(&self.code_prefix),
            new_hold.agency_id,
            new_hold.turno_id,
            new_hold.customer_name,
            new_hold.customer_email,
            new_hold.total_amount,
            new_hold.currency,
            self.hold_ttl,
        );

        let created = match self
            .repos
            .reservations()
            .create_with_items(reservation, new_hold.items)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                // compensate the seats we already took
                if let Err(release_err) = self
                    .capacity
                    .release_seats(new_hold.turno_id, occupants)
                    .await
                {
                    error!(
                        turno_id = new_hold.turno_id,
                        seats = occupants,
                        error = %release_err,
                        "Seat compensation failed after hold insert error"
                    );
                }
                return Err(e);
            }
        };

        info!(
            reservation_id = created.id,
            booking_code = %created.booking_code,
            turno_id = created.turno_id,
            occupants,
            "Hold created"
        );
        metrics::counter!("booking_holds_total").increment(1);

        Ok(created)
    }

    /// Ensure a reservation is confirmed. Idempotent: confirming an
    /// already-confirmed reservation is a no-op with no second
    /// notification. Cancelled reservations cannot be confirmed.
    pub async fn confirm(&self, reservation_id: i32) -> DomainResult<Reservation> {
        let mut reservation = self.require(reservation_id).await?;

        match reservation.status {
            ReservationStatus::Confirmed => Ok(reservation),
            ReservationStatus::Cancelled => Err(DomainError::InvalidState {
                entity: "reservation".into(),
                expected: "hold or confirmed".into(),
                actual: "cancelled".into(),
            }),
            ReservationStatus::Hold => {
                reservation.confirm();
                self.repos.reservations().update(&reservation).await?;

                info!(
                    reservation_id,
                    booking_code = %reservation.booking_code,
                    "Reservation confirmed"
                );
                metrics::counter!("booking_confirmations_total").increment(1);

                send_detached(
                    self.mailer.clone(),
                    CustomerMessage::BookingConfirmed(BookingConfirmedMessage {
                        booking_code: reservation.booking_code.clone(),
                        customer_name: reservation.customer_name.clone(),
                        customer_email: reservation.customer_email.clone(),
                        total_amount: reservation.total_amount,
                        currency: reservation.currency.clone(),
                    }),
                );

                Ok(reservation)
            }
        }
    }

    /// Cancel a hold or confirmed reservation, giving its seats back.
    ///
    /// The row is stamped first and the seats released after: if the
    /// release fails the turno stays conservatively full, which blocks
    /// sales instead of overselling.
    pub async fn cancel(&self, reservation_id: i32, reason: &str) -> DomainResult<Reservation> {
        let mut reservation = self.require(reservation_id).await?;

        if reservation.is_cancelled() {
            return Err(DomainError::InvalidState {
                entity: "reservation".into(),
                expected: "hold or confirmed".into(),
                actual: "cancelled".into(),
            });
        }

        let items = self.repos.reservations().items_for(reservation_id).await?;
        let occupants = occupant_count(&items);

        reservation.cancel();
        self.repos.reservations().update(&reservation).await?;

        if let Err(e) = self
            .capacity
            .release_seats(reservation.turno_id, occupants)
            .await
        {
            error!(
                reservation_id,
                turno_id = reservation.turno_id,
                seats = occupants,
                error = %e,
                "Seat release failed after cancellation"
            );
            return Err(e);
        }

        info!(
            reservation_id,
            booking_code = %reservation.booking_code,
            reason,
            "Reservation cancelled"
        );
        metrics::counter!("booking_cancellations_total").increment(1);

        Ok(reservation)
    }

    pub async fn get(&self, reservation_id: i32) -> DomainResult<Reservation> {
        self.require(reservation_id).await
    }

    pub async fn get_by_booking_code(&self, code: &str) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_booking_code(code)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "reservation".into(),
                field: "booking_code".into(),
                value: code.into(),
            })
    }

    pub async fn items(&self, reservation_id: i32) -> DomainResult<Vec<ReservationItem>> {
        self.repos.reservations().items_for(reservation_id).await
    }

    async fn require(&self, reservation_id: i32) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "reservation".into(),
                field: "id".into(),
                value: reservation_id.to_string(),
            })
    }
}

fn validate_items(items: &[ReservationItem], declared_total: i64) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::Validation(
            "a reservation needs at least one item".into(),
        ));
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::Validation(format!(
                "item '{}' has non-positive quantity {}",
                item.label, item.quantity
            )));
        }
        if item.unit_price < 0 {
            return Err(DomainError::Validation(format!(
                "item '{}' has negative unit price {}",
                item.label, item.unit_price
            )));
        }
    }
    if occupant_count(items) == 0 {
        return Err(DomainError::Validation(
            "a reservation needs at least one tarifa line".into(),
        ));
    }
    let computed: i64 = items.iter().map(|i| i.total).sum();
    if computed != declared_total {
        return Err(DomainError::Validation(format!(
            "declared total {declared_total} does not match item total {computed}"
        )));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemKind, Turno};
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;
    use crate::notifications::LogMailer;

    fn test_config() -> BookingConfig {
        BookingConfig {
            hold_ttl_secs: 420,
            code_prefix: "VB".into(),
        }
    }

    async fn service_with_turno(max_capacity: i32) -> ReservationService {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .turnos()
            .save(Turno::new(7, "Sunset kayak", chrono::Utc::now(), max_capacity))
            .await
            .unwrap();
        let capacity = Arc::new(CapacityLedger::new(repos.clone()));
        ReservationService::new(repos, capacity, Arc::new(LogMailer), &test_config())
    }

    fn two_adults_one_extra() -> Vec<ReservationItem> {
        vec![
            ReservationItem::new(ItemKind::Tarifa, 11, "Adult", 2, 4500),
            ReservationItem::new(ItemKind::Extra, 31, "Photo pack", 1, 1000),
        ]
    }

    fn hold_request(items: Vec<ReservationItem>) -> NewHold {
        let total = items.iter().map(|i| i.total).sum();
        NewHold {
            agency_id: 1,
            turno_id: 7,
            customer_name: "Ana Torres".into(),
            customer_email: "ana@example.com".into(),
            total_amount: total,
            currency: "eur".into(),
            items,
        }
    }

    #[tokio::test]
    async fn create_hold_occupies_tarifa_seats_only() {
        let service = service_with_turno(10).await;
        let created = service
            .create_hold(hold_request(two_adults_one_extra()))
            .await
            .unwrap();

        assert!(created.is_hold());
        assert!(created.expires_at.is_some());
        assert!(created.booking_code.starts_with("VB-"));

        let turno = service.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 2); // extras take no seats
    }

    #[tokio::test]
    async fn create_hold_rejects_total_mismatch() {
        let service = service_with_turno(10).await;
        let mut req = hold_request(two_adults_one_extra());
        req.total_amount += 1;

        let err = service.create_hold(req).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // no seats were taken
        let turno = service.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 0);
    }

    #[tokio::test]
    async fn create_hold_requires_a_tarifa_line() {
        let service = service_with_turno(10).await;
        let items = vec![ReservationItem::new(ItemKind::Extra, 31, "Photo pack", 1, 1000)];
        let err = service.create_hold(hold_request(items)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn create_hold_full_turno_is_rejected() {
        let service = service_with_turno(1).await;
        let err = service
            .create_hold(hold_request(two_adults_one_extra()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn confirm_is_idempotent() {
        let service = service_with_turno(10).await;
        let created = service
            .create_hold(hold_request(two_adults_one_extra()))
            .await
            .unwrap();

        let confirmed = service.confirm(created.id).await.unwrap();
        assert!(confirmed.is_confirmed());
        assert!(confirmed.expires_at.is_none());

        // second confirm is a clean no-op
        let again = service.confirm(created.id).await.unwrap();
        assert!(again.is_confirmed());
    }

    #[tokio::test]
    async fn cancelled_reservation_cannot_confirm() {
        let service = service_with_turno(10).await;
        let created = service
            .create_hold(hold_request(two_adults_one_extra()))
            .await
            .unwrap();
        service.cancel(created.id, "customer request").await.unwrap();

        let err = service.confirm(created.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn cancel_returns_seats() {
        let service = service_with_turno(10).await;
        let created = service
            .create_hold(hold_request(two_adults_one_extra()))
            .await
            .unwrap();

        let cancelled = service.cancel(created.id, "customer request").await.unwrap();
        assert!(cancelled.is_cancelled());
        assert!(cancelled.cancelled_at.is_some());

        let turno = service.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 0);
    }

    #[tokio::test]
    async fn cancel_twice_is_a_precondition_error() {
        let service = service_with_turno(10).await;
        let created = service
            .create_hold(hold_request(two_adults_one_extra()))
            .await
            .unwrap();

        service.cancel(created.id, "first").await.unwrap();
        let err = service.cancel(created.id, "second").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));

        // seats were only released once
        let turno = service.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 0);
    }

    #[test]
    fn booking_codes_use_the_safe_charset() {
        let code = generate_booking_code("VB");
        let (prefix, suffix) = code.split_once('-').unwrap();
        assert_eq!(prefix, "VB");
        assert_eq!(suffix.len(), CODE_LEN);
        assert!(suffix.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }
}
