//! Abandoned-cart archive entity

use chrono::{DateTime, Utc};

use crate::domain::reservation::{Reservation, ReservationStatus};

/// A swept hold, parked outside the live reservation table so a late
/// payment can still resurrect it. Keyed by the original reservation
/// ID; the booking code stays unique for recovery lookup.
#[derive(Debug, Clone)]
pub struct AbandonedReservation {
    /// Original reservation ID, preserved through archive and recovery
    pub reservation_id: i32,
    pub booking_code: String,
    pub agency_id: i32,
    pub turno_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub currency: String,
    /// Creation time of the original hold
    pub created_at: DateTime<Utc>,
    pub abandoned_at: DateTime<Utc>,
}

impl AbandonedReservation {
    /// Snapshot a hold into its archive form.
    pub fn from_reservation(r: &Reservation) -> Self {
        Self {
            reservation_id: r.id,
            booking_code: r.booking_code.clone(),
            agency_id: r.agency_id,
            turno_id: r.turno_id,
            customer_name: r.customer_name.clone(),
            customer_email: r.customer_email.clone(),
            total_amount: r.total_amount,
            currency: r.currency.clone(),
            created_at: r.created_at,
            abandoned_at: Utc::now(),
        }
    }

    /// Rebuild the live reservation for the recovery path, directly in
    /// `confirmed` since recovery only happens on a successful payment.
    pub fn into_confirmed_reservation(self) -> Reservation {
        Reservation {
            id: self.reservation_id,
            booking_code: self.booking_code,
            agency_id: self.agency_id,
            turno_id: self.turno_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            total_amount: self.total_amount,
            currency: self.currency,
            status: ReservationStatus::Confirmed,
            created_at: self.created_at,
            expires_at: None,
            cancelled_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn swept_hold() -> AbandonedReservation {
        let mut r = Reservation::new_hold(
            "VB-SWEPT1",
            1,
            7,
            "Luis Vega",
            "luis@example.com",
            8000,
            "eur",
            Duration::minutes(7),
        );
        r.id = 42;
        AbandonedReservation::from_reservation(&r)
    }

    #[test]
    fn archive_preserves_identity() {
        let a = swept_hold();
        assert_eq!(a.reservation_id, 42);
        assert_eq!(a.booking_code, "VB-SWEPT1");
    }

    #[test]
    fn recovery_rebuilds_a_confirmed_reservation() {
        let r = swept_hold().into_confirmed_reservation();
        assert_eq!(r.id, 42);
        assert!(r.is_confirmed());
        assert!(r.expires_at.is_none());
        assert!(r.cancelled_at.is_none());
    }
}
