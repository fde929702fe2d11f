//! Reservation domain entity

use chrono::{DateTime, Duration, Utc};

/// Reservation lifecycle state
///
/// `hold` is the initial state; a stale hold is not a live state of its
/// own — the sweeper archives it out of this table entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Reserved, awaiting payment confirmation; expiry stamp set
    Hold,
    /// Payment confirmed
    Confirmed,
    /// Cancelled (operator action or refund); cancellation stamp set
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "hold" => Self::Hold,
            "confirmed" => Self::Confirmed,
            "cancelled" => Self::Cancelled,
            _ => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booking against one turno, owned by one agency and one customer.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Unique reservation ID (0 until persisted)
    pub id: i32,
    /// Human-readable booking code; unique, immutable once issued
    pub booking_code: String,
    /// Owning agency
    pub agency_id: i32,
    /// Booked time-slot
    pub turno_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    /// Total in minor currency units; always equals the sum of item totals
    pub total_amount: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    /// Set only while in `hold`
    pub expires_at: Option<DateTime<Utc>>,
    /// Set only on transition to `cancelled`
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Create a fresh hold with its expiry stamp.
    #[allow(clippy::too_many_arguments)]
    pub fn new_hold(
        booking_code: impl Into<String>,
        agency_id: i32,
        turno_id: i32,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        total_amount: i64,
        currency: impl Into<String>,
        hold_ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            booking_code: booking_code.into(),
            agency_id,
            turno_id,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            total_amount,
            currency: currency.into(),
            status: ReservationStatus::Hold,
            created_at: now,
            expires_at: Some(now + hold_ttl),
            cancelled_at: None,
        }
    }

    /// Move to `confirmed`, clearing the expiry stamp.
    pub fn confirm(&mut self) {
        self.status = ReservationStatus::Confirmed;
        self.expires_at = None;
    }

    /// Move to `cancelled`, stamping the cancellation time.
    pub fn cancel(&mut self) {
        self.status = ReservationStatus::Cancelled;
        self.expires_at = None;
        self.cancelled_at = Some(Utc::now());
    }

    pub fn is_hold(&self) -> bool {
        self.status == ReservationStatus::Hold
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ReservationStatus::Cancelled
    }

    /// Whether this hold is old enough for the sweeper to demote.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.is_hold() && now - self.created_at > max_age
    }
}

// ── Line items ─────────────────────────────────────────────────

/// What a reservation line prices.
///
/// Only `tarifa` lines count toward the occupant total; extras and
/// transport do not consume turno capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// A rate line (adult, child, ...) — counts occupants
    Tarifa,
    /// An add-on (photos, equipment, ...)
    Extra,
    /// A transport option (bus pickup, ...)
    Transport,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tarifa => "tarifa",
            Self::Extra => "extra",
            Self::Transport => "transport",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tarifa" => Some(Self::Tarifa),
            "extra" => Some(Self::Extra),
            "transport" => Some(Self::Transport),
            _ => None,
        }
    }
}

/// A priced line of a reservation. Created atomically with the
/// reservation; immutable afterward except via full cancellation.
#[derive(Debug, Clone)]
pub struct ReservationItem {
    /// Unique item ID (0 until persisted)
    pub id: i32,
    pub reservation_id: i32,
    pub kind: ItemKind,
    /// Catalog entity this line references (tarifa/extra/transport id)
    pub catalog_id: i64,
    pub label: String,
    pub quantity: i32,
    /// Unit price in minor currency units
    pub unit_price: i64,
    /// quantity * unit_price, precomputed at creation
    pub total: i64,
}

impl ReservationItem {
    pub fn new(
        kind: ItemKind,
        catalog_id: i64,
        label: impl Into<String>,
        quantity: i32,
        unit_price: i64,
    ) -> Self {
        Self {
            id: 0,
            reservation_id: 0,
            kind,
            catalog_id,
            label: label.into(),
            quantity,
            unit_price,
            total: quantity as i64 * unit_price,
        }
    }
}

/// Occupants a set of line items consumes: the summed quantity of the
/// `tarifa` lines.
pub fn occupant_count(items: &[ReservationItem]) -> i32 {
    items
        .iter()
        .filter(|i| i.kind == ItemKind::Tarifa)
        .map(|i| i.quantity)
        .sum()
}

/// Sum of line totals; must equal the reservation's `total_amount`.
pub fn items_total(items: &[ReservationItem]) -> i64 {
    items.iter().map(|i| i.total).sum()
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hold() -> Reservation {
        Reservation::new_hold(
            "VB-TEST01",
            1,
            7,
            "Ana Torres",
            "ana@example.com",
            12000,
            "eur",
            Duration::minutes(7),
        )
    }

    #[test]
    fn new_hold_has_expiry_only() {
        let r = sample_hold();
        assert!(r.is_hold());
        assert!(r.expires_at.is_some());
        assert!(r.cancelled_at.is_none());
    }

    #[test]
    fn confirm_clears_expiry() {
        let mut r = sample_hold();
        r.confirm();
        assert!(r.is_confirmed());
        assert!(r.expires_at.is_none());
        assert!(r.cancelled_at.is_none());
    }

    #[test]
    fn cancel_stamps_cancellation() {
        let mut r = sample_hold();
        r.confirm();
        r.cancel();
        assert!(r.is_cancelled());
        assert!(r.expires_at.is_none());
        assert!(r.cancelled_at.is_some());
    }

    #[test]
    fn staleness_only_applies_to_holds() {
        let now = Utc::now();
        let mut r = sample_hold();
        r.created_at = now - Duration::minutes(10);
        assert!(r.is_stale(Duration::minutes(7), now));

        r.confirm();
        assert!(!r.is_stale(Duration::minutes(7), now));
    }

    #[test]
    fn fresh_hold_is_not_stale() {
        let r = sample_hold();
        assert!(!r.is_stale(Duration::minutes(7), Utc::now()));
    }

    #[test]
    fn status_roundtrip() {
        for status in &[
            ReservationStatus::Hold,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
        ] {
            let parsed = ReservationStatus::from_str(status.as_str());
            assert_eq!(&parsed, status);
        }
    }

    #[test]
    fn occupants_count_only_tarifa_lines() {
        let items = vec![
            ReservationItem::new(ItemKind::Tarifa, 11, "Adult", 2, 4500),
            ReservationItem::new(ItemKind::Tarifa, 12, "Child", 1, 2000),
            ReservationItem::new(ItemKind::Extra, 31, "Photo pack", 3, 500),
            ReservationItem::new(ItemKind::Transport, 41, "Bus pickup", 2, 250),
        ];
        assert_eq!(occupant_count(&items), 3);
        assert_eq!(items_total(&items), 2 * 4500 + 2000 + 3 * 500 + 2 * 250);
    }

    #[test]
    fn item_total_is_quantity_times_unit_price() {
        let item = ReservationItem::new(ItemKind::Tarifa, 1, "Adult", 4, 2500);
        assert_eq!(item.total, 10000);
    }

    #[test]
    fn item_kind_roundtrip() {
        for kind in &[ItemKind::Tarifa, ItemKind::Extra, ItemKind::Transport] {
            assert_eq!(ItemKind::from_str(kind.as_str()).as_ref(), Some(kind));
        }
        assert!(ItemKind::from_str("souvenir").is_none());
    }
}
