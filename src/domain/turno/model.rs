//! Turno (time-slot) domain entity

use chrono::{DateTime, Utc};

/// A scheduled, capacity-bounded occurrence of an activity.
///
/// `occupied` is only ever mutated through the capacity ledger's atomic
/// occupy/release primitives, never by direct field assignment, so the
/// `0 <= occupied <= max_capacity` invariant holds under concurrent holds
/// and releases.
#[derive(Debug, Clone)]
pub struct Turno {
    /// Unique turno ID
    pub id: i32,
    /// Activity label (e.g. "Kayak Sunset Tour")
    pub activity: String,
    /// When this occurrence starts
    pub starts_at: DateTime<Utc>,
    /// Maximum seats
    pub max_capacity: i32,
    /// Currently occupied seats
    pub occupied: i32,
}

impl Turno {
    pub fn new(
        id: i32,
        activity: impl Into<String>,
        starts_at: DateTime<Utc>,
        max_capacity: i32,
    ) -> Self {
        Self {
            id,
            activity: activity.into(),
            starts_at,
            max_capacity,
            occupied: 0,
        }
    }

    /// Seats still available for new holds.
    pub fn available(&self) -> i32 {
        self.max_capacity - self.occupied
    }

    pub fn has_space(&self, count: i32) -> bool {
        self.occupied + count <= self.max_capacity
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_turno() -> Turno {
        Turno::new(1, "Kayak Sunset Tour", Utc::now(), 10)
    }

    #[test]
    fn new_turno_is_empty() {
        let t = sample_turno();
        assert_eq!(t.occupied, 0);
        assert_eq!(t.available(), 10);
        assert!(t.has_space(10));
    }

    #[test]
    fn has_space_respects_maximum() {
        let mut t = sample_turno();
        t.occupied = 8;
        assert!(t.has_space(2));
        assert!(!t.has_space(3));
        assert_eq!(t.available(), 2);
    }
}
