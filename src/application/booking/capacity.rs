//! Capacity ledger over turno occupancy
//!
//! The only writer of `turnos.occupied`. Both primitives delegate to a
//! single conditional update at the storage layer, so concurrent holds
//! and releases on the same turno are linearized by the store rather
//! than by an in-process lock (multiple engine instances may run
//! against the same database).

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Service guarding the `0 <= occupied <= max_capacity` invariant.
pub struct CapacityLedger {
    repos: Arc<dyn RepositoryProvider>,
}

impl CapacityLedger {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Take `count` seats on a turno. Zero-count calls are no-ops.
    ///
    /// Fails with `CapacityExceeded` when the turno cannot fit the
    /// request; nothing is partially applied.
    pub async fn occupy_seats(&self, turno_id: i32, count: i32) -> DomainResult<()> {
        if count < 0 {
            return Err(DomainError::Validation(format!(
                "seat count must not be negative, got {count}"
            )));
        }
        if count == 0 {
            return Ok(());
        }

        match self.repos.turnos().occupy_seats(turno_id, count).await {
            Ok(()) => {
                info!(turno_id, seats = count, "Seats occupied");
                Ok(())
            }
            Err(e @ DomainError::CapacityExceeded { .. }) => {
                warn!(turno_id, seats = count, error = %e, "Occupy rejected");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Give back `count` seats on a turno. Zero-count calls are no-ops.
    ///
    /// An underflow (releasing more than is occupied) indicates a
    /// double release somewhere upstream and fails loudly; the counter
    /// is never clamped.
    pub async fn release_seats(&self, turno_id: i32, count: i32) -> DomainResult<()> {
        if count < 0 {
            return Err(DomainError::Validation(format!(
                "seat count must not be negative, got {count}"
            )));
        }
        if count == 0 {
            return Ok(());
        }

        match self.repos.turnos().release_seats(turno_id, count).await {
            Ok(()) => {
                info!(turno_id, seats = count, "Seats released");
                Ok(())
            }
            Err(e @ DomainError::CapacityUnderflow { .. }) => {
                error!(turno_id, seats = count, error = %e, "Release underflow");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Turno;
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;

    async fn ledger_with_turno(max_capacity: i32, occupied: i32) -> CapacityLedger {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let mut turno = Turno::new(7, "Sunset kayak", chrono::Utc::now(), max_capacity);
        turno.occupied = occupied;
        repos.turnos().save(turno).await.unwrap();
        CapacityLedger::new(repos)
    }

    #[tokio::test]
    async fn occupy_and_release_roundtrip() {
        let ledger = ledger_with_turno(10, 0).await;
        ledger.occupy_seats(7, 4).await.unwrap();
        ledger.release_seats(7, 4).await.unwrap();

        let turno = ledger.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 0);
    }

    #[tokio::test]
    async fn occupy_beyond_capacity_is_rejected_whole() {
        let ledger = ledger_with_turno(10, 8).await;
        let err = ledger.occupy_seats(7, 3).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::CapacityExceeded { requested: 3, available: 2, .. }
        ));

        // nothing partially applied
        let turno = ledger.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(turno.occupied, 8);
    }

    #[tokio::test]
    async fn release_below_zero_is_rejected() {
        let ledger = ledger_with_turno(10, 1).await;
        let err = ledger.release_seats(7, 2).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::CapacityUnderflow { requested: 2, occupied: 1, .. }
        ));
    }

    #[tokio::test]
    async fn zero_count_calls_are_noops() {
        let ledger = ledger_with_turno(2, 2).await;
        // would fail if it actually touched the counter
        ledger.occupy_seats(7, 0).await.unwrap();
        ledger.release_seats(999, 0).await.unwrap();
    }

    #[tokio::test]
    async fn negative_counts_are_invalid() {
        let ledger = ledger_with_turno(10, 5).await;
        assert!(ledger.occupy_seats(7, -1).await.is_err());
        assert!(ledger.release_seats(7, -1).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_occupies_never_oversell() {
        let ledger = Arc::new(ledger_with_turno(10, 0).await);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.occupy_seats(7, 1).await.is_ok()
            }));
        }

        let mut granted = 0;
        for h in handles {
            if h.await.unwrap() {
                granted += 1;
            }
        }

        let turno = ledger.repos.turnos().find_by_id(7).await.unwrap().unwrap();
        assert_eq!(granted, 10);
        assert_eq!(turno.occupied, 10);
    }
}
