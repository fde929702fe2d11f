//! Turno repository interface

use async_trait::async_trait;

use super::model::Turno;
use crate::domain::DomainResult;

#[async_trait]
pub trait TurnoRepository: Send + Sync {
    /// Save a new turno
    async fn save(&self, turno: Turno) -> DomainResult<()>;

    /// Find turno by ID
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Turno>>;

    /// Atomically occupy `count` seats.
    ///
    /// Must be implemented as a single conditional update so that
    /// concurrent callers on the same turno are linearized by the storage
    /// layer. Fails with `CapacityExceeded` when the occupy would push
    /// `occupied` past `max_capacity`.
    async fn occupy_seats(&self, turno_id: i32, count: i32) -> DomainResult<()>;

    /// Atomically release `count` seats.
    ///
    /// Fails with `CapacityUnderflow` when the release would take
    /// `occupied` below zero — an upstream bookkeeping bug, never clamped.
    async fn release_seats(&self, turno_id: i32, count: i32) -> DomainResult<()>;
}
