//! Error taxonomy for the reservation/payment engine.
//!
//! Business failures are modelled as [`DomainError`] variants and returned
//! as values; they never panic and never cross the HTTP boundary as raw
//! strings. Each variant carries a stable machine-readable code (see
//! [`DomainError::code`]) that the API envelope exposes alongside the
//! human-readable message.

use thiserror::Error;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid state: {entity} expected {expected}, found {actual}")]
    InvalidState {
        entity: &'static str,
        expected: &'static str,
        actual: String,
    },

    /// Occupying `requested` seats would push the turno past its maximum.
    #[error("Capacity exceeded on turno {turno_id}: requested {requested}, available {available}")]
    CapacityExceeded {
        turno_id: i32,
        requested: i32,
        available: i32,
    },

    /// Releasing `requested` seats would take the occupied count below zero.
    /// Always a bookkeeping bug upstream; never clamped.
    #[error("Capacity underflow on turno {turno_id}: releasing {requested} with only {occupied} occupied")]
    CapacityUnderflow {
        turno_id: i32,
        requested: i32,
        occupied: i32,
    },

    #[error("No paid payment recorded for reservation {reservation_id}")]
    MissingPayment { reservation_id: i32 },

    #[error("Agency {agency_id} has no connected payment account")]
    MissingConnectedAccount { agency_id: i32 },

    #[error("Payment is not refundable: {0}")]
    NotRefundable(String),

    #[error("Refund of {requested} exceeds refundable remainder {refundable}")]
    RefundExceedsPayment { requested: i64, refundable: i64 },

    /// The connected account's available balance cannot cover the amount.
    /// `requested - available` is the shortfall the operator needs to see.
    #[error("Insufficient balance: requested {requested} {currency}, available {available} (short {short})", short = .requested - .available)]
    InsufficientBalance {
        currency: String,
        available: i64,
        requested: i64,
    },

    #[error("Payout schedule is '{current}', manual payouts require 'manual'")]
    ScheduleNotManual { current: String },

    #[error("Payouts are disabled on the connected account")]
    PayoutsDisabled,

    #[error("No external bank account attached to the connected account")]
    NoExternalBankAccount,

    #[error("Invalid payout schedule: {0}")]
    InvalidSchedule(String),

    /// Payment provider rejected or failed a call. Retryable from the
    /// caller's point of view; the dispatcher's event ledger makes the
    /// retry safe.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Storage/database error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Stable machine-readable code for the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::InvalidState { .. } => "invalid_state",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::CapacityUnderflow { .. } => "capacity_underflow",
            Self::MissingPayment { .. } => "missing_payment",
            Self::MissingConnectedAccount { .. } => "missing_connected_account",
            Self::NotRefundable(_) => "not_refundable",
            Self::RefundExceedsPayment { .. } => "refund_exceeds_payment",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::ScheduleNotManual { .. } => "schedule_not_manual",
            Self::PayoutsDisabled => "payouts_disabled",
            Self::NoExternalBankAccount => "no_external_bank_account",
            Self::InvalidSchedule(_) => "invalid_schedule",
            Self::Provider(_) => "provider_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost,
    /// provider 5xx) and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Provider(_))
    }
}

/// Infrastructure failures outside the business taxonomy. These occur
/// during startup (config, migrations, bind) or at serialization
/// boundaries, and end the request or the process rather than the
/// business operation.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_reports_shortfall() {
        let e = DomainError::InsufficientBalance {
            currency: "eur".into(),
            available: 5000,
            requested: 9000,
        };
        let msg = e.to_string();
        assert!(msg.contains("short 4000"), "got: {msg}");
        assert_eq!(e.code(), "insufficient_balance");
    }

    #[test]
    fn transient_classification() {
        assert!(DomainError::Storage("locked".into()).is_transient());
        assert!(DomainError::Provider("timeout".into()).is_transient());
        assert!(!DomainError::PayoutsDisabled.is_transient());
        assert!(!DomainError::Validation("bad".into()).is_transient());
    }

    #[test]
    fn codes_are_stable() {
        let e = DomainError::CapacityExceeded {
            turno_id: 7,
            requested: 3,
            available: 1,
        };
        assert_eq!(e.code(), "capacity_exceeded");
        let e = DomainError::NotFound {
            entity: "Reservation",
            field: "id",
            value: "42".into(),
        };
        assert_eq!(e.code(), "not_found");
    }
}
