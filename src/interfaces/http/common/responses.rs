//! Common API response envelope

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainError;

/// Standard response wrapper.
///
/// Every REST endpoint returns data in this envelope.
/// On success: `{"success": true, "data": {...}}`,
/// on failure: `{"success": false, "code": "...", "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// `true` when the request was applied
    pub success: bool,
    /// Payload; `null` on failure
    pub data: Option<T>,
    /// Machine-readable failure code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            code: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            code: None,
            error: Some(message.into()),
        }
    }

    /// Failure envelope carrying the domain error's stable code.
    pub fn failure(err: &DomainError) -> Self {
        Self {
            success: false,
            data: None,
            code: Some(err.code().to_string()),
            error: Some(err.to_string()),
        }
    }
}

/// Empty response for operations without return data
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmptyData {}

/// Map a business failure to its HTTP status + envelope.
///
/// Storage errors cross the boundary as a generic 500: their detail
/// (SQL, file paths) stays in the logs.
pub fn domain_error_response(err: &DomainError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) | DomainError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_)
        | DomainError::InvalidState { .. }
        | DomainError::CapacityExceeded { .. }
        | DomainError::CapacityUnderflow { .. } => StatusCode::CONFLICT,
        DomainError::MissingPayment { .. }
        | DomainError::MissingConnectedAccount { .. }
        | DomainError::NotRefundable(_)
        | DomainError::RefundExceedsPayment { .. }
        | DomainError::InsufficientBalance { .. }
        | DomainError::ScheduleNotManual { .. }
        | DomainError::PayoutsDisabled
        | DomainError::NoExternalBankAccount => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Provider(_) => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = if matches!(err, DomainError::Storage(_)) {
        tracing::error!(error = %err, "Storage error reached the request boundary");
        ApiResponse {
            success: false,
            data: None,
            code: Some(err.code().to_string()),
            error: Some("internal error".to_string()),
        }
    } else {
        ApiResponse::failure(err)
    };

    (status, Json(body))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_no_error_fields() {
        let resp = ApiResponse::success(42);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("code").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_envelope_carries_code() {
        let err = DomainError::CapacityExceeded {
            turno_id: 7,
            requested: 3,
            available: 1,
        };
        let resp = ApiResponse::<()>::failure(&err);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "capacity_exceeded");
        assert!(json["error"].as_str().unwrap().contains("turno 7"));
    }

    #[test]
    fn status_mapping() {
        let (status, _) = domain_error_response(&DomainError::NotFound {
            entity: "reservation",
            field: "id",
            value: "5".into(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = domain_error_response(&DomainError::InsufficientBalance {
            currency: "eur".into(),
            available: 5000,
            requested: 9000,
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = domain_error_response(&DomainError::Provider("boom".into()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn storage_detail_never_leaks() {
        let (status, Json(body)) =
            domain_error_response(&DomainError::Storage("sqlite: /var/db locked".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.as_deref(), Some("internal error"));
        assert_eq!(body.code.as_deref(), Some("storage_error"));
    }
}
