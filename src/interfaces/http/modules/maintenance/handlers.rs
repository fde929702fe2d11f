//! Maintenance handlers
//!
//! Operator-triggered sweep pass, the same routine the background
//! task runs on its interval.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::booking::{SweepSummary, SweeperService};
use crate::interfaces::http::common::{domain_error_response, ApiResponse};

/// Maintenance handler state
#[derive(Clone)]
pub struct MaintenanceState {
    pub sweeper: Arc<SweeperService>,
}

/// Result of one sweep pass
#[derive(Debug, Serialize, ToSchema)]
pub struct SweepReportDto {
    /// Stale holds archived in this pass
    pub moved: usize,
    /// Holds that could not be archived; details in `errors`
    pub failed: usize,
    pub errors: Vec<String>,
}

impl From<SweepSummary> for SweepReportDto {
    fn from(s: SweepSummary) -> Self {
        Self {
            moved: s.moved,
            failed: s.failed,
            errors: s.errors,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance/sweep",
    tag = "Maintenance",
    responses(
        (status = 200, description = "Sweep pass completed", body = ApiResponse<SweepReportDto>)
    )
)]
pub async fn run_sweep(
    State(state): State<MaintenanceState>,
) -> Result<Json<ApiResponse<SweepReportDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.sweeper.sweep().await {
        Ok(summary) => Ok(Json(ApiResponse::success(summary.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}
