//! Agency payout REST handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{CreatePayoutRequest, PayoutInfoDto, PayoutReceiptDto, PayoutScheduleDto};
use crate::application::payments::PayoutService;
use crate::interfaces::http::common::{domain_error_response, ApiResponse, ValidatedJson};

/// Agency payout handler state
#[derive(Clone)]
pub struct AgencyState {
    pub payouts: Arc<PayoutService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/agencies/{id}/payout-info",
    tag = "Agencies",
    params(("id" = i32, Path, description = "Agency ID")),
    responses(
        (status = 200, description = "Balances, schedule and capabilities", body = ApiResponse<PayoutInfoDto>),
        (status = 404, description = "Agency not found"),
        (status = 422, description = "Agency has no connected account")
    )
)]
pub async fn get_payout_info(
    State(state): State<AgencyState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<PayoutInfoDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.payouts.payout_info(id).await {
        Ok(info) => Ok(Json(ApiResponse::success(info.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/agencies/{id}/payouts",
    tag = "Agencies",
    params(("id" = i32, Path, description = "Agency ID")),
    request_body = CreatePayoutRequest,
    responses(
        (status = 200, description = "Payout pushed to the bank", body = ApiResponse<PayoutReceiptDto>),
        (status = 404, description = "Agency not found"),
        (status = 422, description = "Schedule not manual, payouts disabled or balance too low")
    )
)]
pub async fn create_payout(
    State(state): State<AgencyState>,
    Path(id): Path<i32>,
    ValidatedJson(req): ValidatedJson<CreatePayoutRequest>,
) -> Result<Json<ApiResponse<PayoutReceiptDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state
        .payouts
        .create_manual_payout(id, req.amount, &req.currency)
        .await
    {
        Ok(receipt) => Ok(Json(ApiResponse::success(receipt.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/agencies/{id}/payout-schedule",
    tag = "Agencies",
    params(("id" = i32, Path, description = "Agency ID")),
    request_body = PayoutScheduleDto,
    responses(
        (status = 200, description = "Schedule applied on the connected account", body = ApiResponse<PayoutScheduleDto>),
        (status = 400, description = "Invalid schedule"),
        (status = 404, description = "Agency not found")
    )
)]
pub async fn update_payout_schedule(
    State(state): State<AgencyState>,
    Path(id): Path<i32>,
    Json(req): Json<PayoutScheduleDto>,
) -> Result<Json<ApiResponse<PayoutScheduleDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let schedule = req.into_schedule().map_err(|e| domain_error_response(&e))?;

    match state.payouts.update_payout_schedule(id, schedule).await {
        Ok(applied) => Ok(Json(ApiResponse::success(applied.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}
