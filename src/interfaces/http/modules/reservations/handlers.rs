//! Reservation lifecycle REST handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{
    CancelReservationRequest, CreateReservationRequest, RefundDto, RefundReservationRequest,
    ReservationDetailResponse, ReservationDto,
};
use crate::application::booking::{NewHold, ReservationService, SweeperService};
use crate::application::payments::RefundOrchestrator;
use crate::domain::reservation::{ItemKind, ReservationItem};
use crate::domain::DomainError;
use crate::interfaces::http::common::{domain_error_response, ApiResponse, ValidatedJson};

/// Booking handler state
#[derive(Clone)]
pub struct BookingState {
    pub reservations: Arc<ReservationService>,
    pub sweeper: Arc<SweeperService>,
    pub refunds: Arc<RefundOrchestrator>,
}

fn build_items(req: &CreateReservationRequest) -> Result<Vec<ReservationItem>, DomainError> {
    req.items
        .iter()
        .map(|item| {
            let kind = ItemKind::from_str(&item.kind).ok_or_else(|| {
                DomainError::Validation(format!("unknown item kind '{}'", item.kind))
            })?;
            Ok(ReservationItem::new(
                kind,
                item.catalog_id,
                &item.label,
                item.quantity,
                item.unit_price,
            ))
        })
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Hold placed", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Agency or turno not found"),
        (status = 409, description = "Not enough seats available"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_reservation(
    State(state): State<BookingState>,
    ValidatedJson(req): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationDto>>), (StatusCode, Json<ApiResponse<()>>)> {
    let items = build_items(&req).map_err(|e| domain_error_response(&e))?;

    let new_hold = NewHold {
        agency_id: req.agency_id,
        turno_id: req.turno_id,
        customer_name: req.customer_name,
        customer_email: req.customer_email,
        total_amount: req.total_amount,
        currency: req.currency.to_lowercase(),
        items,
    };

    match state.reservations.create_hold(new_hold).await {
        Ok(reservation) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(reservation.into())),
        )),
        Err(e) => Err(domain_error_response(&e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation with items", body = ApiResponse<ReservationDetailResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_reservation(
    State(state): State<BookingState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDetailResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let reservation = state
        .reservations
        .get(id)
        .await
        .map_err(|e| domain_error_response(&e))?;
    let items = state
        .reservations
        .items(id)
        .await
        .map_err(|e| domain_error_response(&e))?;

    Ok(Json(ApiResponse::success(ReservationDetailResponse {
        reservation: reservation.into(),
        items: items.into_iter().map(Into::into).collect(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/confirm",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation confirmed", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Reservation is cancelled")
    )
)]
pub async fn confirm_reservation(
    State(state): State<BookingState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.reservations.confirm(id).await {
        Ok(reservation) => Ok(Json(ApiResponse::success(reservation.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = CancelReservationRequest,
    responses(
        (status = 200, description = "Reservation cancelled, seats released", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already cancelled")
    )
)]
pub async fn cancel_reservation(
    State(state): State<BookingState>,
    Path(id): Path<i32>,
    Json(req): Json<CancelReservationRequest>,
) -> Result<Json<ApiResponse<ReservationDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let reason = req.reason.as_deref().unwrap_or("cancelled by operator");
    match state.reservations.cancel(id, reason).await {
        Ok(reservation) => Ok(Json(ApiResponse::success(reservation.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/refund",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = RefundReservationRequest,
    responses(
        (status = 200, description = "Refund issued", body = ApiResponse<RefundDto>),
        (status = 404, description = "Not found"),
        (status = 422, description = "Refund precondition failed"),
        (status = 502, description = "Provider rejected the refund")
    )
)]
pub async fn refund_reservation(
    State(state): State<BookingState>,
    Path(id): Path<i32>,
    ValidatedJson(req): ValidatedJson<RefundReservationRequest>,
) -> Result<Json<ApiResponse<RefundDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state
        .refunds
        .refund(id, req.amount, &req.authorized_by)
        .await
    {
        Ok(refund) => Ok(Json(ApiResponse::success(refund.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/recover",
    tag = "Reservations",
    params(("id" = String, Path, description = "Booking code of the archived reservation")),
    responses(
        (status = 200, description = "Reservation recovered and confirmed", body = ApiResponse<ReservationDto>),
        (status = 404, description = "No archived reservation under this code"),
        (status = 409, description = "Seats no longer available")
    )
)]
pub async fn recover_reservation(
    State(state): State<BookingState>,
    Path(booking_code): Path<String>,
) -> Result<Json<ApiResponse<ReservationDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.sweeper.recover(&booking_code).await {
        Ok(reservation) => Ok(Json(ApiResponse::success(reservation.into()))),
        Err(e) => Err(domain_error_response(&e)),
    }
}
