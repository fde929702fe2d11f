//! Reservation DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::payment::Refund;
use crate::domain::reservation::{Reservation, ReservationItem};

/// One priced line of a new hold
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct ItemRequest {
    /// Line kind: "tarifa" (counts occupants), "extra" or "transport"
    pub kind: String,
    /// Catalog reference of the priced article
    pub catalog_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub label: String,
    #[validate(range(min = 1, max = 99))]
    pub quantity: i32,
    /// Price per unit in minor currency units
    #[validate(range(min = 0))]
    pub unit_price: i64,
}

/// Request to place a hold
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateReservationRequest {
    pub agency_id: i32,
    pub turno_id: i32,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    /// Declared grand total in minor units; must equal the item sum
    #[validate(range(min = 0))]
    pub total_amount: i64,
    /// ISO currency code, e.g. "eur"
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
    #[validate(length(min = 1), nested)]
    pub items: Vec<ItemRequest>,
}

/// Request to cancel a reservation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelReservationRequest {
    /// Recorded in the cancellation notification
    pub reason: Option<String>,
}

/// Request to refund a reservation's payment
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RefundReservationRequest {
    /// Amount in minor units. Omitted means the customer-facing
    /// default: the payment minus commission and processor fee.
    #[validate(range(min = 1))]
    pub amount: Option<i64>,
    /// Operator who authorized the refund
    #[validate(length(min = 1, max = 100))]
    pub authorized_by: String,
}

/// Reservation details in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: i32,
    pub booking_code: String,
    pub agency_id: i32,
    pub turno_id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            booking_code: r.booking_code,
            agency_id: r.agency_id,
            turno_id: r.turno_id,
            customer_name: r.customer_name,
            customer_email: r.customer_email,
            total_amount: r.total_amount,
            currency: r.currency,
            status: r.status.to_string(),
            created_at: r.created_at.to_rfc3339(),
            expires_at: r.expires_at.map(|t| t.to_rfc3339()),
            cancelled_at: r.cancelled_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Line item in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationItemDto {
    pub id: i32,
    pub kind: String,
    pub catalog_id: i64,
    pub label: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

impl From<ReservationItem> for ReservationItemDto {
    fn from(item: ReservationItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind.as_str().to_string(),
            catalog_id: item.catalog_id,
            label: item.label,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
        }
    }
}

/// Reservation with its line items
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDetailResponse {
    pub reservation: ReservationDto,
    pub items: Vec<ReservationItemDto>,
}

/// Issued refund in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct RefundDto {
    pub id: i32,
    pub reservation_id: i32,
    pub provider_refund_id: String,
    pub amount: i64,
    pub status: String,
    pub authorized_by: String,
    /// True when the refund was issued directly from the account
    /// balance because the transfer reversal was rejected
    pub fallback_used: bool,
    pub created_at: String,
}

impl From<Refund> for RefundDto {
    fn from(r: Refund) -> Self {
        Self {
            id: r.id,
            reservation_id: r.reservation_id,
            provider_refund_id: r.provider_refund_id,
            amount: r.amount,
            status: r.status,
            authorized_by: r.authorized_by,
            fallback_used: r.fallback_used,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}
