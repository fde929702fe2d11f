//! Agency payout DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::payments::{CurrencyBalance, PayoutInfo};
use crate::application::ports::gateway::{PayoutInterval, PayoutReceipt, PayoutSchedule};
use crate::domain::{DomainError, DomainResult};

/// Per-currency balance bucket
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrencyBalanceDto {
    pub currency: String,
    /// Settled funds, minor units
    pub available: i64,
    /// Funds still settling, minor units
    pub pending: i64,
}

impl From<CurrencyBalance> for CurrencyBalanceDto {
    fn from(b: CurrencyBalance) -> Self {
        Self {
            currency: b.currency,
            available: b.available,
            pending: b.pending,
        }
    }
}

/// Payout cadence on the connected account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PayoutScheduleDto {
    /// "daily", "weekly", "monthly" or "manual"
    pub interval: String,
    /// Weekday name, required when interval is "weekly"
    pub weekly_anchor: Option<String>,
    /// Day of month 1-31, required when interval is "monthly"
    pub monthly_anchor: Option<u8>,
}

impl From<PayoutSchedule> for PayoutScheduleDto {
    fn from(s: PayoutSchedule) -> Self {
        Self {
            interval: s.interval.to_string(),
            weekly_anchor: s.weekly_anchor,
            monthly_anchor: s.monthly_anchor,
        }
    }
}

impl PayoutScheduleDto {
    pub fn into_schedule(self) -> DomainResult<PayoutSchedule> {
        let interval = PayoutInterval::from_str(&self.interval).ok_or_else(|| {
            DomainError::InvalidSchedule(format!("unknown interval '{}'", self.interval))
        })?;
        Ok(PayoutSchedule {
            interval,
            weekly_anchor: self.weekly_anchor,
            monthly_anchor: self.monthly_anchor,
        })
    }
}

/// Payout picture for one agency
#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutInfoDto {
    pub agency_id: i32,
    pub connected_account_id: String,
    pub payouts_enabled: bool,
    pub external_account_count: u32,
    pub schedule: PayoutScheduleDto,
    /// Raw per-currency balances reported by the provider
    pub balances: Vec<CurrencyBalanceDto>,
    /// Display currency the totals below are converted into
    pub primary_currency: String,
    pub total_available_primary: i64,
    pub total_pending_primary: i64,
}

impl From<PayoutInfo> for PayoutInfoDto {
    fn from(info: PayoutInfo) -> Self {
        Self {
            agency_id: info.agency_id,
            connected_account_id: info.connected_account_id,
            payouts_enabled: info.payouts_enabled,
            external_account_count: info.external_account_count,
            schedule: info.schedule.into(),
            balances: info.balances.into_iter().map(Into::into).collect(),
            primary_currency: info.primary_currency,
            total_available_primary: info.total_available_primary,
            total_pending_primary: info.total_pending_primary,
        }
    }
}

/// Request to push a manual payout
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePayoutRequest {
    /// Amount in minor currency units
    #[validate(range(min = 1))]
    pub amount: i64,
    /// ISO currency code of the balance to pay out
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
}

/// Receipt for a created payout
#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutReceiptDto {
    pub id: String,
    pub status: String,
    /// Expected arrival as a unix timestamp, when the provider gives one
    pub arrival_date: Option<i64>,
}

impl From<PayoutReceipt> for PayoutReceiptDto {
    fn from(r: PayoutReceipt) -> Self {
        Self {
            id: r.id,
            status: r.status,
            arrival_date: r.arrival_date,
        }
    }
}
