use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{House, UserPublic};
use crate::utils::validators::{date_string, non_negative};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "agreement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Active,
    Terminated,
    Expired,
}

impl AgreementStatus {
    /// Agreements are created active and can only leave that state once.
    pub fn can_transition_to(self, next: AgreementStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Terminated) | (Self::Active, Self::Expired)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RentalAgreement {
    pub id: Uuid,
    pub house_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: Decimal,
    pub deposit: Decimal,
    pub status: AgreementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RentalAgreementResponse {
    #[serde(flatten)]
    pub agreement: RentalAgreement,
    pub house: Option<House>,
    pub tenant: Option<UserPublic>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRentalRequest {
    pub house_id: Uuid,
    pub tenant_id: Uuid,
    #[validate(custom(function = "date_string"))]
    pub start_date: String,
    #[validate(custom(function = "date_string"))]
    pub end_date: String,
    #[validate(custom(function = "non_negative"))]
    pub rent_amount: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub deposit: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRentalRequest {
    pub status: AgreementStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct RentalsQuery {
    pub status: Option<AgreementStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Parses both ends of an agreement period; a one-day agreement is valid.
pub fn parse_agreement_period(start: &str, end: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let start_date = parse_date(start).ok_or_else(|| {
        AppError::BadRequest("Invalid start date format. Use YYYY-MM-DD".to_string())
    })?;
    let end_date = parse_date(end).ok_or_else(|| {
        AppError::BadRequest("Invalid end date format. Use YYYY-MM-DD".to_string())
    })?;

    if end_date < start_date {
        return Err(AppError::BadRequest(
            "End date must be after start date".to_string(),
        ));
    }

    Ok((start_date, end_date))
}
