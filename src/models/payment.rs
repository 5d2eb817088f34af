use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validators::positive_amount;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    #[sqlx(rename = "MTN")]
    #[serde(rename = "MTN")]
    Mtn,
    Airtel,
    Cash,
    Bank,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [Self::Mtn, Self::Airtel, Self::Cash, Self::Bank];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mtn => "MTN",
            Self::Airtel => "Airtel",
            Self::Cash => "Cash",
            Self::Bank => "Bank",
        }
    }

    /// Prefix of locally synthesized transaction ids.
    pub fn reference_prefix(self) -> &'static str {
        match self {
            Self::Mtn => "MTN",
            Self::Airtel => "AIRTEL",
            Self::Cash => "CASH",
            Self::Bank => "BANK",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Completed, Self::Refunded)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub agreement_id: Uuid,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub reference_no: String,
    pub status: PaymentStatus,
    pub commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    pub agreement_id: Uuid,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(min = 1, max = 128))]
    pub reference_no: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentsQuery {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct PaymentStats {
    pub total_payments: i64,
    pub total_amount: Decimal,
    pub completed_payments: i64,
    pub completed_amount: Decimal,
    pub pending_payments: i64,
    pub failed_payments: i64,
    pub payments_by_method: BTreeMap<String, i64>,
}

/// Platform cut of a payment, rounded half away from zero to cents.
pub fn calculate_commission(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `<PREFIX>_<unix-seconds>` reference used when none is supplied.
pub fn synthesize_reference(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, now.timestamp())
}

/// Disambiguates a synthesized reference that is already taken.
pub fn with_random_suffix(reference: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{}_{:06X}", reference, suffix)
}
