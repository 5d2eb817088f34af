use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::UserPublic;
use crate::utils::validators::non_negative;

/// How long a listing stays in the featured filter once promoted.
pub const FEATURED_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "house_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HouseStatus {
    Available,
    Occupied,
    Maintenance,
}

impl Default for HouseStatus {
    fn default() -> Self {
        Self::Available
    }
}

impl HouseStatus {
    /// Checks a status change requested through Update House.
    ///
    /// `occupied` and the way back to `available` belong to the rental
    /// agreement lifecycle; only `maintenance` is a manual switch and it is
    /// reserved for administrators. An administrator may move a house out of
    /// maintenance back to `occupied` while its agreement is still active.
    pub fn check_manual_change(
        self,
        requested: HouseStatus,
        actor_is_admin: bool,
        has_active_agreement: bool,
    ) -> AppResult<()> {
        if self == requested {
            return Ok(());
        }

        match requested {
            HouseStatus::Maintenance if !actor_is_admin => Err(AppError::Forbidden(
                "Only administrators can put a house into maintenance".to_string(),
            )),
            HouseStatus::Maintenance => Ok(()),
            HouseStatus::Occupied
                if self == HouseStatus::Maintenance && actor_is_admin && has_active_agreement =>
            {
                Ok(())
            }
            HouseStatus::Occupied => Err(AppError::BadRequest(
                "House becomes occupied only through a rental agreement".to_string(),
            )),
            HouseStatus::Available if has_active_agreement => Err(AppError::Conflict(
                "House has an active rental agreement".to_string(),
            )),
            HouseStatus::Available => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "house_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HouseType {
    Apartment,
    House,
    Studio,
    Townhouse,
    Commercial,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct House {
    pub id: Uuid,
    pub landlord_id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub monthly_rent: Decimal,
    pub status: HouseStatus,
    pub house_type: HouseType,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_m2: Decimal,
    pub is_featured: bool,
    pub featured_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct HouseImage {
    pub id: Uuid,
    pub house_id: Uuid,
    pub url: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// House with its preloaded landlord and images.
#[derive(Debug, Serialize, ToSchema)]
pub struct HouseResponse {
    #[serde(flatten)]
    pub house: House,
    pub landlord: Option<UserPublic>,
    pub images: Vec<HouseImage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HouseDetailResponse {
    #[serde(flatten)]
    pub house: HouseResponse,
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateHouseRequest {
    #[validate(length(min = 5, max = 200))]
    pub title: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(length(min = 10))]
    pub address: String,
    #[validate(custom(function = "non_negative"))]
    pub monthly_rent: Decimal,
    pub house_type: HouseType,
    #[validate(custom(function = "crate::utils::validators::latitude"))]
    pub latitude: Option<Decimal>,
    #[validate(custom(function = "crate::utils::validators::longitude"))]
    pub longitude: Option<Decimal>,
    #[validate(range(min = 0))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0))]
    pub bathrooms: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub area_m2: Option<Decimal>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateHouseRequest {
    #[validate(length(min = 5, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 10))]
    pub description: Option<String>,
    #[validate(length(min = 10))]
    pub address: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub monthly_rent: Option<Decimal>,
    pub status: Option<HouseStatus>,
    pub house_type: Option<HouseType>,
    #[validate(custom(function = "crate::utils::validators::latitude"))]
    pub latitude: Option<Decimal>,
    #[validate(custom(function = "crate::utils::validators::longitude"))]
    pub longitude: Option<Decimal>,
    #[validate(range(min = 0))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0))]
    pub bathrooms: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub area_m2: Option<Decimal>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HousesQuery {
    pub house_type: Option<HouseType>,
    pub status: Option<HouseStatus>,
    pub min_rent: Option<Decimal>,
    pub max_rent: Option<Decimal>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Resolves the coordinates of a new listing. An explicit (0, 0) pair is
/// refused; when either value is missing the pair falls back to (0, 0).
pub fn resolve_coordinates(
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
) -> AppResult<(Decimal, Decimal)> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) if lat.is_zero() && lon.is_zero() => {
            Err(AppError::BadRequest(
                "Coordinates (0, 0) are not valid, please provide the real location".to_string(),
            ))
        }
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Ok((Decimal::ZERO, Decimal::ZERO)),
    }
}

/// Featured flag and expiry after applying a requested change.
///
/// Promoting starts a fresh period unless the listing is still featured;
/// un-featuring clears the expiry.
pub fn apply_featured(
    current: bool,
    current_until: Option<DateTime<Utc>>,
    requested: Option<bool>,
    now: DateTime<Utc>,
) -> (bool, Option<DateTime<Utc>>) {
    match requested {
        None => (current, current_until),
        Some(false) => (false, None),
        Some(true) => {
            let still_featured = current && current_until.map_or(false, |until| until > now);
            if still_featured {
                (true, current_until)
            } else {
                (true, Some(featured_until_from(now)))
            }
        }
    }
}

pub fn featured_until_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(FEATURED_PERIOD_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_zero_coordinates_are_rejected() {
        let result = resolve_coordinates(Some(Decimal::ZERO), Some(Decimal::ZERO));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn omitted_coordinates_default_to_origin() {
        let (lat, lon) = resolve_coordinates(None, None).unwrap();
        assert!(lat.is_zero() && lon.is_zero());

        let (lat, lon) = resolve_coordinates(Some(Decimal::new(-15_4167, 4)), None).unwrap();
        assert!(lat.is_zero() && lon.is_zero());
    }

    #[test]
    fn real_coordinates_are_kept() {
        let lat = Decimal::new(-15_4167, 4);
        let lon = Decimal::new(28_2833, 4);
        assert_eq!(resolve_coordinates(Some(lat), Some(lon)).unwrap(), (lat, lon));

        // a single zero axis is a legitimate location
        let (kept_lat, kept_lon) = resolve_coordinates(Some(Decimal::ZERO), Some(lon)).unwrap();
        assert!(kept_lat.is_zero());
        assert_eq!(kept_lon, lon);
    }

    #[test]
    fn featuring_sets_a_thirty_day_window() {
        let now = Utc::now();
        let (featured, until) = apply_featured(false, None, Some(true), now);
        assert!(featured);
        assert_eq!(until, Some(now + Duration::days(30)));
    }

    #[test]
    fn featuring_an_already_featured_house_keeps_its_window() {
        let now = Utc::now();
        let until = now + Duration::days(3);
        assert_eq!(
            apply_featured(true, Some(until), Some(true), now),
            (true, Some(until))
        );
    }

    #[test]
    fn featuring_an_expired_listing_restarts_the_window() {
        let now = Utc::now();
        let expired = now - Duration::days(1);
        let (_, until) = apply_featured(true, Some(expired), Some(true), now);
        assert_eq!(until, Some(featured_until_from(now)));
    }

    #[test]
    fn unfeaturing_clears_the_expiry() {
        let now = Utc::now();
        let until = now + Duration::days(10);
        assert_eq!(apply_featured(true, Some(until), Some(false), now), (false, None));
        assert_eq!(
            apply_featured(true, Some(until), None, now),
            (true, Some(until))
        );
    }

    #[test]
    fn only_admin_can_switch_to_maintenance() {
        let landlord = HouseStatus::Available.check_manual_change(HouseStatus::Maintenance, false, false);
        assert!(matches!(landlord, Err(AppError::Forbidden(_))));

        assert!(HouseStatus::Occupied
            .check_manual_change(HouseStatus::Maintenance, true, true)
            .is_ok());
    }

    #[test]
    fn occupied_cannot_be_set_by_hand() {
        let result = HouseStatus::Available.check_manual_change(HouseStatus::Occupied, true, false);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn admin_returns_rented_house_from_maintenance_to_occupied() {
        let restored = HouseStatus::Maintenance.check_manual_change(HouseStatus::Occupied, true, true);
        assert!(restored.is_ok());

        let no_agreement =
            HouseStatus::Maintenance.check_manual_change(HouseStatus::Occupied, true, false);
        assert!(matches!(no_agreement, Err(AppError::BadRequest(_))));

        let landlord = HouseStatus::Maintenance.check_manual_change(HouseStatus::Occupied, false, true);
        assert!(matches!(landlord, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn available_is_refused_while_an_agreement_is_active() {
        let blocked = HouseStatus::Maintenance.check_manual_change(HouseStatus::Available, true, true);
        assert!(matches!(blocked, Err(AppError::Conflict(_))));

        assert!(HouseStatus::Maintenance
            .check_manual_change(HouseStatus::Available, true, false)
            .is_ok());
    }

    #[test]
    fn unchanged_status_is_always_allowed() {
        assert!(HouseStatus::Occupied
            .check_manual_change(HouseStatus::Occupied, false, true)
            .is_ok());
    }

    #[test]
    fn out_of_range_coordinates_fail_validation() {
        let update = UpdateHouseRequest {
            latitude: Some(Decimal::new(91, 0)),
            longitude: Some(Decimal::new(-181, 0)),
            ..Default::default()
        };
        let errors = update.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("latitude"));
        assert!(fields.contains_key("longitude"));

        let update = UpdateHouseRequest {
            latitude: Some(Decimal::new(-154167, 4)),
            longitude: Some(Decimal::new(282833, 4)),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }
}
