use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{House, UserPublic};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub house_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub review: Review,
    pub tenant: Option<UserPublic>,
    pub house: Option<House>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    pub house_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 10))]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(length(min = 10))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Average and per-star counts over a house's live reviews.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_distribution: BTreeMap<i32, i64>,
}

impl RatingSummary {
    /// Builds the summary from `(rating, count)` rows; every star from 1 to 5
    /// is present in the distribution.
    pub fn from_counts(rows: &[(i32, i64)]) -> Self {
        let mut distribution: BTreeMap<i32, i64> = (1..=5).map(|star| (star, 0)).collect();
        let mut total = 0_i64;
        let mut weighted = 0_i64;

        for &(rating, count) in rows {
            if let Some(slot) = distribution.get_mut(&rating) {
                *slot += count;
                total += count;
                weighted += i64::from(rating) * count;
            }
        }

        let average_rating = if total == 0 {
            0.0
        } else {
            ((weighted as f64 / total as f64) * 100.0).round() / 100.0
        };

        Self {
            average_rating,
            total_reviews: total,
            rating_distribution: distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: i32) -> CreateReviewRequest {
        CreateReviewRequest {
            house_id: Uuid::new_v4(),
            rating,
            comment: "Quiet street, responsive landlord".to_string(),
        }
    }

    #[test]
    fn rating_bounds() {
        assert!(request(0).validate().is_err());
        assert!(request(6).validate().is_err());
        assert!(request(1).validate().is_ok());
        assert!(request(5).validate().is_ok());
    }

    #[test]
    fn short_comment_is_rejected() {
        let mut req = request(4);
        req.comment = "ok".to_string();
        assert!(req.validate().unwrap_err().field_errors().contains_key("comment"));
    }

    #[test]
    fn summary_of_no_reviews_is_zeroed() {
        let summary = RatingSummary::from_counts(&[]);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.rating_distribution.len(), 5);
        assert!(summary.rating_distribution.values().all(|count| *count == 0));
    }

    #[test]
    fn summary_averages_weighted_counts() {
        let summary = RatingSummary::from_counts(&[(5, 2), (4, 1)]);
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(summary.average_rating, 4.67);
        assert_eq!(summary.rating_distribution[&5], 2);
        assert_eq!(summary.rating_distribution[&1], 0);
    }
}
