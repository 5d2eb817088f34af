use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Payment,
    Maintenance,
    Agreement,
    Review,
    General,
}

impl Default for NotificationType {
    fn default() -> Self {
        Self::General
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: NotificationType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Notification waiting in an outbox for its transaction to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
}

impl NewNotification {
    pub fn agreement_created(tenant_id: Uuid, house_title: &str) -> Self {
        Self {
            user_id: tenant_id,
            title: "New Rental Agreement".to_string(),
            message: format!("You have a new rental agreement for {}", house_title),
            kind: NotificationType::Agreement,
        }
    }

    pub fn agreement_terminated(tenant_id: Uuid, house_title: &str) -> Self {
        Self {
            user_id: tenant_id,
            title: "Rental Agreement Terminated".to_string(),
            message: format!("Your rental agreement for {} has been terminated", house_title),
            kind: NotificationType::Agreement,
        }
    }

    pub fn agreement_expired(tenant_id: Uuid, house_title: &str) -> Self {
        Self {
            user_id: tenant_id,
            title: "Rental Agreement Expired".to_string(),
            message: format!("Your rental agreement for {} has expired", house_title),
            kind: NotificationType::Agreement,
        }
    }

    pub fn payment_received(landlord_id: Uuid, amount: Decimal, house_title: &str) -> Self {
        Self {
            user_id: landlord_id,
            title: "New Payment Received".to_string(),
            message: format!(
                "Payment of ZMW {:.2} received for {}",
                amount,
                house_title
            ),
            kind: NotificationType::Payment,
        }
    }

    pub fn review_received(landlord_id: Uuid, rating: i32, house_title: &str) -> Self {
        Self {
            user_id: landlord_id,
            title: "New Review Received".to_string(),
            message: format!("You received a {}-star review for {}", rating, house_title),
            kind: NotificationType::Review,
        }
    }

    pub fn maintenance_created(landlord_id: Uuid, house_title: &str, request_title: &str) -> Self {
        Self {
            user_id: landlord_id,
            title: "New Maintenance Request".to_string(),
            message: format!(
                "New maintenance request for {}: {}",
                house_title, request_title
            ),
            kind: NotificationType::Maintenance,
        }
    }

    pub fn maintenance_updated(tenant_id: Uuid, request_title: &str, status: &str) -> Self {
        Self {
            user_id: tenant_id,
            title: "Maintenance Request Updated".to_string(),
            message: format!(
                "Your maintenance request '{}' has been updated to: {}",
                request_title, status
            ),
            kind: NotificationType::Maintenance,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    pub unread_only: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct NotificationStats {
    pub total_notifications: i64,
    pub unread_notifications: i64,
    pub notifications_by_type: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_message_shows_two_decimals() {
        let landlord = Uuid::new_v4();
        let n = NewNotification::payment_received(landlord, Decimal::new(5000, 0), "Kabulonga Villa");

        assert_eq!(n.user_id, landlord);
        assert_eq!(n.kind, NotificationType::Payment);
        assert_eq!(n.message, "Payment of ZMW 5000.00 received for Kabulonga Villa");
    }

    #[test]
    fn review_message_carries_rating() {
        let n = NewNotification::review_received(Uuid::new_v4(), 4, "Roma Flat");
        assert_eq!(n.message, "You received a 4-star review for Roma Flat");
        assert_eq!(n.kind, NotificationType::Review);
    }

    #[test]
    fn notification_serializes_kind_as_type() {
        let now = Utc::now();
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".to_string(),
            message: "m".to_string(),
            is_read: false,
            kind: NotificationType::Agreement,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let body = serde_json::to_value(&n).unwrap();
        assert_eq!(body["type"], "agreement");
        assert!(body.get("kind").is_none());
    }
}
