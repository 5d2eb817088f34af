use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{House, UserPublic};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Resolved,
    Cancelled,
}

impl Default for MaintenanceStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl MaintenanceStatus {
    pub fn can_transition_to(self, next: MaintenanceStatus) -> bool {
        use MaintenanceStatus::*;

        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Resolved)
                | (Pending, Cancelled)
                | (InProgress, Cancelled)
                | (Resolved, Cancelled)
        )
    }

    /// Validates the transition and returns the `resolved_at` value the row
    /// must carry afterwards.
    pub fn transition(
        self,
        next: MaintenanceStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        if !self.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot change maintenance status from {} to {}",
                self.as_str(),
                next.as_str()
            )));
        }

        Ok(match next {
            MaintenanceStatus::Resolved => Some(now),
            _ => None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "maintenance_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for MaintenancePriority {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub house_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MaintenanceRequestResponse {
    #[serde(flatten)]
    pub request: MaintenanceRequest,
    pub house: Option<House>,
    pub tenant: Option<UserPublic>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenanceRequest {
    pub house_id: Uuid,
    #[validate(length(min = 5, max = 200))]
    pub title: String,
    #[validate(length(min = 10))]
    pub description: String,
    pub priority: Option<MaintenancePriority>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMaintenanceRequest {
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceQuery {
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct MaintenanceStats {
    pub total_requests: i64,
    pub requests_by_status: BTreeMap<String, i64>,
    pub requests_by_priority: BTreeMap<String, i64>,
    pub avg_resolution_days: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use MaintenanceStatus::*;

    #[test]
    fn forward_path_is_pending_in_progress_resolved() {
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(!Pending.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn every_open_state_can_be_cancelled() {
        for state in [Pending, InProgress, Resolved] {
            assert!(state.can_transition_to(Cancelled));
        }
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn resolving_stamps_resolved_at() {
        let now = Utc::now();
        assert_eq!(InProgress.transition(Resolved, now).unwrap(), Some(now));
    }

    #[test]
    fn leaving_resolved_clears_resolved_at() {
        let now = Utc::now();
        assert_eq!(Resolved.transition(Cancelled, now).unwrap(), None);
        assert_eq!(Pending.transition(InProgress, now).unwrap(), None);
    }

    #[test]
    fn illegal_transition_is_a_bad_request() {
        let err = Pending.transition(Resolved, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("pending to resolved")));
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(MaintenancePriority::default(), MaintenancePriority::Medium);
    }
}
