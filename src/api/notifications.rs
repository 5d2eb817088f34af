use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser};
use crate::models::{Notification, NotificationStats, NotificationsQuery};
use crate::repository::NotificationRepository;
use crate::utils::{ApiPath, ApiQuery, ApiResponse, PageParams, Paginated};

pub fn routes(state: &AppState) -> Router<AppState> {
    super::protected(
        Router::new()
            .route("/", get(list_notifications))
            .route("/stats", get(notification_stats))
            .route("/read-all", put(mark_all_read))
            .route("/:id", get(get_notification).delete(delete_notification))
            .route("/:id/read", put(mark_read)),
        state,
    )
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MarkAllReadResult {
    pub updated: u64,
}

// Lookups are filtered by recipient, so another user's id reads as missing.
fn notification_not_found() -> AppError {
    AppError::NotFound("Notification not found".to_string())
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread notifications"),
        ("type" = Option<String>, Query, description = "payment, maintenance, agreement, review or general"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses((status = 200, description = "Caller's notifications, newest first"))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<NotificationsQuery>,
) -> AppResult<ApiResponse<Paginated<Notification>>> {
    let params = PageParams::new(query.page, query.limit);
    let unread_only = query.unread_only.unwrap_or(false);

    let notifications = NotificationRepository::list(
        &state.pool,
        auth.user_id,
        unread_only,
        query.kind,
        params.limit,
        params.offset(),
    )
    .await?;
    let total =
        NotificationRepository::count(&state.pool, auth.user_id, unread_only, query.kind).await?;

    Ok(ApiResponse::ok(
        "Notifications retrieved successfully",
        Paginated::new(notifications, params, total),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn get_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Notification>> {
    let notification = NotificationRepository::find_for_user(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(notification_not_found)?;

    Ok(ApiResponse::ok(
        "Notification retrieved successfully",
        notification,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Notification>> {
    let notification = NotificationRepository::mark_read(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(notification_not_found)?;

    Ok(ApiResponse::ok(
        "Notification marked as read successfully",
        notification,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Unread notifications marked as read", body = MarkAllReadResult))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<MarkAllReadResult>> {
    let updated = NotificationRepository::mark_all_read(&state.pool, auth.user_id).await?;

    tracing::debug!(user_id = %auth.user_id, updated, "Notifications marked as read");

    Ok(ApiResponse::ok(
        "All notifications marked as read successfully",
        MarkAllReadResult { updated },
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    if !NotificationRepository::soft_delete(&state.pool, id, auth.user_id).await? {
        return Err(notification_not_found());
    }

    Ok(ApiResponse::message("Notification deleted successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/stats",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Notification statistics", body = NotificationStats))
)]
pub async fn notification_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<NotificationStats>> {
    let stats = NotificationRepository::stats(&state.pool, auth.user_id).await?;

    Ok(ApiResponse::ok(
        "Notification statistics retrieved successfully",
        stats,
    ))
}
