use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RoleGuard};
use crate::models::{
    DashboardStats, HouseReport, PaymentReport, ReportQuery, ReportType, ReportWindow,
    UpdateUserStatusRequest, UserPublic, UserReport, UsersQuery,
};
use crate::repository::{stats, UserRepository};
use crate::utils::{
    validators::search_pattern, ApiPath, ApiQuery, ApiResponse, PageParams, Paginated,
    ValidatedJson,
};

const USERS_PAGE_LIMIT: i64 = 20;

pub fn routes(state: &AppState) -> Router<AppState> {
    super::restricted(
        Router::new()
            .route("/dashboard", get(dashboard))
            .route("/users", get(list_users))
            .route("/users/:id/status", put(update_user_status))
            .route("/reports", get(reports)),
        state,
        RoleGuard::AdminOnly,
    )
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Payments(PaymentReport),
    Houses(HouseReport),
    Users(UserReport),
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Platform counters", body = DashboardStats),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn dashboard(State(state): State<AppState>) -> AppResult<ApiResponse<DashboardStats>> {
    let stats = stats::dashboard(&state.pool, Utc::now()).await?;

    Ok(ApiResponse::ok(
        "Dashboard statistics retrieved successfully",
        stats,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("role" = Option<String>, Query, description = "landlord, tenant, agent or admin"),
        ("search" = Option<String>, Query, description = "Substring of name or email"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses((status = 200, description = "Page of users"))
)]
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> AppResult<ApiResponse<Paginated<UserPublic>>> {
    let params = PageParams::with_default_limit(query.page, query.limit, USERS_PAGE_LIMIT);
    let search = search_pattern(query.search.as_deref());

    let users = UserRepository::list(
        &state.pool,
        query.role,
        search.as_deref(),
        params.limit,
        params.offset(),
    )
    .await?;
    let total = UserRepository::count(&state.pool, query.role, search.as_deref()).await?;

    Ok(ApiResponse::ok(
        "Users retrieved successfully",
        Paginated::new(users.into_iter().map(UserPublic::from).collect(), params, total),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/status",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "User status updated", body = UserPublic),
        (status = 400, description = "Admins cannot deactivate themselves"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserStatusRequest>,
) -> AppResult<ApiResponse<UserPublic>> {
    if id == auth.user_id && !payload.is_active {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let user = UserRepository::set_active(&state.pool, id, payload.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(admin_id = %auth.user_id, user_id = %user.id, is_active = user.is_active, "User status changed");

    Ok(ApiResponse::ok(
        "User status updated successfully",
        UserPublic::from(user),
    ))
}

/// `type` selects payments, houses or users; the window defaults to the
/// last month and explicit dates include the whole end day.
#[utoipa::path(
    get,
    path = "/api/v1/admin/reports",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("type" = String, Query, description = "payments, houses or users"),
        ("start_date" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Report for the window"),
        (status = 400, description = "Invalid report type or dates"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn reports(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> AppResult<ApiResponse<Report>> {
    let report_type = ReportType::parse(query.report_type.as_deref())?;
    let window = ReportWindow::resolve(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        Utc::now(),
    )?;

    let (message, report) = match report_type {
        ReportType::Payments => (
            "Payment report generated successfully",
            Report::Payments(stats::payment_report(&state.pool, window).await?),
        ),
        ReportType::Houses => (
            "House report generated successfully",
            Report::Houses(stats::house_report(&state.pool, window).await?),
        ),
        ReportType::Users => (
            "User report generated successfully",
            Report::Users(stats::user_report(&state.pool, window).await?),
        ),
    };

    Ok(ApiResponse::ok(message, report))
}
