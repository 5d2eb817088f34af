use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RoleGuard};
use crate::models::{
    CreateMaintenanceRequest, MaintenanceQuery, MaintenanceRequest, MaintenanceRequestResponse,
    MaintenanceStats, NewNotification, UpdateMaintenanceRequest,
};
use crate::repository::{
    HouseRepository, MaintenanceRepository, NewMaintenanceRequest, RentalRepository, ViewerScope,
};
use crate::services::Outbox;
use crate::utils::{
    validators::sanitize_string, ApiPath, ApiQuery, ApiResponse, PageParams, Paginated,
    ValidatedJson,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    let report = super::restricted(
        Router::new().route("/", post(create_request)),
        state,
        RoleGuard::TenantOnly,
    );

    let handle = super::restricted(
        Router::new().route("/:id", put(update_request)),
        state,
        RoleGuard::LandlordOrAdmin,
    );

    let read = super::protected(
        Router::new()
            .route("/", get(list_requests))
            .route("/stats", get(maintenance_stats))
            .route("/:id", get(get_request)),
        state,
    );

    report.merge(handle).merge(read)
}

fn request_not_found() -> AppError {
    AppError::NotFound("Maintenance request not found".to_string())
}

async fn single(state: &AppState, request: MaintenanceRequest) -> AppResult<MaintenanceRequestResponse> {
    let id = request.id;
    MaintenanceRepository::with_relations(&state.pool, vec![request])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("Maintenance request {} vanished after write", id)))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    request_body = CreateMaintenanceRequest,
    responses(
        (status = 201, description = "Request created, landlord notified", body = MaintenanceRequestResponse),
        (status = 403, description = "No active agreement for this house"),
        (status = 404, description = "House not found")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateMaintenanceRequest>,
) -> AppResult<ApiResponse<MaintenanceRequestResponse>> {
    let house = HouseRepository::find_by_id(&state.pool, payload.house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    if !RentalRepository::tenant_has_agreement(&state.pool, auth.user_id, house.id, true).await? {
        return Err(AppError::Forbidden(
            "You can only create maintenance requests for houses you rent".to_string(),
        ));
    }

    let title = sanitize_string(&payload.title);
    let description = sanitize_string(&payload.description);

    let mut tx = state.pool.begin().await?;
    let request = MaintenanceRepository::insert(
        &mut *tx,
        &NewMaintenanceRequest {
            tenant_id: auth.user_id,
            house_id: house.id,
            title: &title,
            description: &description,
            priority: payload.priority.unwrap_or_default(),
        },
    )
    .await?;

    let mut outbox = Outbox::new();
    outbox.push(NewNotification::maintenance_created(
        house.landlord_id,
        &house.title,
        &request.title,
    ));
    outbox.commit(tx, &state.notifications).await?;

    tracing::info!(request_id = %request.id, house_id = %house.id, priority = ?request.priority, "Maintenance request created");

    Ok(ApiResponse::created(
        "Maintenance request created successfully",
        single(&state, request).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "pending, in_progress, resolved or cancelled"),
        ("priority" = Option<String>, Query, description = "low, medium, high or urgent"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses((status = 200, description = "Requests visible to the caller"))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<MaintenanceQuery>,
) -> AppResult<ApiResponse<Paginated<MaintenanceRequestResponse>>> {
    let params = PageParams::new(query.page, query.limit);
    let scope = ViewerScope::for_user(&auth.user);

    let requests = MaintenanceRepository::list(
        &state.pool,
        scope,
        query.status,
        query.priority,
        params.limit,
        params.offset(),
    )
    .await?;
    let total = MaintenanceRepository::count(&state.pool, scope, query.status, query.priority).await?;
    let items = MaintenanceRepository::with_relations(&state.pool, requests).await?;

    Ok(ApiResponse::ok(
        "Maintenance requests retrieved successfully",
        Paginated::new(items, params, total),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Maintenance request id")),
    responses(
        (status = 200, description = "Maintenance request", body = MaintenanceRequestResponse),
        (status = 403, description = "Caller is not a party to the request"),
        (status = 404, description = "Maintenance request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<MaintenanceRequestResponse>> {
    let request = MaintenanceRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(request_not_found)?;

    if !auth.is_admin() && request.tenant_id != auth.user_id {
        let is_landlord = HouseRepository::find_by_id(&state.pool, request.house_id)
            .await?
            .map_or(false, |house| house.landlord_id == auth.user_id);

        if !is_landlord {
            return Err(AppError::Forbidden(
                "You don't have access to this maintenance request".to_string(),
            ));
        }
    }

    Ok(ApiResponse::ok(
        "Maintenance request retrieved successfully",
        single(&state, request).await?,
    ))
}

/// Landlord of the house or an admin moves the request along its lifecycle;
/// a status change notifies the tenant.
#[utoipa::path(
    put,
    path = "/api/v1/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Maintenance request id")),
    request_body = UpdateMaintenanceRequest,
    responses(
        (status = 200, description = "Request updated", body = MaintenanceRequestResponse),
        (status = 400, description = "Status change not allowed"),
        (status = 403, description = "Not the landlord of the house"),
        (status = 404, description = "Maintenance request not found")
    )
)]
pub async fn update_request(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateMaintenanceRequest>,
) -> AppResult<ApiResponse<MaintenanceRequestResponse>> {
    let mut tx = state.pool.begin().await?;

    let current = MaintenanceRepository::lock(&mut *tx, id)
        .await?
        .ok_or_else(request_not_found)?;

    let house = HouseRepository::find_by_id(&mut *tx, current.house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    if !auth.is_admin() && house.landlord_id != auth.user_id {
        return Err(AppError::Forbidden(
            "You don't have access to this maintenance request".to_string(),
        ));
    }

    let (status, resolved_at) = match payload.status {
        Some(next) if next != current.status => (next, current.status.transition(next, Utc::now())?),
        _ => (current.status, current.resolved_at),
    };
    let priority = payload.priority.unwrap_or(current.priority);

    let updated = MaintenanceRepository::update(&mut *tx, id, status, resolved_at, priority).await?;

    let mut outbox = Outbox::new();
    if updated.status != current.status {
        outbox.push(NewNotification::maintenance_updated(
            updated.tenant_id,
            &updated.title,
            updated.status.as_str(),
        ));
    }
    outbox.commit(tx, &state.notifications).await?;

    tracing::info!(
        request_id = %updated.id,
        from = current.status.as_str(),
        to = updated.status.as_str(),
        "Maintenance request updated"
    );

    Ok(ApiResponse::ok(
        "Maintenance request updated successfully",
        single(&state, updated).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/stats",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Maintenance statistics", body = MaintenanceStats))
)]
pub async fn maintenance_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<MaintenanceStats>> {
    let stats = MaintenanceRepository::stats(&state.pool, ViewerScope::for_user(&auth.user)).await?;

    Ok(ApiResponse::ok(
        "Maintenance statistics retrieved successfully",
        stats,
    ))
}
