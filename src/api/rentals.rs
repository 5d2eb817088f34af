use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RoleGuard};
use crate::models::{
    parse_agreement_period, AgreementStatus, CreateRentalRequest, House, HouseStatus,
    NewNotification, RentalAgreement, RentalAgreementResponse, RentalsQuery, UpdateRentalRequest,
    UserRole,
};
use crate::repository::{
    HouseRepository, NewRentalAgreement, RentalRepository, UserRepository, ViewerScope,
};
use crate::services::Outbox;
use crate::utils::{ApiPath, ApiQuery, ApiResponse, PageParams, Paginated, ValidatedJson};

pub fn routes(state: &AppState) -> Router<AppState> {
    let manage = super::restricted(
        Router::new()
            .route("/", post(create_agreement))
            .route("/:id", put(update_agreement))
            .route("/:id/terminate", put(terminate_agreement)),
        state,
        RoleGuard::LandlordOrAdmin,
    );

    let read = super::protected(
        Router::new()
            .route("/", get(list_agreements))
            .route("/:id", get(get_agreement)),
        state,
    );

    manage.merge(read)
}

fn agreement_not_found() -> AppError {
    AppError::NotFound("Rental agreement not found".to_string())
}

fn is_party(auth: &AuthUser, agreement: &RentalAgreement, house: &House) -> bool {
    auth.is_admin() || agreement.tenant_id == auth.user_id || house.landlord_id == auth.user_id
}

async fn single(state: &AppState, agreement: RentalAgreement) -> AppResult<RentalAgreementResponse> {
    let id = agreement.id;
    RentalRepository::with_relations(&state.pool, vec![agreement])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("Rental agreement {} vanished after write", id)))
}

/// Creates an active agreement and marks the house occupied in the same
/// transaction.
#[utoipa::path(
    post,
    path = "/api/v1/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = CreateRentalRequest,
    responses(
        (status = 201, description = "Agreement created", body = RentalAgreementResponse),
        (status = 400, description = "House not available or invalid dates"),
        (status = 403, description = "Not the owner of the house"),
        (status = 404, description = "House or tenant not found"),
        (status = 409, description = "House already has an active rental agreement")
    )
)]
pub async fn create_agreement(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateRentalRequest>,
) -> AppResult<ApiResponse<RentalAgreementResponse>> {
    let (start_date, end_date) = parse_agreement_period(&payload.start_date, &payload.end_date)?;

    let mut tx = state.pool.begin().await?;

    let house = HouseRepository::lock(&mut *tx, payload.house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    if !auth.is_admin() && house.landlord_id != auth.user_id {
        return Err(AppError::Forbidden(
            "You can only create agreements for your own houses".to_string(),
        ));
    }

    if RentalRepository::has_active_for_house(&mut *tx, house.id).await? {
        return Err(AppError::Conflict(
            "House already has an active rental agreement".to_string(),
        ));
    }

    if house.status != HouseStatus::Available {
        return Err(AppError::BadRequest(
            "House is not available for rent".to_string(),
        ));
    }

    let tenant = UserRepository::find_by_id(&mut *tx, payload.tenant_id)
        .await?
        .filter(|user| user.role == UserRole::Tenant)
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let agreement = RentalRepository::insert(
        &mut *tx,
        &NewRentalAgreement {
            house_id: house.id,
            tenant_id: tenant.id,
            start_date,
            end_date,
            rent_amount: payload.rent_amount,
            deposit: payload.deposit.unwrap_or(Decimal::ZERO),
        },
    )
    .await
    .map_err(|e| e.on_conflict("House already has an active rental agreement"))?;

    HouseRepository::set_status(&mut *tx, house.id, HouseStatus::Occupied).await?;

    let mut outbox = Outbox::new();
    outbox.push(NewNotification::agreement_created(tenant.id, &house.title));
    outbox.commit(tx, &state.notifications).await?;

    tracing::info!(
        agreement_id = %agreement.id,
        house_id = %house.id,
        tenant_id = %tenant.id,
        "Rental agreement created, house occupied"
    );

    Ok(ApiResponse::created(
        "Rental agreement created successfully",
        single(&state, agreement).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "active, terminated or expired"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses((status = 200, description = "Agreements visible to the caller"))
)]
pub async fn list_agreements(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<RentalsQuery>,
) -> AppResult<ApiResponse<Paginated<RentalAgreementResponse>>> {
    let params = PageParams::new(query.page, query.limit);
    let scope = ViewerScope::for_user(&auth.user);

    let agreements =
        RentalRepository::list(&state.pool, scope, query.status, params.limit, params.offset())
            .await?;
    let total = RentalRepository::count(&state.pool, scope, query.status).await?;
    let items = RentalRepository::with_relations(&state.pool, agreements).await?;

    Ok(ApiResponse::ok(
        "Rental agreements retrieved successfully",
        Paginated::new(items, params, total),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agreement id")),
    responses(
        (status = 200, description = "Agreement", body = RentalAgreementResponse),
        (status = 403, description = "Caller is not a party to the agreement"),
        (status = 404, description = "Rental agreement not found")
    )
)]
pub async fn get_agreement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<RentalAgreementResponse>> {
    let agreement = RentalRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(agreement_not_found)?;

    let house = HouseRepository::find_by_id(&state.pool, agreement.house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    if !is_party(&auth, &agreement, &house) {
        return Err(AppError::Forbidden(
            "You don't have access to this agreement".to_string(),
        ));
    }

    Ok(ApiResponse::ok(
        "Rental agreement retrieved successfully",
        single(&state, agreement).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/rentals/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agreement id")),
    request_body = UpdateRentalRequest,
    responses(
        (status = 200, description = "Agreement updated", body = RentalAgreementResponse),
        (status = 400, description = "Status change not allowed"),
        (status = 403, description = "Not the landlord of the house")
    )
)]
pub async fn update_agreement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRentalRequest>,
) -> AppResult<ApiResponse<RentalAgreementResponse>> {
    let agreement = close_agreement(&state, &auth, id, payload.status).await?;

    Ok(ApiResponse::ok(
        "Rental agreement updated successfully",
        single(&state, agreement).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/rentals/{id}/terminate",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Agreement id")),
    responses(
        (status = 200, description = "Agreement terminated, house available again", body = RentalAgreementResponse),
        (status = 400, description = "Only active agreements can be terminated"),
        (status = 403, description = "Not the landlord of the house")
    )
)]
pub async fn terminate_agreement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<RentalAgreementResponse>> {
    let agreement = close_agreement(&state, &auth, id, AgreementStatus::Terminated).await?;

    Ok(ApiResponse::ok(
        "Rental agreement terminated successfully",
        single(&state, agreement).await?,
    ))
}

/// Moves an active agreement to `terminated` or `expired`, frees the house
/// when it is still occupied and notifies the tenant, all in one transaction.
async fn close_agreement(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    next: AgreementStatus,
) -> AppResult<RentalAgreement> {
    let mut tx = state.pool.begin().await?;

    let agreement = RentalRepository::lock(&mut *tx, id)
        .await?
        .ok_or_else(agreement_not_found)?;

    let house = HouseRepository::lock(&mut *tx, agreement.house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    if !auth.is_admin() && house.landlord_id != auth.user_id {
        return Err(AppError::Forbidden(
            "You don't have access to this agreement".to_string(),
        ));
    }

    if !agreement.status.can_transition_to(next) {
        let message = match next {
            AgreementStatus::Terminated => "Only active agreements can be terminated",
            AgreementStatus::Expired => "Only active agreements can expire",
            AgreementStatus::Active => "Agreements cannot be reactivated",
        };
        return Err(AppError::BadRequest(message.to_string()));
    }

    let closed = RentalRepository::close(&mut *tx, id, next)
        .await?
        .ok_or_else(|| AppError::Conflict("Rental agreement is no longer active".to_string()))?;

    let freed =
        HouseRepository::swap_status(&mut *tx, house.id, HouseStatus::Occupied, HouseStatus::Available)
            .await?;

    let mut outbox = Outbox::new();
    outbox.push(match next {
        AgreementStatus::Expired => NewNotification::agreement_expired(closed.tenant_id, &house.title),
        _ => NewNotification::agreement_terminated(closed.tenant_id, &house.title),
    });
    outbox.commit(tx, &state.notifications).await?;

    tracing::info!(
        agreement_id = %closed.id,
        house_id = %house.id,
        status = ?closed.status,
        house_freed = freed,
        "Rental agreement closed"
    );

    Ok(closed)
}
