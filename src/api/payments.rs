use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RequestCancellation};
use crate::models::{CreatePaymentRequest, Payment, PaymentStats, PaymentsQuery};
use crate::repository::{HouseRepository, PaymentRepository, RentalRepository, ViewerScope};
use crate::services::payment::PaymentOutcome;
use crate::utils::{ApiPath, ApiQuery, ApiResponse, PageParams, Paginated, ValidatedJson};

pub fn routes(state: &AppState) -> Router<AppState> {
    super::protected(
        Router::new()
            .route("/", get(list_payments).post(process_payment))
            .route("/stats", get(payment_stats))
            .route("/:id", get(get_payment)),
        state,
    )
}

/// Charges rent through the provider of the chosen method.
///
/// The charge runs on its own task so a client disconnect is observed as a
/// cancellation, which leaves the payment pending instead of aborting the
/// task halfway through settlement.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentOutcome),
        (status = 400, description = "Agreement is not active"),
        (status = 403, description = "Not the tenant of the agreement"),
        (status = 404, description = "Rental agreement not found"),
        (status = 500, description = "Provider failure")
    )
)]
pub async fn process_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    RequestCancellation(cancel): RequestCancellation,
    ValidatedJson(payload): ValidatedJson<CreatePaymentRequest>,
) -> AppResult<ApiResponse<PaymentOutcome>> {
    let orchestrator = state.payments.clone();
    let actor = auth.user;

    let outcome = tokio::spawn(async move { orchestrator.process(&actor, payload, cancel).await })
        .await
        .map_err(|e| AppError::Internal(format!("Payment task failed: {}", e)))??;

    Ok(ApiResponse::created(outcome.message(), outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "pending, completed, failed or refunded"),
        ("method" = Option<String>, Query, description = "MTN, Airtel, Cash or Bank"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses((status = 200, description = "Payments visible to the caller"))
)]
pub async fn list_payments(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<PaymentsQuery>,
) -> AppResult<ApiResponse<Paginated<Payment>>> {
    let params = PageParams::new(query.page, query.limit);
    let scope = ViewerScope::for_user(&auth.user);

    let payments = PaymentRepository::list(
        &state.pool,
        scope,
        query.status,
        query.method,
        params.limit,
        params.offset(),
    )
    .await?;
    let total = PaymentRepository::count(&state.pool, scope, query.status, query.method).await?;

    Ok(ApiResponse::ok(
        "Payments retrieved successfully",
        Paginated::new(payments, params, total),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = Payment),
        (status = 403, description = "Caller is not a party to the payment"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Payment>> {
    let payment = PaymentRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if !auth.is_admin() {
        let agreement = RentalRepository::find_by_id(&state.pool, payment.agreement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rental agreement not found".to_string()))?;

        let is_landlord = HouseRepository::find_by_id(&state.pool, agreement.house_id)
            .await?
            .map_or(false, |house| house.landlord_id == auth.user_id);

        if agreement.tenant_id != auth.user_id && !is_landlord {
            return Err(AppError::Forbidden(
                "You don't have access to this payment".to_string(),
            ));
        }
    }

    Ok(ApiResponse::ok("Payment retrieved successfully", payment))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/stats",
    tag = "payments",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Payment statistics", body = PaymentStats))
)]
pub async fn payment_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<PaymentStats>> {
    let stats = PaymentRepository::stats(&state.pool, ViewerScope::for_user(&auth.user)).await?;

    Ok(ApiResponse::ok(
        "Payment statistics retrieved successfully",
        stats,
    ))
}
