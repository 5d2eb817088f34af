use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RoleGuard};
use crate::models::{
    CreateReviewRequest, NewNotification, RatingSummary, Review, ReviewResponse, ReviewsQuery,
    UpdateReviewRequest,
};
use crate::repository::{HouseRepository, RentalRepository, ReviewRepository};
use crate::services::Outbox;
use crate::utils::{
    validators::sanitize_string, ApiPath, ApiQuery, ApiResponse, PageParams, Paginated,
    ValidatedJson,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    let create = super::restricted(
        Router::new().route("/", post(create_review)),
        state,
        RoleGuard::TenantOnly,
    );

    let own = super::protected(
        Router::new()
            .route("/my", get(my_reviews))
            .route("/:id", put(update_review).delete(delete_review)),
        state,
    );

    create.merge(own)
}

/// Reviews page of a house with its rating summary.
#[derive(Debug, Serialize)]
pub struct HouseReviews {
    #[serde(flatten)]
    pub page: Paginated<ReviewResponse>,
    #[serde(flatten)]
    pub summary: RatingSummary,
}

async fn load_owned(state: &AppState, auth: &AuthUser, id: Uuid, message: &str) -> AppResult<Review> {
    let review = ReviewRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    if !auth.is_admin() && review.tenant_id != auth.user_id {
        return Err(AppError::Forbidden(message.to_string()));
    }

    Ok(review)
}

async fn single(state: &AppState, review: Review) -> AppResult<ReviewResponse> {
    ReviewRepository::with_relations(&state.pool, vec![review.clone()], true)
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("Review {} vanished after write", review.id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/houses/{id}/reviews",
    tag = "reviews",
    params(
        ("id" = Uuid, Path, description = "House id"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Reviews with average rating and distribution"),
        (status = 404, description = "House not found")
    )
)]
pub async fn house_reviews(
    State(state): State<AppState>,
    ApiPath(house_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ReviewsQuery>,
) -> AppResult<ApiResponse<HouseReviews>> {
    HouseRepository::find_by_id(&state.pool, house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    let params = PageParams::new(query.page, query.limit);
    let reviews =
        ReviewRepository::list_for_house(&state.pool, house_id, params.limit, params.offset())
            .await?;
    let summary =
        RatingSummary::from_counts(&ReviewRepository::rating_counts(&state.pool, house_id).await?);
    let items = ReviewRepository::with_relations(&state.pool, reviews, false).await?;

    Ok(ApiResponse::ok(
        "Reviews retrieved successfully",
        HouseReviews {
            page: Paginated::new(items, params, summary.total_reviews),
            summary,
        },
    ))
}

/// Tenants review houses they rent or have rented, once per house.
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 403, description = "Not a tenant of this house"),
        (status = 409, description = "Already reviewed")
    )
)]
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> AppResult<ApiResponse<ReviewResponse>> {
    let house = HouseRepository::find_by_id(&state.pool, payload.house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    if !RentalRepository::tenant_has_agreement(&state.pool, auth.user_id, house.id, false).await? {
        return Err(AppError::Forbidden(
            "You can only review houses you have rented".to_string(),
        ));
    }

    if ReviewRepository::exists_for(&state.pool, auth.user_id, house.id).await? {
        return Err(AppError::Conflict(
            "You have already reviewed this house".to_string(),
        ));
    }

    let comment = sanitize_string(&payload.comment);

    let mut tx = state.pool.begin().await?;
    let review = ReviewRepository::insert(&mut *tx, auth.user_id, house.id, payload.rating, &comment)
        .await
        .map_err(|e| e.on_conflict("You have already reviewed this house"))?;

    let mut outbox = Outbox::new();
    outbox.push(NewNotification::review_received(
        house.landlord_id,
        review.rating,
        &house.title,
    ));
    outbox.commit(tx, &state.notifications).await?;

    tracing::info!(review_id = %review.id, house_id = %house.id, rating = review.rating, "Review created");

    Ok(ApiResponse::created(
        "Review created successfully",
        single(&state, review).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/my",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("page" = Option<i64>, Query, description = "Page number, starting at 1"), ("limit" = Option<i64>, Query, description = "Items per page")),
    responses((status = 200, description = "Caller's reviews"))
)]
pub async fn my_reviews(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ReviewsQuery>,
) -> AppResult<ApiResponse<Paginated<ReviewResponse>>> {
    let params = PageParams::new(query.page, query.limit);

    let reviews =
        ReviewRepository::list_for_tenant(&state.pool, auth.user_id, params.limit, params.offset())
            .await?;
    let total = ReviewRepository::count_for_tenant(&state.pool, auth.user_id).await?;
    let items = ReviewRepository::with_relations(&state.pool, reviews, true).await?;

    Ok(ApiResponse::ok(
        "Reviews retrieved successfully",
        Paginated::new(items, params, total),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateReviewRequest>,
) -> AppResult<ApiResponse<ReviewResponse>> {
    load_owned(&state, &auth, id, "You can only update your own reviews").await?;

    let comment = payload.comment.as_deref().map(sanitize_string);
    let review =
        ReviewRepository::update(&state.pool, id, payload.rating, comment.as_deref()).await?;

    Ok(ApiResponse::ok(
        "Review updated successfully",
        single(&state, review).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    load_owned(&state, &auth, id, "You can only delete your own reviews").await?;
    ReviewRepository::soft_delete(&state.pool, id).await?;

    Ok(ApiResponse::message("Review deleted successfully"))
}
