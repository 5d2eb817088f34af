use std::collections::HashMap;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RoleGuard};
use crate::models::{Favorite, FavoriteCheck, FavoriteResponse};
use crate::repository::{FavoriteRepository, HouseRepository};
use crate::utils::{ApiPath, ApiQuery, ApiResponse, PageParams, Paginated};

pub fn routes(state: &AppState) -> Router<AppState> {
    super::restricted(
        Router::new()
            .route("/", get(list_favorites))
            .route("/:house_id", post(add_favorite).delete(remove_favorite))
            .route("/:house_id/check", get(check_favorite)),
        state,
        RoleGuard::TenantOrAdmin,
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoritesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Only tenants keep favorites; admins pass the route guard but cannot add.
#[utoipa::path(
    post,
    path = "/api/v1/favorites/{house_id}",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(("house_id" = Uuid, Path, description = "House id")),
    responses(
        (status = 201, description = "House added to favorites", body = Favorite),
        (status = 403, description = "Only tenants can add favorites"),
        (status = 404, description = "House not found"),
        (status = 409, description = "House already in favorites")
    )
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(house_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Favorite>> {
    if !auth.role.is_tenant() {
        return Err(AppError::Forbidden(
            "Only tenants can add houses to favorites".to_string(),
        ));
    }

    HouseRepository::find_by_id(&state.pool, house_id)
        .await?
        .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

    let favorite = FavoriteRepository::insert(&state.pool, auth.user_id, house_id)
        .await
        .map_err(|e| e.on_conflict("House already in favorites"))?;

    Ok(ApiResponse::created(
        "House added to favorites successfully",
        favorite,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/favorites/{house_id}",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(("house_id" = Uuid, Path, description = "House id")),
    responses(
        (status = 200, description = "House removed from favorites"),
        (status = 404, description = "House not in favorites")
    )
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(house_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    if !FavoriteRepository::delete(&state.pool, auth.user_id, house_id).await? {
        return Err(AppError::NotFound("House not in favorites".to_string()));
    }

    Ok(ApiResponse::message(
        "House removed from favorites successfully",
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/favorites",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(("page" = Option<i64>, Query, description = "Page number, starting at 1"), ("limit" = Option<i64>, Query, description = "Items per page")),
    responses((status = 200, description = "Caller's favorite houses"))
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<FavoritesQuery>,
) -> AppResult<ApiResponse<Paginated<FavoriteResponse>>> {
    let params = PageParams::new(query.page, query.limit);

    let favorites =
        FavoriteRepository::list(&state.pool, auth.user_id, params.limit, params.offset()).await?;
    let total = FavoriteRepository::count(&state.pool, auth.user_id).await?;

    let house_ids: Vec<Uuid> = favorites.iter().map(|f| f.house_id).collect();
    let houses = HouseRepository::find_many(&state.pool, &house_ids).await?;
    let mut houses: HashMap<Uuid, _> = HouseRepository::with_relations(&state.pool, houses)
        .await?
        .into_iter()
        .map(|h| (h.house.id, h))
        .collect();

    let items = favorites
        .into_iter()
        .map(|favorite| FavoriteResponse {
            house: houses.remove(&favorite.house_id),
            favorite,
        })
        .collect();

    Ok(ApiResponse::ok(
        "Favorites retrieved successfully",
        Paginated::new(items, params, total),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/favorites/{house_id}/check",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(("house_id" = Uuid, Path, description = "House id")),
    responses((status = 200, description = "Whether the house is a favorite", body = FavoriteCheck))
)]
pub async fn check_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(house_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FavoriteCheck>> {
    let is_favorite = FavoriteRepository::exists(&state.pool, auth.user_id, house_id).await?;

    Ok(ApiResponse::ok(
        "Favorite status retrieved successfully",
        FavoriteCheck { is_favorite },
    ))
}
