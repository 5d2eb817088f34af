use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser, RoleGuard};
use crate::models::{
    apply_featured, featured_until_from, resolve_coordinates, CreateHouseRequest, House,
    HouseDetailResponse, HouseImage, HouseResponse, HousesQuery, UpdateHouseRequest,
};
use crate::repository::{HouseFilter, HouseRepository, NewHouse, RentalRepository};
use crate::services::image_service::HOUSE_IMAGES_FOLDER;
use crate::utils::{
    validators::sanitize_string, ApiPath, ApiQuery, ApiResponse, PageParams, Paginated,
    ValidatedJson,
};

/// Upper bound for a single image upload body.
pub const MAX_IMAGE_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_houses))
        .route("/:id", get(get_house))
        .route("/:id/reviews", get(super::reviews::house_reviews));

    let upload = Router::new()
        .route("/:id/images", post(upload_image))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_IMAGE_UPLOAD_BYTES));

    let manage = Router::new()
        .route("/", post(create_house))
        .route("/:id", put(update_house).delete(delete_house))
        .route("/images/:image_id", delete(delete_image))
        .merge(upload);

    public.merge(super::restricted(manage, state, RoleGuard::LandlordOrAdmin))
}

fn ensure_owner(auth: &AuthUser, house: &House, message: &str) -> AppResult<()> {
    if auth.is_admin() || house.landlord_id == auth.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(message.to_string()))
    }
}

fn house_not_found() -> AppError {
    AppError::NotFound("House not found".to_string())
}

#[utoipa::path(
    get,
    path = "/api/v1/houses",
    tag = "houses",
    params(
        ("house_type" = Option<String>, Query, description = "apartment, house, studio, townhouse or commercial"),
        ("status" = Option<String>, Query, description = "available, occupied or maintenance"),
        ("min_rent" = Option<String>, Query, description = "Minimum monthly rent"),
        ("max_rent" = Option<String>, Query, description = "Maximum monthly rent"),
        ("bedrooms" = Option<i32>, Query, description = "Minimum bedrooms"),
        ("bathrooms" = Option<i32>, Query, description = "Minimum bathrooms"),
        ("featured" = Option<bool>, Query, description = "Only listings featured right now"),
        ("search" = Option<String>, Query, description = "Substring of title, description or address"),
        ("page" = Option<i64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses((status = 200, description = "Page of houses"))
)]
pub async fn list_houses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HousesQuery>,
) -> AppResult<ApiResponse<Paginated<HouseResponse>>> {
    let params = PageParams::new(query.page, query.limit);
    let filter = HouseFilter::from(&query);

    let houses = HouseRepository::list(&state.pool, &filter, params.limit, params.offset()).await?;
    let total = HouseRepository::count(&state.pool, &filter).await?;
    let items = HouseRepository::with_relations(&state.pool, houses).await?;

    Ok(ApiResponse::ok(
        "Houses retrieved successfully",
        Paginated::new(items, params, total),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/houses/{id}",
    tag = "houses",
    params(("id" = Uuid, Path, description = "House id")),
    responses(
        (status = 200, description = "House with landlord, images and rating", body = HouseDetailResponse),
        (status = 404, description = "House not found")
    )
)]
pub async fn get_house(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<HouseDetailResponse>> {
    let house = HouseRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(house_not_found)?;

    let (average_rating, review_count) = HouseRepository::rating(&state.pool, id).await?;
    let house = HouseRepository::with_relations_one(&state.pool, house).await?;

    Ok(ApiResponse::ok(
        "House retrieved successfully",
        HouseDetailResponse {
            house,
            average_rating,
            review_count,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/houses",
    tag = "houses",
    security(("bearer_auth" = [])),
    request_body = CreateHouseRequest,
    responses(
        (status = 201, description = "House created", body = HouseResponse),
        (status = 400, description = "Invalid request data"),
        (status = 403, description = "Landlord or admin access required")
    )
)]
pub async fn create_house(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateHouseRequest>,
) -> AppResult<ApiResponse<HouseResponse>> {
    let (latitude, longitude) = resolve_coordinates(payload.latitude, payload.longitude)?;

    let is_featured = payload.is_featured.unwrap_or(false);
    let featured_until = is_featured.then(|| featured_until_from(Utc::now()));

    let house = HouseRepository::insert(
        &state.pool,
        &NewHouse {
            landlord_id: auth.user_id,
            title: sanitize_string(&payload.title),
            description: sanitize_string(&payload.description),
            address: sanitize_string(&payload.address),
            monthly_rent: payload.monthly_rent,
            house_type: payload.house_type,
            latitude,
            longitude,
            bedrooms: payload.bedrooms.unwrap_or(0),
            bathrooms: payload.bathrooms.unwrap_or(0),
            area_m2: payload.area_m2.unwrap_or(Decimal::ZERO),
            is_featured,
            featured_until,
        },
    )
    .await?;

    tracing::info!(house_id = %house.id, landlord_id = %auth.user_id, "House created");

    let house = HouseRepository::with_relations_one(&state.pool, house).await?;
    Ok(ApiResponse::created("House created successfully", house))
}

#[utoipa::path(
    put,
    path = "/api/v1/houses/{id}",
    tag = "houses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "House id")),
    request_body = UpdateHouseRequest,
    responses(
        (status = 200, description = "House updated", body = HouseResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "House not found"),
        (status = 409, description = "House has an active rental agreement")
    )
)]
pub async fn update_house(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateHouseRequest>,
) -> AppResult<ApiResponse<HouseResponse>> {
    let mut tx = state.pool.begin().await?;

    let mut house = HouseRepository::lock(&mut *tx, id)
        .await?
        .ok_or_else(house_not_found)?;
    ensure_owner(&auth, &house, "You can only update your own houses")?;

    if let Some(status) = payload.status {
        let has_active = RentalRepository::has_active_for_house(&mut *tx, id).await?;
        house
            .status
            .check_manual_change(status, auth.is_admin(), has_active)?;
        house.status = status;
    }

    if let (Some(lat), Some(lon)) = (payload.latitude, payload.longitude) {
        if lat.is_zero() && lon.is_zero() {
            resolve_coordinates(Some(lat), Some(lon))?;
        }
    }

    if let Some(title) = payload.title.as_deref() {
        house.title = sanitize_string(title);
    }
    if let Some(description) = payload.description.as_deref() {
        house.description = sanitize_string(description);
    }
    if let Some(address) = payload.address.as_deref() {
        house.address = sanitize_string(address);
    }
    if let Some(monthly_rent) = payload.monthly_rent {
        house.monthly_rent = monthly_rent;
    }
    if let Some(house_type) = payload.house_type {
        house.house_type = house_type;
    }
    if let Some(latitude) = payload.latitude {
        house.latitude = latitude;
    }
    if let Some(longitude) = payload.longitude {
        house.longitude = longitude;
    }
    if let Some(bedrooms) = payload.bedrooms {
        house.bedrooms = bedrooms;
    }
    if let Some(bathrooms) = payload.bathrooms {
        house.bathrooms = bathrooms;
    }
    if let Some(area_m2) = payload.area_m2 {
        house.area_m2 = area_m2;
    }

    (house.is_featured, house.featured_until) = apply_featured(
        house.is_featured,
        house.featured_until,
        payload.is_featured,
        Utc::now(),
    );

    let house = HouseRepository::update(&mut *tx, &house).await?;
    tx.commit().await?;

    tracing::info!(house_id = %house.id, status = ?house.status, "House updated");

    let house = HouseRepository::with_relations_one(&state.pool, house).await?;
    Ok(ApiResponse::ok("House updated successfully", house))
}

#[utoipa::path(
    delete,
    path = "/api/v1/houses/{id}",
    tag = "houses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "House id")),
    responses(
        (status = 200, description = "House deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "House not found")
    )
)]
pub async fn delete_house(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    let mut tx = state.pool.begin().await?;

    let house = HouseRepository::lock(&mut *tx, id)
        .await?
        .ok_or_else(house_not_found)?;
    ensure_owner(&auth, &house, "You can only delete your own houses")?;

    HouseRepository::soft_delete_images(&mut *tx, id).await?;
    HouseRepository::soft_delete(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(house_id = %id, "House deleted");

    Ok(ApiResponse::message("House deleted successfully"))
}

/// Uploads the multipart field `image` to the CDN and attaches it to the
/// house. The first image of a house becomes its primary image.
#[utoipa::path(
    post,
    path = "/api/v1/houses/{id}/images",
    tag = "houses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "House id")),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image uploaded", body = HouseImage),
        (status = 400, description = "No image file provided"),
        (status = 403, description = "Not the owner"),
        (status = 500, description = "Upload failed or CDN not configured")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<HouseImage>> {
    let house = HouseRepository::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(house_not_found)?;
    ensure_owner(&auth, &house, "You can only upload images for your own houses")?;

    let images = state.images.clone().ok_or_else(|| {
        AppError::External("Image upload service is not configured".to_string())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::File(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::File(e.body_text()))?;

        if data.is_empty() {
            break;
        }

        let url = images
            .upload(HOUSE_IMAGES_FOLDER, &file_name, &content_type, data.to_vec())
            .await?;

        let mut tx = state.pool.begin().await?;
        let is_primary = HouseRepository::count_images(&mut *tx, id).await? == 0;
        let image = HouseRepository::insert_image(&mut *tx, id, &url, is_primary).await?;
        tx.commit().await?;

        tracing::info!(house_id = %id, image_id = %image.id, is_primary, "House image uploaded");

        return Ok(ApiResponse::created("Image uploaded successfully", image));
    }

    Err(AppError::File("No image file provided".to_string()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/houses/images/{image_id}",
    tag = "houses",
    security(("bearer_auth" = [])),
    params(("image_id" = Uuid, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(image_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    let image = HouseRepository::find_image(&state.pool, image_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    let house = HouseRepository::find_by_id(&state.pool, image.house_id)
        .await?
        .ok_or_else(house_not_found)?;
    ensure_owner(&auth, &house, "You can only delete images for your own houses")?;

    HouseRepository::delete_image(&state.pool, image_id).await?;

    Ok(ApiResponse::message("Image deleted successfully"))
}
