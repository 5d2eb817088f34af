use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};

use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser};
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
    UserPublic,
};
use crate::repository::{NewUser, UserRepository};
use crate::services::password::{hash_password_blocking, verify_password_blocking};
use crate::utils::{validators::sanitize_string, ApiResponse, ValidatedJson};

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout));

    let account = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password));

    public.merge(super::protected(account, state))
}

/// Creates an account and returns it with a fresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid request data"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let email = sanitize_string(&payload.email);

    if UserRepository::email_exists(&state.pool, &email).await? {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password_blocking(payload.password).await?;
    let full_name = sanitize_string(&payload.full_name);
    let phone = sanitize_string(&payload.phone);

    let user = UserRepository::insert(
        &state.pool,
        &NewUser {
            full_name: &full_name,
            email: &email,
            password_hash: &password_hash,
            phone: &phone,
            role: payload.role,
        },
    )
    .await
    .map_err(|e| e.on_conflict("User with this email already exists"))?;

    let token = state.tokens.generate_token(&user)?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok(ApiResponse::created(
        "User registered successfully",
        AuthResponse {
            user: UserPublic::from(user),
            token,
        },
    ))
}

/// Exchanges email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = UserRepository::find_by_email(&state.pool, sanitize_string(&payload.email).as_str())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password_blocking(payload.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    let token = state.tokens.generate_token(&user)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::ok(
        "Login successful",
        AuthResponse {
            user: UserPublic::from(user),
            token,
        },
    ))
}

/// Tokens are stateless; the client drops its copy.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logout successful"))
)]
pub async fn logout() -> ApiResponse<()> {
    ApiResponse::message("Logout successful")
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserPublic),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_profile(auth: AuthUser) -> ApiResponse<UserPublic> {
    ApiResponse::ok("Profile retrieved successfully", UserPublic::from(auth.user))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserPublic),
        (status = 400, description = "Invalid request data")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<ApiResponse<UserPublic>> {
    let full_name = payload.full_name.as_deref().map(sanitize_string);
    let phone = payload.phone.as_deref().map(sanitize_string);

    let user = UserRepository::update_profile(
        &state.pool,
        auth.user_id,
        full_name.as_deref(),
        phone.as_deref(),
        payload.profile_image_url.as_deref(),
    )
    .await?;

    Ok(ApiResponse::ok(
        "Profile updated successfully",
        UserPublic::from(user),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<ApiResponse<()>> {
    let matches =
        verify_password_blocking(payload.current_password, auth.user.password_hash.clone()).await?;
    if !matches {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_password_blocking(payload.new_password).await?;
    UserRepository::update_password(&state.pool, auth.user_id, &password_hash).await?;

    tracing::info!(user_id = %auth.user_id, "Password changed");

    Ok(ApiResponse::message("Password changed successfully"))
}
