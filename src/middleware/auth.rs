use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};
use crate::services::{
    AuthService, ImageService, NotificationDispatcher, PaymentOrchestrator, ProviderRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub tokens: AuthService,
    pub payments: Arc<PaymentOrchestrator>,
    pub notifications: NotificationDispatcher,
    /// `None` when no image CDN credentials are configured.
    pub images: Option<Arc<ImageService>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, notifications: NotificationDispatcher) -> AppResult<Self> {
        let providers = ProviderRegistry::from_config(&config)?;
        let payments = PaymentOrchestrator::new(pool.clone(), notifications.clone(), providers, &config);

        let images = match config.cloudinary.clone() {
            Some(cdn) => Some(Arc::new(ImageService::new(cdn)?)),
            None => {
                tracing::warn!("Image CDN is not configured, uploads are disabled");
                None
            }
        };

        Ok(Self {
            tokens: AuthService::new(&config),
            pool,
            config: Arc::new(config),
            payments: Arc::new(payments),
            notifications,
            images,
        })
    }
}

/// Resolves the bearer token to an active user and stores it in the
/// request extensions for the guards and handlers behind this layer.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::Unauthorized("Authorization header required".to_string()))?;

    let user = state.tokens.authenticate(&state.pool, bearer.token()).await?;

    tracing::debug!(user_id = %user.id, role = user.role.as_str(), "Request authenticated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// The authenticated caller. Only available behind `require_auth`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub user: User,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        Ok(AuthUser {
            user_id: user.id,
            role: user.role,
            user,
        })
    }
}
