pub mod admin;
pub mod auth;
pub mod favorites;
pub mod houses;
pub mod maintenance;
pub mod notifications;
pub mod payments;
pub mod rentals;
pub mod reviews;

use axum::{middleware, Router};

use crate::middleware::{require_auth, require_role, AppState, RoleGuard};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes(state))
        .nest("/houses", houses::routes(state))
        .nest("/rentals", rentals::routes(state))
        .nest("/payments", payments::routes(state))
        .nest("/reviews", reviews::routes(state))
        .nest("/maintenance", maintenance::routes(state))
        .nest("/favorites", favorites::routes(state))
        .nest("/notifications", notifications::routes(state))
        .nest("/admin", admin::routes(state))
}

/// Routes behind bearer authentication.
pub(crate) fn protected(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Routes behind authentication and a role guard. The guard is added first
/// so it runs after `require_auth` has attached the user.
pub(crate) fn restricted(
    router: Router<AppState>,
    state: &AppState,
    guard: RoleGuard,
) -> Router<AppState> {
    protected(
        router.route_layer(middleware::from_fn_with_state(guard, require_role)),
        state,
    )
}
