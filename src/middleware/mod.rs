pub mod auth;
pub mod cancellation;
pub mod guards;

pub use auth::{require_auth, AppState, AuthUser};
pub use cancellation::{cancel_on_disconnect, RequestCancellation};
pub use guards::{require_role, RoleGuard};
