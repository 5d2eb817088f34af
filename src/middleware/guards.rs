use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};

/// Role predicate declared per route group, checked after `require_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGuard {
    AdminOnly,
    LandlordOrAdmin,
    TenantOrAdmin,
    TenantOnly,
}

impl RoleGuard {
    pub fn allows(self, role: UserRole) -> bool {
        match self {
            RoleGuard::AdminOnly => role == UserRole::Admin,
            RoleGuard::LandlordOrAdmin => matches!(role, UserRole::Landlord | UserRole::Admin),
            RoleGuard::TenantOrAdmin => matches!(role, UserRole::Tenant | UserRole::Admin),
            RoleGuard::TenantOnly => role == UserRole::Tenant,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            RoleGuard::AdminOnly => "Admin access required",
            RoleGuard::LandlordOrAdmin => "Landlord or admin access required",
            RoleGuard::TenantOrAdmin => "Tenant or admin access required",
            RoleGuard::TenantOnly => "Tenant access required",
        }
    }

    pub fn check(self, role: UserRole) -> AppResult<()> {
        if self.allows(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(self.denial().to_string()))
        }
    }
}

pub async fn require_role(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let role = request
        .extensions()
        .get::<User>()
        .map(|user| user.role)
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    guard.check(role)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use UserRole::*;

    #[test]
    fn admin_only_admits_only_admins() {
        assert!(RoleGuard::AdminOnly.allows(Admin));
        for role in [Landlord, Tenant, Agent] {
            assert!(!RoleGuard::AdminOnly.allows(role));
        }
    }

    #[test]
    fn mixed_guards_admit_admin_and_their_role() {
        assert!(RoleGuard::LandlordOrAdmin.allows(Landlord));
        assert!(RoleGuard::LandlordOrAdmin.allows(Admin));
        assert!(!RoleGuard::LandlordOrAdmin.allows(Agent));
        assert!(!RoleGuard::LandlordOrAdmin.allows(Tenant));

        assert!(RoleGuard::TenantOrAdmin.allows(Tenant));
        assert!(RoleGuard::TenantOrAdmin.allows(Admin));
        assert!(!RoleGuard::TenantOrAdmin.allows(Landlord));
    }

    #[test]
    fn tenant_only_excludes_admin() {
        assert!(RoleGuard::TenantOnly.allows(Tenant));
        assert!(!RoleGuard::TenantOnly.allows(Admin));
    }

    #[test]
    fn denial_is_forbidden_with_role_message() {
        let err = RoleGuard::AdminOnly.check(Tenant).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Admin access required"));
    }
}
