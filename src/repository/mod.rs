//! Persistence gateway. Every function takes any Postgres executor so the
//! same query runs against the pool or inside a handler's transaction.

mod favorites;
mod houses;
mod maintenance;
mod notifications;
mod payments;
mod rentals;
mod reviews;
pub mod stats;
mod users;

pub use favorites::FavoriteRepository;
pub use houses::{HouseFilter, HouseRepository, NewHouse};
pub use maintenance::{MaintenanceRepository, NewMaintenanceRequest};
pub use notifications::NotificationRepository;
pub use payments::{NewPayment, PaymentRepository};
pub use rentals::{NewRentalAgreement, RentalRepository};
pub use reviews::ReviewRepository;
pub use users::{NewUser, UserRepository};

use uuid::Uuid;

use crate::models::{User, UserRole};

/// Which rows of a role-scoped listing a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerScope {
    All,
    Tenant(Uuid),
    /// Rows attached to houses owned by this user.
    Landlord(Uuid),
}

impl ViewerScope {
    pub fn for_user(user: &User) -> Self {
        match user.role {
            UserRole::Admin => Self::All,
            UserRole::Tenant => Self::Tenant(user.id),
            UserRole::Landlord | UserRole::Agent => Self::Landlord(user.id),
        }
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            Self::Tenant(id) => Some(*id),
            _ => None,
        }
    }

    pub fn landlord_id(&self) -> Option<Uuid> {
        match self {
            Self::Landlord(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::SubscriptionPlan;

    fn user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            full_name: "Ada".to_string(),
            email: "a@x".to_string(),
            password_hash: "hash".to_string(),
            phone: "+260700000000".to_string(),
            role,
            is_active: true,
            is_verified: false,
            profile_image_url: None,
            subscription_plan: SubscriptionPlan::Basic,
            plan_expiry_date: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn scope_follows_role() {
        let admin = user(UserRole::Admin);
        assert_eq!(ViewerScope::for_user(&admin), ViewerScope::All);

        let tenant = user(UserRole::Tenant);
        let scope = ViewerScope::for_user(&tenant);
        assert_eq!(scope.tenant_id(), Some(tenant.id));
        assert_eq!(scope.landlord_id(), None);

        let agent = user(UserRole::Agent);
        assert_eq!(ViewerScope::for_user(&agent), ViewerScope::Landlord(agent.id));
    }
}
