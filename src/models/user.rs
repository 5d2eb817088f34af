use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validators::phone_number;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Landlord,
    Tenant,
    Agent,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Tenant
    }
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn is_tenant(self) -> bool {
        matches!(self, Self::Tenant)
    }

    pub fn is_landlord(self) -> bool {
        matches!(self, Self::Landlord)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landlord => "landlord",
            Self::Tenant => "tenant",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "landlord" => Some(Self::Landlord),
            "tenant" => Some(Self::Tenant),
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Basic,
    Premium,
    Enterprise,
}

impl Default for SubscriptionPlan {
    fn default() -> Self {
        Self::Basic
    }
}

/// Row of the `users` table. Never serialized directly: responses go
/// through [`UserPublic`] so the password hash cannot leak.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    pub profile_image_url: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub plan_expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    pub profile_image_url: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub plan_expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            is_active: user.is_active,
            is_verified: user.is_verified,
            profile_image_url: user.profile_image_url,
            subscription_plan: user.subscription_plan,
            plan_expiry_date: user.plan_expiry_date,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        user.clone().into()
    }
}

// DTOs
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(custom(function = "phone_number"))]
    pub phone: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserPublic,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100))]
    pub full_name: Option<String>,
    #[validate(custom(function = "phone_number"))]
    pub phone: Option<String>,
    #[validate(length(max = 2048))]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub role: Option<UserRole>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
