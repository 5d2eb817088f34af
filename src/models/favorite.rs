use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::HouseResponse;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Favorite {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub house_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    #[serde(flatten)]
    pub favorite: Favorite,
    pub house: Option<HouseResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteCheck {
    pub is_favorite: bool,
}
