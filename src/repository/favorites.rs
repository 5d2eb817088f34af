use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Favorite;

pub struct FavoriteRepository;

impl FavoriteRepository {
    /// Inserts the pair; a second insert violates the unique key and
    /// surfaces as a conflict.
    pub async fn insert<'e, E>(executor: E, tenant_id: Uuid, house_id: Uuid) -> AppResult<Favorite>
    where
        E: PgExecutor<'e>,
    {
        let favorite = sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (id, tenant_id, house_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(house_id)
        .fetch_one(executor)
        .await?;

        Ok(favorite)
    }

    pub async fn exists<'e, E>(executor: E, tenant_id: Uuid, house_id: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE tenant_id = $1 AND house_id = $2)",
        )
        .bind(tenant_id)
        .bind(house_id)
        .fetch_one(executor)
        .await?;

        Ok(exists.0)
    }

    /// Returns whether a row was removed.
    pub async fn delete<'e, E>(executor: E, tenant_id: Uuid, house_id: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM favorites WHERE tenant_id = $1 AND house_id = $2")
            .bind(tenant_id)
            .bind(house_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Favorites whose house is still listed.
    pub async fn list<'e, E>(executor: E, tenant_id: Uuid, limit: i64, offset: i64) -> AppResult<Vec<Favorite>>
    where
        E: PgExecutor<'e>,
    {
        let favorites = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT f.* FROM favorites f
            JOIN houses h ON h.id = f.house_id
            WHERE f.tenant_id = $1 AND h.deleted_at IS NULL
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(favorites)
    }

    pub async fn count<'e, E>(executor: E, tenant_id: Uuid) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM favorites f
            JOIN houses h ON h.id = f.house_id
            WHERE f.tenant_id = $1 AND h.deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }
}
