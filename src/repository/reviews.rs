use std::collections::HashMap;

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Review, ReviewResponse, UserPublic};
use crate::repository::{HouseRepository, UserRepository};

pub struct ReviewRepository;

impl ReviewRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Review>>
    where
        E: PgExecutor<'e>,
    {
        let review = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(review)
    }

    pub async fn exists_for<'e, E>(executor: E, tenant_id: Uuid, house_id: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reviews
                WHERE tenant_id = $1 AND house_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(tenant_id)
        .bind(house_id)
        .fetch_one(executor)
        .await?;

        Ok(exists.0)
    }

    pub async fn insert<'e, E>(
        executor: E,
        tenant_id: Uuid,
        house_id: Uuid,
        rating: i32,
        comment: &str,
    ) -> AppResult<Review>
    where
        E: PgExecutor<'e>,
    {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, tenant_id, house_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(house_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(executor)
        .await?;

        Ok(review)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        rating: Option<i32>,
        comment: Option<&str>,
    ) -> AppResult<Review>
    where
        E: PgExecutor<'e>,
    {
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews SET
                rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .fetch_one(executor)
        .await?;

        Ok(review)
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE reviews SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_for_house<'e, E>(
        executor: E,
        house_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Review>>
    where
        E: PgExecutor<'e>,
    {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE house_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(house_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(reviews)
    }

    /// Review count per star value for one house.
    pub async fn rating_counts<'e, E>(executor: E, house_id: Uuid) -> AppResult<Vec<(i32, i64)>>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT rating, COUNT(*) FROM reviews
            WHERE house_id = $1 AND deleted_at IS NULL
            GROUP BY rating
            "#,
        )
        .bind(house_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_tenant<'e, E>(
        executor: E,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Review>>
    where
        E: PgExecutor<'e>,
    {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE tenant_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(reviews)
    }

    pub async fn count_for_tenant<'e, E>(executor: E, tenant_id: Uuid) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reviews WHERE tenant_id = $1 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }

    /// Preloads the reviewer and, when `with_house` is set, the house.
    pub async fn with_relations(
        pool: &PgPool,
        reviews: Vec<Review>,
        with_house: bool,
    ) -> AppResult<Vec<ReviewResponse>> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        let tenant_ids: Vec<Uuid> = reviews.iter().map(|r| r.tenant_id).collect();
        let tenants: HashMap<_, _> = UserRepository::find_many(pool, &tenant_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, UserPublic::from(u)))
            .collect();

        let houses: HashMap<_, _> = if with_house {
            let house_ids: Vec<Uuid> = reviews.iter().map(|r| r.house_id).collect();
            HouseRepository::find_many(pool, &house_ids)
                .await?
                .into_iter()
                .map(|h| (h.id, h))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(reviews
            .into_iter()
            .map(|review| ReviewResponse {
                tenant: tenants.get(&review.tenant_id).cloned(),
                house: houses.get(&review.house_id).cloned(),
                review,
            })
            .collect())
    }
}
