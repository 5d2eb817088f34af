use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    House, HouseImage, HouseResponse, HouseStatus, HouseType, HousesQuery, UserPublic,
};
use crate::repository::UserRepository;
use crate::utils::validators::search_pattern;

pub struct NewHouse {
    pub landlord_id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub monthly_rent: Decimal,
    pub house_type: HouseType,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_m2: Decimal,
    pub is_featured: bool,
    pub featured_until: Option<DateTime<Utc>>,
}

/// Listing filters after normalisation of the raw query string.
#[derive(Debug, Clone, Default)]
pub struct HouseFilter {
    pub house_type: Option<HouseType>,
    pub status: Option<HouseStatus>,
    pub min_rent: Option<Decimal>,
    pub max_rent: Option<Decimal>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub featured_only: bool,
    pub search: Option<String>,
}

impl From<&HousesQuery> for HouseFilter {
    fn from(query: &HousesQuery) -> Self {
        Self {
            house_type: query.house_type,
            status: query.status,
            min_rent: query.min_rent,
            max_rent: query.max_rent,
            bedrooms: query.bedrooms.filter(|b| *b > 0),
            bathrooms: query.bathrooms.filter(|b| *b > 0),
            featured_only: query.featured.unwrap_or(false),
            search: search_pattern(query.search.as_deref()),
        }
    }
}

const FILTER_CLAUSE: &str = r#"
    deleted_at IS NULL
      AND ($1::house_type IS NULL OR house_type = $1)
      AND ($2::house_status IS NULL OR status = $2)
      AND ($3::numeric IS NULL OR monthly_rent >= $3)
      AND ($4::numeric IS NULL OR monthly_rent <= $4)
      AND ($5::int IS NULL OR bedrooms >= $5)
      AND ($6::int IS NULL OR bathrooms >= $6)
      AND (NOT $7 OR (is_featured AND (featured_until IS NULL OR featured_until > NOW())))
      AND ($8::text IS NULL OR title ILIKE $8 OR description ILIKE $8 OR address ILIKE $8)
"#;

pub struct HouseRepository;

impl HouseRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<House>>
    where
        E: PgExecutor<'e>,
    {
        let house = sqlx::query_as::<_, House>(
            "SELECT * FROM houses WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(house)
    }

    /// Same as `find_by_id` but locks the row until the transaction ends.
    pub async fn lock<'e, E>(executor: E, id: Uuid) -> AppResult<Option<House>>
    where
        E: PgExecutor<'e>,
    {
        let house = sqlx::query_as::<_, House>(
            "SELECT * FROM houses WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(house)
    }

    pub async fn list<'e, E>(
        executor: E,
        filter: &HouseFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<House>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT * FROM houses WHERE {} ORDER BY created_at DESC LIMIT $9 OFFSET $10",
            FILTER_CLAUSE
        );

        let houses = sqlx::query_as::<_, House>(&sql)
            .bind(filter.house_type)
            .bind(filter.status)
            .bind(filter.min_rent)
            .bind(filter.max_rent)
            .bind(filter.bedrooms)
            .bind(filter.bathrooms)
            .bind(filter.featured_only)
            .bind(filter.search.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(houses)
    }

    pub async fn count<'e, E>(executor: E, filter: &HouseFilter) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT COUNT(*) FROM houses WHERE {}", FILTER_CLAUSE);

        let total: (i64,) = sqlx::query_as(&sql)
            .bind(filter.house_type)
            .bind(filter.status)
            .bind(filter.min_rent)
            .bind(filter.max_rent)
            .bind(filter.bedrooms)
            .bind(filter.bathrooms)
            .bind(filter.featured_only)
            .bind(filter.search.as_deref())
            .fetch_one(executor)
            .await?;

        Ok(total.0)
    }

    pub async fn insert<'e, E>(executor: E, new: &NewHouse) -> AppResult<House>
    where
        E: PgExecutor<'e>,
    {
        let house = sqlx::query_as::<_, House>(
            r#"
            INSERT INTO houses (
                id, landlord_id, title, description, address, monthly_rent, status,
                house_type, latitude, longitude, bedrooms, bathrooms, area_m2,
                is_featured, featured_until
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'available', $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.landlord_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.address)
        .bind(new.monthly_rent)
        .bind(new.house_type)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.bedrooms)
        .bind(new.bathrooms)
        .bind(new.area_m2)
        .bind(new.is_featured)
        .bind(new.featured_until)
        .fetch_one(executor)
        .await?;

        Ok(house)
    }

    /// Writes every mutable column of `house` back to its row.
    pub async fn update<'e, E>(executor: E, house: &House) -> AppResult<House>
    where
        E: PgExecutor<'e>,
    {
        let updated = sqlx::query_as::<_, House>(
            r#"
            UPDATE houses SET
                title = $2,
                description = $3,
                address = $4,
                monthly_rent = $5,
                status = $6,
                house_type = $7,
                latitude = $8,
                longitude = $9,
                bedrooms = $10,
                bathrooms = $11,
                area_m2 = $12,
                is_featured = $13,
                featured_until = $14,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(house.id)
        .bind(&house.title)
        .bind(&house.description)
        .bind(&house.address)
        .bind(house.monthly_rent)
        .bind(house.status)
        .bind(house.house_type)
        .bind(house.latitude)
        .bind(house.longitude)
        .bind(house.bedrooms)
        .bind(house.bathrooms)
        .bind(house.area_m2)
        .bind(house.is_featured)
        .bind(house.featured_until)
        .fetch_one(executor)
        .await?;

        Ok(updated)
    }

    pub async fn set_status<'e, E>(executor: E, id: Uuid, status: HouseStatus) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE houses SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Moves the house from `from` to `to`; a house in any other status is
    /// left untouched. Returns whether a row changed.
    pub async fn swap_status<'e, E>(
        executor: E,
        id: Uuid,
        from: HouseStatus,
        to: HouseStatus,
    ) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE houses SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE houses SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn soft_delete_images<'e, E>(executor: E, house_id: Uuid) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "UPDATE house_images SET deleted_at = NOW() WHERE house_id = $1 AND deleted_at IS NULL",
        )
        .bind(house_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn count_images<'e, E>(executor: E, house_id: Uuid) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM house_images WHERE house_id = $1 AND deleted_at IS NULL",
        )
        .bind(house_id)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }

    pub async fn insert_image<'e, E>(
        executor: E,
        house_id: Uuid,
        url: &str,
        is_primary: bool,
    ) -> AppResult<HouseImage>
    where
        E: PgExecutor<'e>,
    {
        let image = sqlx::query_as::<_, HouseImage>(
            r#"
            INSERT INTO house_images (id, house_id, url, is_primary)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(house_id)
        .bind(url)
        .bind(is_primary)
        .fetch_one(executor)
        .await?;

        Ok(image)
    }

    pub async fn find_image<'e, E>(executor: E, id: Uuid) -> AppResult<Option<HouseImage>>
    where
        E: PgExecutor<'e>,
    {
        let image = sqlx::query_as::<_, HouseImage>(
            "SELECT * FROM house_images WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(image)
    }

    pub async fn delete_image<'e, E>(executor: E, id: Uuid) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE house_images SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn images_for<'e, E>(executor: E, house_ids: &[Uuid]) -> AppResult<Vec<HouseImage>>
    where
        E: PgExecutor<'e>,
    {
        let images = sqlx::query_as::<_, HouseImage>(
            r#"
            SELECT * FROM house_images
            WHERE house_id = ANY($1) AND deleted_at IS NULL
            ORDER BY is_primary DESC, created_at
            "#,
        )
        .bind(house_ids)
        .fetch_all(executor)
        .await?;

        Ok(images)
    }

    pub async fn find_many<'e, E>(executor: E, ids: &[Uuid]) -> AppResult<Vec<House>>
    where
        E: PgExecutor<'e>,
    {
        let houses = sqlx::query_as::<_, House>("SELECT * FROM houses WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;

        Ok(houses)
    }

    /// Preloads landlords and images for a page of houses.
    pub async fn with_relations(pool: &PgPool, houses: Vec<House>) -> AppResult<Vec<HouseResponse>> {
        if houses.is_empty() {
            return Ok(Vec::new());
        }

        let house_ids: Vec<Uuid> = houses.iter().map(|h| h.id).collect();
        let landlord_ids: Vec<Uuid> = houses.iter().map(|h| h.landlord_id).collect();

        let landlords: HashMap<Uuid, UserPublic> = UserRepository::find_many(pool, &landlord_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, UserPublic::from(u)))
            .collect();

        let mut images: HashMap<Uuid, Vec<HouseImage>> = HashMap::new();
        for image in Self::images_for(pool, &house_ids).await? {
            images.entry(image.house_id).or_default().push(image);
        }

        Ok(houses
            .into_iter()
            .map(|house| HouseResponse {
                landlord: landlords.get(&house.landlord_id).cloned(),
                images: images.remove(&house.id).unwrap_or_default(),
                house,
            })
            .collect())
    }

    pub async fn with_relations_one(pool: &PgPool, house: House) -> AppResult<HouseResponse> {
        let mut responses = Self::with_relations(pool, vec![house.clone()]).await?;
        Ok(responses.pop().unwrap_or(HouseResponse {
            house,
            landlord: None,
            images: Vec::new(),
        }))
    }

    /// Average rating (two decimals) and number of live reviews.
    pub async fn rating<'e, E>(executor: E, house_id: Uuid) -> AppResult<(f64, i64)>
    where
        E: PgExecutor<'e>,
    {
        let (average, count): (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rating)::float8, COUNT(*)
            FROM reviews
            WHERE house_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(house_id)
        .fetch_one(executor)
        .await?;

        let average = average.map(|a| (a * 100.0).round() / 100.0).unwrap_or(0.0);
        Ok((average, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_drops_non_positive_room_counts_and_wraps_search() {
        let query = HousesQuery {
            bedrooms: Some(0),
            bathrooms: Some(2),
            featured: Some(true),
            search: Some("50%".to_string()),
            ..Default::default()
        };

        let filter = HouseFilter::from(&query);
        assert_eq!(filter.bedrooms, None);
        assert_eq!(filter.bathrooms, Some(2));
        assert!(filter.featured_only);
        assert_eq!(filter.search.as_deref(), Some("%50\\%%"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = HousesQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(HouseFilter::from(&query).search, None);
    }
}
