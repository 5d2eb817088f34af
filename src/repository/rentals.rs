use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{AgreementStatus, RentalAgreement, RentalAgreementResponse, UserPublic};
use crate::repository::{HouseRepository, UserRepository, ViewerScope};

pub struct NewRentalAgreement {
    pub house_id: Uuid,
    pub tenant_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent_amount: Decimal,
    pub deposit: Decimal,
}

pub struct RentalRepository;

impl RentalRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<RentalAgreement>>
    where
        E: PgExecutor<'e>,
    {
        let agreement = sqlx::query_as::<_, RentalAgreement>(
            "SELECT * FROM rental_agreements WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(agreement)
    }

    pub async fn lock<'e, E>(executor: E, id: Uuid) -> AppResult<Option<RentalAgreement>>
    where
        E: PgExecutor<'e>,
    {
        let agreement = sqlx::query_as::<_, RentalAgreement>(
            "SELECT * FROM rental_agreements WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(agreement)
    }

    pub async fn has_active_for_house<'e, E>(executor: E, house_id: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM rental_agreements
                WHERE house_id = $1 AND status = 'active' AND deleted_at IS NULL
            )
            "#,
        )
        .bind(house_id)
        .fetch_one(executor)
        .await?;

        Ok(exists.0)
    }

    /// Whether `tenant_id` holds an agreement on the house; with
    /// `active_only = false` past agreements count too.
    pub async fn tenant_has_agreement<'e, E>(
        executor: E,
        tenant_id: Uuid,
        house_id: Uuid,
        active_only: bool,
    ) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM rental_agreements
                WHERE tenant_id = $1 AND house_id = $2 AND deleted_at IS NULL
                  AND (NOT $3 OR status = 'active')
            )
            "#,
        )
        .bind(tenant_id)
        .bind(house_id)
        .bind(active_only)
        .fetch_one(executor)
        .await?;

        Ok(exists.0)
    }

    pub async fn insert<'e, E>(executor: E, new: &NewRentalAgreement) -> AppResult<RentalAgreement>
    where
        E: PgExecutor<'e>,
    {
        let agreement = sqlx::query_as::<_, RentalAgreement>(
            r#"
            INSERT INTO rental_agreements (
                id, house_id, tenant_id, start_date, end_date, rent_amount, deposit, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.house_id)
        .bind(new.tenant_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.rent_amount)
        .bind(new.deposit)
        .fetch_one(executor)
        .await?;

        Ok(agreement)
    }

    /// Moves an active agreement to `status`. `None` when the agreement is
    /// no longer active.
    pub async fn close<'e, E>(
        executor: E,
        id: Uuid,
        status: AgreementStatus,
    ) -> AppResult<Option<RentalAgreement>>
    where
        E: PgExecutor<'e>,
    {
        let agreement = sqlx::query_as::<_, RentalAgreement>(
            r#"
            UPDATE rental_agreements SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'active' AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        Ok(agreement)
    }

    pub async fn list<'e, E>(
        executor: E,
        scope: ViewerScope,
        status: Option<AgreementStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<RentalAgreement>>
    where
        E: PgExecutor<'e>,
    {
        let agreements = sqlx::query_as::<_, RentalAgreement>(
            r#"
            SELECT ra.* FROM rental_agreements ra
            JOIN houses h ON h.id = ra.house_id
            WHERE ra.deleted_at IS NULL
              AND ($1::uuid IS NULL OR ra.tenant_id = $1)
              AND ($2::uuid IS NULL OR h.landlord_id = $2)
              AND ($3::agreement_status IS NULL OR ra.status = $3)
            ORDER BY ra.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(scope.tenant_id())
        .bind(scope.landlord_id())
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(agreements)
    }

    pub async fn count<'e, E>(
        executor: E,
        scope: ViewerScope,
        status: Option<AgreementStatus>,
    ) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM rental_agreements ra
            JOIN houses h ON h.id = ra.house_id
            WHERE ra.deleted_at IS NULL
              AND ($1::uuid IS NULL OR ra.tenant_id = $1)
              AND ($2::uuid IS NULL OR h.landlord_id = $2)
              AND ($3::agreement_status IS NULL OR ra.status = $3)
            "#,
        )
        .bind(scope.tenant_id())
        .bind(scope.landlord_id())
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }

    /// Preloads house and tenant for each agreement.
    pub async fn with_relations(
        pool: &PgPool,
        agreements: Vec<RentalAgreement>,
    ) -> AppResult<Vec<RentalAgreementResponse>> {
        if agreements.is_empty() {
            return Ok(Vec::new());
        }

        let house_ids: Vec<Uuid> = agreements.iter().map(|a| a.house_id).collect();
        let tenant_ids: Vec<Uuid> = agreements.iter().map(|a| a.tenant_id).collect();

        let houses: HashMap<_, _> = HouseRepository::find_many(pool, &house_ids)
            .await?
            .into_iter()
            .map(|h| (h.id, h))
            .collect();
        let tenants: HashMap<_, _> = UserRepository::find_many(pool, &tenant_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, UserPublic::from(u)))
            .collect();

        Ok(agreements
            .into_iter()
            .map(|agreement| RentalAgreementResponse {
                house: houses.get(&agreement.house_id).cloned(),
                tenant: tenants.get(&agreement.tenant_id).cloned(),
                agreement,
            })
            .collect())
    }
}
