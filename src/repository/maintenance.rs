use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    MaintenancePriority, MaintenanceRequest, MaintenanceRequestResponse, MaintenanceStats,
    MaintenanceStatus, UserPublic,
};
use crate::repository::{HouseRepository, UserRepository, ViewerScope};

pub struct NewMaintenanceRequest<'a> {
    pub tenant_id: Uuid,
    pub house_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub priority: MaintenancePriority,
}

const SCOPED_FROM: &str = r#"
    FROM maintenance_requests m
    JOIN houses h ON h.id = m.house_id
    WHERE m.deleted_at IS NULL
      AND ($1::uuid IS NULL OR m.tenant_id = $1)
      AND ($2::uuid IS NULL OR h.landlord_id = $2)
"#;

pub struct MaintenanceRepository;

impl MaintenanceRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<MaintenanceRequest>>
    where
        E: PgExecutor<'e>,
    {
        let request = sqlx::query_as::<_, MaintenanceRequest>(
            "SELECT * FROM maintenance_requests WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(request)
    }

    pub async fn lock<'e, E>(executor: E, id: Uuid) -> AppResult<Option<MaintenanceRequest>>
    where
        E: PgExecutor<'e>,
    {
        let request = sqlx::query_as::<_, MaintenanceRequest>(
            "SELECT * FROM maintenance_requests WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(request)
    }

    pub async fn insert<'e, E>(executor: E, new: &NewMaintenanceRequest<'_>) -> AppResult<MaintenanceRequest>
    where
        E: PgExecutor<'e>,
    {
        let request = sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            INSERT INTO maintenance_requests (
                id, tenant_id, house_id, title, description, priority, status, reported_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.tenant_id)
        .bind(new.house_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.priority)
        .fetch_one(executor)
        .await?;

        Ok(request)
    }

    /// Writes status, `resolved_at` and priority together so the
    /// resolved/resolved_at check holds after every update.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        status: MaintenanceStatus,
        resolved_at: Option<DateTime<Utc>>,
        priority: MaintenancePriority,
    ) -> AppResult<MaintenanceRequest>
    where
        E: PgExecutor<'e>,
    {
        let request = sqlx::query_as::<_, MaintenanceRequest>(
            r#"
            UPDATE maintenance_requests SET
                status = $2,
                resolved_at = $3,
                priority = $4,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(resolved_at)
        .bind(priority)
        .fetch_one(executor)
        .await?;

        Ok(request)
    }

    pub async fn list<'e, E>(
        executor: E,
        scope: ViewerScope,
        status: Option<MaintenanceStatus>,
        priority: Option<MaintenancePriority>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<MaintenanceRequest>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            SELECT m.* {}
              AND ($3::maintenance_status IS NULL OR m.status = $3)
              AND ($4::maintenance_priority IS NULL OR m.priority = $4)
            ORDER BY m.reported_at DESC
            LIMIT $5 OFFSET $6
            "#,
            SCOPED_FROM
        );

        let requests = sqlx::query_as::<_, MaintenanceRequest>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .bind(status)
            .bind(priority)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(requests)
    }

    pub async fn count<'e, E>(
        executor: E,
        scope: ViewerScope,
        status: Option<MaintenanceStatus>,
        priority: Option<MaintenancePriority>,
    ) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            SELECT COUNT(*) {}
              AND ($3::maintenance_status IS NULL OR m.status = $3)
              AND ($4::maintenance_priority IS NULL OR m.priority = $4)
            "#,
            SCOPED_FROM
        );

        let total: (i64,) = sqlx::query_as(&sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .bind(status)
            .bind(priority)
            .fetch_one(executor)
            .await?;

        Ok(total.0)
    }

    pub async fn stats<'e, E>(executor: E, scope: ViewerScope) -> AppResult<MaintenanceStats>
    where
        E: PgExecutor<'e> + Copy,
    {
        let total_sql = format!(
            r#"
            SELECT
                COUNT(*),
                (AVG(EXTRACT(EPOCH FROM (m.resolved_at - m.reported_at)) / 86400.0)
                    FILTER (WHERE m.status = 'resolved'))::float8
            {}
            "#,
            SCOPED_FROM
        );
        let (total_requests, avg_days): (i64, Option<f64>) = sqlx::query_as(&total_sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .fetch_one(executor)
            .await?;

        let by_status_sql = format!("SELECT m.status::text, COUNT(*) {} GROUP BY m.status", SCOPED_FROM);
        let by_status: Vec<(String, i64)> = sqlx::query_as(&by_status_sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .fetch_all(executor)
            .await?;

        let by_priority_sql =
            format!("SELECT m.priority::text, COUNT(*) {} GROUP BY m.priority", SCOPED_FROM);
        let by_priority: Vec<(String, i64)> = sqlx::query_as(&by_priority_sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .fetch_all(executor)
            .await?;

        Ok(MaintenanceStats {
            total_requests,
            requests_by_status: by_status.into_iter().collect(),
            requests_by_priority: by_priority.into_iter().collect(),
            avg_resolution_days: avg_days.map(|d| (d * 100.0).round() / 100.0).unwrap_or(0.0),
        })
    }

    pub async fn with_relations(
        pool: &PgPool,
        requests: Vec<MaintenanceRequest>,
    ) -> AppResult<Vec<MaintenanceRequestResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let house_ids: Vec<Uuid> = requests.iter().map(|r| r.house_id).collect();
        let tenant_ids: Vec<Uuid> = requests.iter().map(|r| r.tenant_id).collect();

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

        Ok(requests
            .into_iter()
            .map(|request| MaintenanceRequestResponse {
                house: houses.get(&request.house_id).cloned(),
                tenant: tenants.get(&request.tenant_id).cloned(),
                request,
            })
            .collect())
    }
}
