use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Payment, PaymentMethod, PaymentStats, PaymentStatus};
use crate::repository::ViewerScope;

pub struct NewPayment {
    pub agreement_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference_no: String,
    pub commission: Decimal,
    pub payment_date: DateTime<Utc>,
}

const SCOPED_FROM: &str = r#"
    FROM payments p
    JOIN rental_agreements ra ON ra.id = p.agreement_id
    JOIN houses h ON h.id = ra.house_id
    WHERE p.deleted_at IS NULL
      AND ($1::uuid IS NULL OR ra.tenant_id = $1)
      AND ($2::uuid IS NULL OR h.landlord_id = $2)
"#;

pub struct PaymentRepository;

impl PaymentRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<Payment>>
    where
        E: PgExecutor<'e>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    /// Inserts the payment as `pending`.
    pub async fn insert<'e, E>(executor: E, new: &NewPayment) -> AppResult<Payment>
    where
        E: PgExecutor<'e>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, agreement_id, amount, payment_date, method, reference_no, status, commission
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.agreement_id)
        .bind(new.amount)
        .bind(new.payment_date)
        .bind(new.method)
        .bind(&new.reference_no)
        .bind(new.commission)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    /// Applies a status transition guarded in SQL by the only status it may
    /// come from. `None` when the row was not in that status.
    pub async fn transition<'e, E>(
        executor: E,
        id: Uuid,
        status: PaymentStatus,
        reference_no: Option<&str>,
    ) -> AppResult<Option<Payment>>
    where
        E: PgExecutor<'e>,
    {
        let from = match status {
            PaymentStatus::Refunded => PaymentStatus::Completed,
            _ => PaymentStatus::Pending,
        };
        debug_assert!(from.can_transition_to(status));

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET
                status = $2,
                reference_no = COALESCE($3, reference_no),
                updated_at = NOW()
            WHERE id = $1 AND status = $4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reference_no)
        .bind(from)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    /// Whether another payment already carries `reference_no`.
    pub async fn reference_in_use<'e, E>(executor: E, reference_no: &str, except: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE reference_no = $1 AND id <> $2)",
        )
        .bind(reference_no)
        .bind(except)
        .fetch_one(executor)
        .await?;

        Ok(exists.0)
    }

    pub async fn list<'e, E>(
        executor: E,
        scope: ViewerScope,
        status: Option<PaymentStatus>,
        method: Option<PaymentMethod>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Payment>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            SELECT p.* {}
              AND ($3::payment_status IS NULL OR p.status = $3)
              AND ($4::payment_method IS NULL OR p.method = $4)
            ORDER BY p.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            SCOPED_FROM
        );

        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .bind(status)
            .bind(method)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(payments)
    }

    pub async fn count<'e, E>(
        executor: E,
        scope: ViewerScope,
        status: Option<PaymentStatus>,
        method: Option<PaymentMethod>,
    ) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            SELECT COUNT(*) {}
              AND ($3::payment_status IS NULL OR p.status = $3)
              AND ($4::payment_method IS NULL OR p.method = $4)
            "#,
            SCOPED_FROM
        );

        let total: (i64,) = sqlx::query_as(&sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .bind(status)
            .bind(method)
            .fetch_one(executor)
            .await?;

        Ok(total.0)
    }

    /// Totals over the payments visible to `scope`.
    pub async fn stats<'e, E>(executor: E, scope: ViewerScope) -> AppResult<PaymentStats>
    where
        E: PgExecutor<'e> + Copy,
    {
        let sql = format!(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(p.amount), 0),
                COUNT(*) FILTER (WHERE p.status = 'completed'),
                COALESCE(SUM(p.amount) FILTER (WHERE p.status = 'completed'), 0),
                COUNT(*) FILTER (WHERE p.status = 'pending'),
                COUNT(*) FILTER (WHERE p.status = 'failed')
            {}
            "#,
            SCOPED_FROM
        );

        let (total_payments, total_amount, completed_payments, completed_amount, pending_payments, failed_payments): (
            i64,
            Decimal,
            i64,
            Decimal,
            i64,
            i64,
        ) = sqlx::query_as(&sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .fetch_one(executor)
            .await?;

        let by_method_sql = format!("SELECT p.method::text, COUNT(*) {} GROUP BY p.method", SCOPED_FROM);
        let by_method: Vec<(String, i64)> = sqlx::query_as(&by_method_sql)
            .bind(scope.tenant_id())
            .bind(scope.landlord_id())
            .fetch_all(executor)
            .await?;

        Ok(PaymentStats {
            total_payments,
            total_amount,
            completed_payments,
            completed_amount,
            pending_payments,
            failed_payments,
            payments_by_method: by_method.into_iter().collect(),
        })
    }
}
