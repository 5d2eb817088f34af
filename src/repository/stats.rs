//! Aggregations behind the admin dashboard and date-bounded reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::{
    AgreementCounts, DashboardStats, House, HouseCounts, HouseReport, HouseReportSummary,
    MaintenanceCounts, MethodBreakdown, Payment, PaymentMethod, PaymentReport,
    PaymentReportSummary, PaymentStatus, PaymentTotals, ReportWindow, ReviewTotals, RoleCount,
    StatusCount, TypeCount, User, UserCounts, UserPublic, UserReport, UserReportSummary,
};

/// Window of the dashboard `recent` counters.
pub const RECENT_DAYS: i64 = 30;

pub async fn dashboard(pool: &PgPool, now: DateTime<Utc>) -> AppResult<DashboardStats> {
    let since = now - Duration::days(RECENT_DAYS);

    let (users_total, users_recent): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE created_at >= $1)
        FROM users WHERE deleted_at IS NULL
        "#,
    )
    .bind(since)
    .fetch_one(pool)
    .await?;

    let by_role = sqlx::query_as::<_, RoleCount>(
        r#"
        SELECT role::text AS role, COUNT(*) AS count
        FROM users WHERE deleted_at IS NULL
        GROUP BY role ORDER BY role
        "#,
    )
    .fetch_all(pool)
    .await?;

    let (houses_total, houses_recent): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE created_at >= $1)
        FROM houses WHERE deleted_at IS NULL
        "#,
    )
    .bind(since)
    .fetch_one(pool)
    .await?;

    let by_status = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT status::text AS status, COUNT(*) AS count
        FROM houses WHERE deleted_at IS NULL
        GROUP BY status ORDER BY status
        "#,
    )
    .fetch_all(pool)
    .await?;

    let (agreements_total, agreements_active): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'active')
        FROM rental_agreements WHERE deleted_at IS NULL
        "#,
    )
    .fetch_one(pool)
    .await?;

    let (payments_total, revenue, commission, payments_recent): (i64, Decimal, Decimal, i64) =
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0),
                COALESCE(SUM(commission) FILTER (WHERE status = 'completed'), 0),
                COUNT(*) FILTER (WHERE created_at >= $1)
            FROM payments WHERE deleted_at IS NULL
            "#,
        )
        .bind(since)
        .fetch_one(pool)
        .await?;

    let by_method = sqlx::query_as::<_, MethodBreakdown>(
        r#"
        SELECT
            method::text AS method,
            COUNT(*) AS count,
            COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0) AS amount
        FROM payments WHERE deleted_at IS NULL
        GROUP BY method ORDER BY method
        "#,
    )
    .fetch_all(pool)
    .await?;

    let (maintenance_total, maintenance_pending): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'pending')
        FROM maintenance_requests WHERE deleted_at IS NULL
        "#,
    )
    .fetch_one(pool)
    .await?;

    let (reviews_total, average_rating): (i64, Option<f64>) = sqlx::query_as(
        "SELECT COUNT(*), AVG(rating)::float8 FROM reviews WHERE deleted_at IS NULL",
    )
    .fetch_one(pool)
    .await?;

    Ok(DashboardStats {
        users: UserCounts {
            total: users_total,
            by_role,
            recent: users_recent,
        },
        houses: HouseCounts {
            total: houses_total,
            by_status,
            recent: houses_recent,
        },
        agreements: AgreementCounts {
            total: agreements_total,
            active: agreements_active,
        },
        payments: PaymentTotals {
            total: payments_total,
            revenue,
            commission,
            by_method,
            recent: payments_recent,
        },
        maintenance: MaintenanceCounts {
            total: maintenance_total,
            pending: maintenance_pending,
        },
        reviews: ReviewTotals {
            total: reviews_total,
            average_rating: average_rating.map(|a| (a * 100.0).round() / 100.0).unwrap_or(0.0),
        },
    })
}

pub async fn payment_report(pool: &PgPool, window: ReportWindow) -> AppResult<PaymentReport> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(window.from)
    .bind(window.until)
    .fetch_all(pool)
    .await?;

    let payments_by_method = completed_by_method(&payments);

    Ok(PaymentReport {
        period: window.period(),
        summary: summarize_payments(&payments),
        payments_by_method,
        payments,
    })
}

/// Per-method count and amount of completed payments, matching the summary.
pub fn completed_by_method(payments: &[Payment]) -> Vec<MethodBreakdown> {
    let mut by_method: BTreeMap<PaymentMethod, (i64, Decimal)> = BTreeMap::new();
    for p in payments.iter().filter(|p| p.status == PaymentStatus::Completed) {
        let entry = by_method.entry(p.method).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += p.amount;
    }

    by_method
        .into_iter()
        .map(|(method, (count, amount))| MethodBreakdown {
            method: method.as_str().to_string(),
            count,
            amount,
        })
        .collect()
}

/// Amount and commission count completed payments only.
pub fn summarize_payments(payments: &[Payment]) -> PaymentReportSummary {
    let completed = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed);

    let (total_amount, total_commission) = completed.fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(amount, commission), p| (amount + p.amount, commission + p.commission),
    );

    PaymentReportSummary {
        total_amount,
        total_commission,
        total_payments: payments.len() as i64,
    }
}

pub async fn house_report(pool: &PgPool, window: ReportWindow) -> AppResult<HouseReport> {
    let houses = sqlx::query_as::<_, House>(
        r#"
        SELECT * FROM houses
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(window.from)
    .bind(window.until)
    .fetch_all(pool)
    .await?;

    let houses_by_type = sqlx::query_as::<_, TypeCount>(
        r#"
        SELECT house_type::text AS type, COUNT(*) AS count
        FROM houses
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        GROUP BY house_type ORDER BY house_type
        "#,
    )
    .bind(window.from)
    .bind(window.until)
    .fetch_all(pool)
    .await?;

    let houses_by_status = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT status::text AS status, COUNT(*) AS count
        FROM houses
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        GROUP BY status ORDER BY status
        "#,
    )
    .bind(window.from)
    .bind(window.until)
    .fetch_all(pool)
    .await?;

    Ok(HouseReport {
        period: window.period(),
        summary: HouseReportSummary {
            total_houses: houses.len() as i64,
        },
        houses_by_type,
        houses_by_status,
        houses,
    })
}

pub async fn user_report(pool: &PgPool, window: ReportWindow) -> AppResult<UserReport> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(window.from)
    .bind(window.until)
    .fetch_all(pool)
    .await?;

    let users_by_role = sqlx::query_as::<_, RoleCount>(
        r#"
        SELECT role::text AS role, COUNT(*) AS count
        FROM users
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        GROUP BY role ORDER BY role
        "#,
    )
    .bind(window.from)
    .bind(window.until)
    .fetch_all(pool)
    .await?;

    Ok(UserReport {
        period: window.period(),
        summary: UserReportSummary {
            total_users: users.len() as i64,
        },
        users_by_role,
        users: users.into_iter().map(UserPublic::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn payment(amount: i64, status: PaymentStatus) -> Payment {
        paid_with(PaymentMethod::Cash, amount, status)
    }

    fn paid_with(method: PaymentMethod, amount: i64, status: PaymentStatus) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            agreement_id: Uuid::new_v4(),
            amount: Decimal::new(amount, 0),
            payment_date: now,
            method,
            reference_no: format!("{}_{}", method.as_str(), amount),
            status,
            commission: Decimal::new(amount * 5, 2),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn summary_sums_completed_payments_only() {
        let payments = vec![
            payment(5000, PaymentStatus::Completed),
            payment(1000, PaymentStatus::Failed),
            payment(2000, PaymentStatus::Completed),
            payment(700, PaymentStatus::Pending),
        ];

        let summary = summarize_payments(&payments);
        assert_eq!(summary.total_amount, Decimal::new(7000, 0));
        assert_eq!(summary.total_commission, Decimal::new(35000, 2));
        assert_eq!(summary.total_payments, 4);
    }

    #[test]
    fn empty_window_has_zero_totals() {
        let summary = summarize_payments(&[]);
        assert_eq!(summary.total_amount, Decimal::ZERO);
        assert_eq!(summary.total_payments, 0);
    }

    #[test]
    fn method_breakdown_ignores_unsettled_payments() {
        let payments = vec![
            paid_with(PaymentMethod::Mtn, 5000, PaymentStatus::Completed),
            paid_with(PaymentMethod::Mtn, 900, PaymentStatus::Failed),
            paid_with(PaymentMethod::Cash, 2000, PaymentStatus::Completed),
            paid_with(PaymentMethod::Bank, 700, PaymentStatus::Pending),
        ];

        let breakdown = completed_by_method(&payments);
        let rows: Vec<(&str, i64, Decimal)> = breakdown
            .iter()
            .map(|b| (b.method.as_str(), b.count, b.amount))
            .collect();
        assert_eq!(
            rows,
            vec![("MTN", 1, Decimal::new(5000, 0)), ("Cash", 1, Decimal::new(2000, 0))]
        );

        let total: Decimal = breakdown.iter().map(|b| b.amount).sum();
        assert_eq!(total, summarize_payments(&payments).total_amount);
    }
}
