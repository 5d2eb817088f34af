use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::models::{parse_date, House, Payment, UserPublic, DATE_FORMAT};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TypeCount {
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MethodBreakdown {
    pub method: String,
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCounts {
    pub total: i64,
    pub by_role: Vec<RoleCount>,
    pub recent: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HouseCounts {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub recent: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgreementCounts {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentTotals {
    pub total: i64,
    /// Sum over completed payments only.
    pub revenue: Decimal,
    pub commission: Decimal,
    pub by_method: Vec<MethodBreakdown>,
    pub recent: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MaintenanceCounts {
    pub total: i64,
    pub pending: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewTotals {
    pub total: i64,
    pub average_rating: f64,
}

/// Admin dashboard. `recent` counters cover the last 30 days.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: UserCounts,
    pub houses: HouseCounts,
    pub agreements: AgreementCounts,
    pub payments: PaymentTotals,
    pub maintenance: MaintenanceCounts,
    pub reviews: ReviewTotals,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Payments,
    Houses,
    Users,
}

impl ReportType {
    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        match value {
            Some("payments") => Ok(Self::Payments),
            Some("houses") => Ok(Self::Houses),
            Some("users") => Ok(Self::Users),
            _ => Err(AppError::BadRequest("Invalid report type".to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
}

/// Half-open time window `[from, until)` a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl ReportWindow {
    /// Explicit dates cover whole days, so `end_date` is included. Missing
    /// bounds default to one month ago and now.
    pub fn resolve(
        start_date: Option<&str>,
        end_date: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let from = match start_date.filter(|s| !s.is_empty()) {
            Some(raw) => start_of_day(parse_date(raw).ok_or_else(|| {
                AppError::BadRequest("Invalid start date format. Use YYYY-MM-DD".to_string())
            })?),
            None => now.checked_sub_months(Months::new(1)).unwrap_or(now),
        };

        let until = match end_date.filter(|s| !s.is_empty()) {
            Some(raw) => {
                start_of_day(parse_date(raw).ok_or_else(|| {
                    AppError::BadRequest("Invalid end date format. Use YYYY-MM-DD".to_string())
                })?) + Duration::days(1)
            }
            None => now,
        };

        if until < from {
            return Err(AppError::BadRequest(
                "End date must be after start date".to_string(),
            ));
        }

        Ok(Self { from, until })
    }

    pub fn period(&self) -> ReportPeriod {
        let last_day = if self.until.time() == NaiveTime::MIN && self.until > self.from {
            self.until - Duration::days(1)
        } else {
            self.until
        };

        ReportPeriod {
            start_date: self.from.format(DATE_FORMAT).to_string(),
            end_date: last_day.format(DATE_FORMAT).to_string(),
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReportSummary {
    pub total_amount: Decimal,
    pub total_commission: Decimal,
    pub total_payments: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReport {
    pub period: ReportPeriod,
    pub summary: PaymentReportSummary,
    pub payments_by_method: Vec<MethodBreakdown>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HouseReportSummary {
    pub total_houses: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HouseReport {
    pub period: ReportPeriod,
    pub summary: HouseReportSummary,
    pub houses_by_type: Vec<TypeCount>,
    pub houses_by_status: Vec<StatusCount>,
    pub houses: Vec<House>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserReportSummary {
    pub total_users: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserReport {
    pub period: ReportPeriod,
    pub summary: UserReportSummary,
    pub users_by_role: Vec<RoleCount>,
    pub users: Vec<UserPublic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn explicit_window_includes_whole_end_day() {
        let window = ReportWindow::resolve(Some("2025-01-01"), Some("2025-01-31"), now()).unwrap();

        assert_eq!(window.from, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.until, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(
            window.period(),
            ReportPeriod {
                start_date: "2025-01-01".to_string(),
                end_date: "2025-01-31".to_string(),
            }
        );
    }

    #[test]
    fn missing_bounds_default_to_last_month() {
        let window = ReportWindow::resolve(None, None, now()).unwrap();

        assert_eq!(window.from, Utc.with_ymd_and_hms(2025, 2, 15, 10, 30, 0).unwrap());
        assert_eq!(window.until, now());
        assert_eq!(window.period().end_date, "2025-03-15");
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let err = ReportWindow::resolve(Some("01/01/2025"), None, now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Invalid start date")));

        let err = ReportWindow::resolve(None, Some("2025-13-01"), now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Invalid end date")));
    }

    #[test]
    fn report_type_must_be_known() {
        assert_eq!(ReportType::parse(Some("payments")).unwrap(), ReportType::Payments);
        assert!(ReportType::parse(Some("reviews")).is_err());
        assert!(ReportType::parse(None).is_err());
    }
}
