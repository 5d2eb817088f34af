use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Page/limit pair after defaults and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self::with_default_limit(page, limit, DEFAULT_LIMIT)
    }

    pub fn with_default_limit(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    /// Saturates for pages far past the end; those read as an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total_pages(total, self.limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// List payload: the page of items plus its pagination block.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, params: PageParams, total: i64) -> Self {
        Self {
            items,
            pagination: params.pagination(total),
        }
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_or_invalid_values() {
        assert_eq!(PageParams::new(None, None), PageParams { page: 1, limit: 10 });
        assert_eq!(PageParams::new(Some(0), Some(-5)), PageParams { page: 1, limit: 10 });
        assert_eq!(
            PageParams::with_default_limit(None, None, 20),
            PageParams { page: 1, limit: 20 }
        );
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(PageParams::new(Some(2), Some(1000)).limit, MAX_LIMIT);
    }

    #[test]
    fn offset_starts_at_zero() {
        assert_eq!(PageParams::new(Some(1), Some(10)).offset(), 0);
        assert_eq!(PageParams::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let params = PageParams::new(Some(i64::MAX), Some(100));
        assert_eq!(params.offset(), i64::MAX);
        assert_eq!(params.pagination(5).total_pages, 1);
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 20), 5);
    }
}
