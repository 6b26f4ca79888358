use serde::Deserialize;
use validator::Validate;

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct Pagination {
    #[serde(default)]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// `?year=`; absent means the current UTC year.
#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let page: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert!(page.validate().is_ok());
    }

    #[test]
    fn limit_bounds_enforced() {
        for limit in [0, 101] {
            let page = Pagination { skip: 0, limit };
            assert!(page.validate().is_err(), "limit {}", limit);
        }
    }
}
