//! Page requests and page metadata

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Requested page. Missing or non-positive values fall back to the
/// request defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Effective `(page, limit)`
    pub fn resolve(&self, default_limit: u64) -> (u64, u64) {
        let positive = |value: Option<i64>| value.filter(|v| *v > 0).map(|v| v as u64);
        let default_limit = if default_limit == 0 {
            DEFAULT_LIMIT
        } else {
            default_limit
        };
        (
            positive(self.page).unwrap_or(DEFAULT_PAGE),
            positive(self.limit).unwrap_or(default_limit),
        )
    }
}

/// Inclusive row range of a page. Saturates, so a page past the end of
/// the addressable range is simply empty.
pub fn page_range(page: u64, limit: u64) -> (usize, usize) {
    let start = page.saturating_sub(1).saturating_mul(limit);
    let end = start.saturating_add(limit.saturating_sub(1));
    let clamp = |value: u64| usize::try_from(value).unwrap_or(usize::MAX);
    (clamp(start), clamp(end))
}

/// Pagination metadata returned next to a page of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    /// Total number of rows matching the filter
    pub count: u64,
}
