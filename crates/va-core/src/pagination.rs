//! Pagination types for list endpoints
//!
//! List endpoints take `?page=&limit=` (1-indexed pages).

use serde::{Deserialize, Serialize};

/// Largest page number honoured; anything beyond is simply past the data
const MAX_PAGE: i64 = 1_000_000;

/// Pagination parameters (from query string)
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PageParams {
    /// Page number (1-indexed)
    pub page: i64,
    /// Items per page
    pub limit: i64,
}

impl PageParams {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            limit: limit.clamp(1, 1000),
        }
    }

    /// Build from optional query values, falling back to the given default page size
    pub fn from_query(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self::new(page.unwrap_or(1), limit.unwrap_or(default_limit))
    }

    /// Calculate the SQL offset
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of results plus the total match count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.limit == 0 {
            1
        } else {
            (self.total + self.limit - 1) / self.limit
        }
    }

    /// Slice an already-filtered, already-sorted collection
    pub fn from_vec(all: Vec<T>, params: PageParams) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .collect();
        Self::new(items, total, params)
    }
}
