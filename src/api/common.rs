//! Common API utilities and shared types

use serde::{Deserialize, Serialize};

use crate::models::ListParams;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_limit() -> u32 {
    10
}

/// `?page=&limit=&search=` for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: None,
        }
    }
}

impl From<ListQuery> for ListParams {
    fn from(query: ListQuery) -> Self {
        ListParams::new(query.page, query.limit, query.search)
    }
}

/// `?limit=` for the recent activity feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
