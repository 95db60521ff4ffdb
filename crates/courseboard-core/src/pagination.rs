//! List paging for the directory, catalog and ledger endpoints.
//!
//! Clients page either by `offset` or by 1-based `page`; `page` wins when both
//! are sent. Every list response carries a [`PaginationMeta`]:
//!
//! ```json
//! { "data": [], "meta": { "total": 42, "limit": 10, "offset": 20, "page": 3, "has_more": true } }
//! ```

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::serde::deserialize_optional_parsed;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Rows matching the filters, ignoring paging
    pub total: i64,
    /// Page size actually applied
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    pub has_more: bool,
}

impl PaginationMeta {
    pub fn from_params(total: i64, params: &PaginationParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();

        Self {
            total,
            limit,
            offset: Some(offset),
            page: params.page(),
            has_more: offset + limit < total,
        }
    }
}

/// Paging query parameters. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page size, 1 to 100 (default 10)
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub limit: Option<i64>,
    /// Rows to skip; ignored when `page` is set
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub offset: Option<i64>,
    /// 1-based page number
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub page: Option<i64>,
}

impl PaginationParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        match self.page() {
            Some(page) => (page - 1) * self.limit(),
            None => self.offset.unwrap_or(0).max(0),
        }
    }

    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.page.map(|p| p.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<i64>, offset: Option<i64>, page: Option<i64>) -> PaginationParams {
        PaginationParams {
            limit,
            offset,
            page,
        }
    }

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), DEFAULT_LIMIT);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.page(), None);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(params(Some(0), None, None).limit(), 1);
        assert_eq!(params(Some(250), None, None).limit(), MAX_LIMIT);
        assert_eq!(params(Some(25), None, None).limit(), 25);
    }

    #[test]
    fn test_page_overrides_offset() {
        let p = params(Some(20), Some(5), Some(3));
        assert_eq!(p.offset(), 40);

        let first = params(Some(20), Some(5), Some(-2));
        assert_eq!(first.page(), Some(1));
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn test_has_more_on_last_page() {
        assert!(PaginationMeta::from_params(5, &params(Some(2), Some(2), None)).has_more);
        assert!(!PaginationMeta::from_params(5, &params(Some(2), Some(4), None)).has_more);
    }

    #[test]
    fn test_blank_query_values_use_defaults() {
        let p: PaginationParams = serde_json::from_str(r#"{"limit":"","page":" "}"#).unwrap();
        assert_eq!(p, PaginationParams::default());

        let p: PaginationParams = serde_json::from_str(r#"{"limit":"30","offset":"60"}"#).unwrap();
        assert_eq!(p.limit(), 30);
        assert_eq!(p.offset(), 60);
    }
}
