//! Page-based pagination for list reports.

use serde::{Deserialize, Serialize};

/// Page used when none (or a non-positive one) is requested.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size used when none (or a non-positive one) is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Normalized pagination request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: u32,
    pub page_size: u32,
}

impl PaginationParams {
    /// Normalize raw values: non-positive values fall back to the defaults
    /// and the page size is capped at [`MAX_PAGE_SIZE`].
    #[must_use]
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page <= 0 {
            DEFAULT_PAGE
        } else {
            u32::try_from(page).unwrap_or(u32::MAX)
        };
        let page_size = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(i64::from(MAX_PAGE_SIZE)) as u32
        };
        Self { page, page_size }
    }

    /// Normalize optional values, as they arrive from a query string.
    #[must_use]
    pub fn from_options(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self::new(page.unwrap_or(0), page_size.unwrap_or(0))
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    /// Never less than 1, even for an empty result.
    pub total_pages: u64,
    pub has_more: bool,
    pub has_previous: bool,
}

impl<T> PaginatedResponse<T> {
    #[must_use]
    pub fn new(data: Vec<T>, params: PaginationParams, total_count: u64) -> Self {
        let page_size = u64::from(params.page_size.max(1));
        let total_pages = total_count.div_ceil(page_size).max(1);
        let page = u64::from(params.page);

        Self {
            data,
            page: params.page,
            page_size: params.page_size,
            total_count,
            total_pages,
            has_more: page < total_pages,
            has_previous: params.page > 1,
        }
    }

    /// Transform every row while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
            has_more: self.has_more,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_non_positive_values_use_defaults() {
        for (page, size) in [(0, 0), (-3, -1), (0, -50)] {
            let params = PaginationParams::new(page, size);
            assert_eq!(params.page, 1);
            assert_eq!(params.page_size, 50);
        }
        assert_eq!(
            PaginationParams::from_options(None, None),
            PaginationParams::default()
        );
    }

    #[test]
    fn oversized_pages_are_clamped() {
        assert_eq!(PaginationParams::new(1, 5000).page_size, 1000);
        assert_eq!(PaginationParams::new(1, 1000).page_size, 1000);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PaginationParams::new(1, 20).offset(), 0);
        assert_eq!(PaginationParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn deserialized_page_zero_does_not_underflow() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"page":0,"page_size":20}"#).unwrap();
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn empty_result_has_one_page() {
        let response: PaginatedResponse<u32> =
            PaginatedResponse::new(Vec::new(), PaginationParams::default(), 0);

        assert_eq!(response.total_pages, 1);
        assert!(!response.has_more);
        assert!(!response.has_previous);
    }

    #[test]
    fn page_flags_follow_position() {
        let params = PaginationParams::new(2, 10);
        let response = PaginatedResponse::new(vec![1, 2, 3], params, 25);

        assert_eq!(response.total_pages, 3);
        assert!(response.has_more);
        assert!(response.has_previous);

        let last = PaginatedResponse::new(vec![1], PaginationParams::new(3, 10), 25);
        assert!(!last.has_more);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        let response = PaginatedResponse::new(vec![0; 10], PaginationParams::new(1, 10), 20);
        assert_eq!(response.total_pages, 2);
    }

    #[test]
    fn map_keeps_metadata() {
        let response = PaginatedResponse::new(vec![1, 2], PaginationParams::new(1, 2), 5);
        let mapped = response.map(|n| n * 10);

        assert_eq!(mapped.data, vec![10, 20]);
        assert_eq!(mapped.total_count, 5);
        assert_eq!(mapped.total_pages, 3);
    }
}
