//! Offset/limit pagination windows and link arithmetic
//!
//! A [`PageWindow`] is derived from the `page` query parameters of a list request.
//! Malformed or missing values fall back to configured defaults instead of failing.
//! Both the `page[offset]`/`page[limit]` and the `page[number]`/`page[size]` styles
//! are understood; the former wins when both are present.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_service::pagination::PageWindow;
//!
//! let window = PageWindow::new(20, 20);
//! assert_eq!(window.current(), 2);
//! assert_eq!(window.prev().map(|w| w.offset), Some(0));
//! assert_eq!(window.next(57).map(|w| w.offset), Some(40));
//! assert_eq!(window.last(57).offset, 40);
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::PaginationConfig;
use crate::document::Links;

/// Default page size
pub const DEFAULT_LIMIT: u64 = 20;

/// Maximum page size
pub const MAX_LIMIT: u64 = 100;

/// An offset/limit slice of a result set; `limit` is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Number of records to skip
    pub offset: u64,
    /// Maximum number of records on the page
    pub limit: u64,
}

impl PageWindow {
    /// Create a window; a zero limit is raised to one
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        let limit = if limit == 0 { 1 } else { limit };
        Self { offset, limit }
    }

    /// Derive a window from the `page` query parameters
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use jsonapi_service::config::PaginationConfig;
    /// use jsonapi_service::pagination::PageWindow;
    ///
    /// let mut page = BTreeMap::new();
    /// page.insert("number".to_string(), "3".to_string());
    /// page.insert("size".to_string(), "10".to_string());
    ///
    /// let window = PageWindow::from_params(Some(&page), &PaginationConfig::default());
    /// assert_eq!(window, PageWindow::new(20, 10));
    /// ```
    pub fn from_params(page: Option<&BTreeMap<String, String>>, config: &PaginationConfig) -> Self {
        let max_limit = config.max_limit.max(1);
        let default_limit = config.default_limit.max(1).min(max_limit);

        let Some(page) = page else {
            return Self::new(0, default_limit);
        };

        let number = |key: &str| page.get(key).and_then(|v| v.trim().parse::<u64>().ok());
        let positive = |key: &str| number(key).filter(|n| *n > 0);

        if page.contains_key("offset") || page.contains_key("limit") {
            let limit = positive("limit").unwrap_or(default_limit).min(max_limit);
            return Self::new(number("offset").unwrap_or(0), limit);
        }

        if page.contains_key("number") || page.contains_key("size") {
            let size = positive("size").unwrap_or(default_limit).min(max_limit);
            let page_number = positive("number").unwrap_or(1);
            return Self::new((page_number - 1).saturating_mul(size), size);
        }

        Self::new(0, default_limit)
    }

    /// One-based page number containing `offset`
    #[must_use]
    pub const fn current(&self) -> u64 {
        (self.offset / self.limit).saturating_add(1)
    }

    /// Whether the result set spans more than one page
    #[must_use]
    pub const fn is_active(&self, total: u64) -> bool {
        total > self.limit
    }

    /// Previous window, absent on the first page
    #[must_use]
    pub fn prev(&self) -> Option<Self> {
        (self.offset > 0).then(|| Self::new(self.offset.saturating_sub(self.limit), self.limit))
    }

    /// Next window, absent when this window reaches the end of the result set
    #[must_use]
    pub fn next(&self, total: u64) -> Option<Self> {
        let offset = self.offset.saturating_add(self.limit);
        (offset < total).then(|| Self::new(offset, self.limit))
    }

    /// Window starting at the first record
    #[must_use]
    pub const fn first(&self) -> Self {
        Self::new(0, self.limit)
    }

    /// Window containing the last record
    #[must_use]
    pub const fn last(&self, total: u64) -> Self {
        if total == 0 {
            return Self::new(0, self.limit);
        }
        Self::new((total - 1) / self.limit * self.limit, self.limit)
    }

    /// List meta for a page holding `size` records out of `total`
    #[must_use]
    pub fn meta(&self, total: u64, size: usize) -> PageMeta {
        if !self.is_active(total) {
            return PageMeta::total(total);
        }
        PageMeta {
            total,
            size: Some(size as u64),
            offset: Some(self.offset),
            limit: Some(self.limit),
            current: Some(self.current()),
        }
    }

    /// Top-level links for a list response
    ///
    /// Only `self` is emitted unless the result set spans more than one page.
    pub fn links(&self, total: u64, url: &PageUrl) -> Links {
        let mut links = Links::with_self(url.self_link());
        if self.is_active(total) {
            links.first = Some(url.with_window(self.first()));
            links.prev = self.prev().map(|w| url.with_window(w));
            links.next = self.next(total).map(|w| url.with_window(w));
            links.last = Some(url.with_window(self.last(total)));
        }
        links
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(0, DEFAULT_LIMIT)
    }
}

/// List response meta
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// Number of records matching the filter
    pub total: u64,
    /// Number of records on this page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Offset of this page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// One-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
}

impl PageMeta {
    /// Meta carrying only the total
    #[must_use]
    pub const fn total(total: u64) -> Self {
        Self {
            total,
            size: None,
            offset: None,
            limit: None,
            current: None,
        }
    }
}

/// Request URL used to rebuild pagination links
///
/// Query pairs are kept in their raw (still encoded) form; rebuilding a link replaces
/// every `page[...]` pair with the window's `page[offset]` and `page[limit]`.
#[derive(Debug, Clone)]
pub struct PageUrl {
    path: String,
    query: String,
    pairs: Vec<(String, String)>,
}

impl PageUrl {
    /// Build from an absolute link path and the raw request query string
    pub fn new(path: impl Into<String>, query: Option<&str>) -> Self {
        let query = query.unwrap_or_default().trim_start_matches('?').to_string();
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .filter(|(key, _)| !is_page_key(key))
            .collect();

        Self {
            path: path.into(),
            query,
            pairs,
        }
    }

    /// Link to the request as received
    pub fn self_link(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// Link to the same request with a different window
    pub fn with_window(&self, window: PageWindow) -> String {
        let mut query: Vec<String> = self
            .pairs
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect();
        query.push(format!("{}={}", urlencoding::encode("page[offset]"), window.offset));
        query.push(format!("{}={}", urlencoding::encode("page[limit]"), window.limit));
        format!("{}?{}", self.path, query.join("&"))
    }
}

fn is_page_key(raw_key: &str) -> bool {
    let key = raw_key.replace('+', " ");
    let decoded = urlencoding::decode(&key).map(|k| k.into_owned()).unwrap_or(key);
    decoded == "page" || decoded.starts_with("page[")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_window_arithmetic() {
        let window = PageWindow::new(20, 20);
        assert_eq!(window.current(), 2);
        assert_eq!(window.prev(), Some(PageWindow::new(0, 20)));
        assert_eq!(window.next(57), Some(PageWindow::new(40, 20)));
        assert_eq!(window.first(), PageWindow::new(0, 20));
        assert_eq!(window.last(57), PageWindow::new(40, 20));
    }

    #[test]
    fn test_first_page_has_no_prev() {
        let window = PageWindow::new(0, 20);
        assert_eq!(window.prev(), None);
        assert_eq!(window.current(), 1);
    }

    #[test]
    fn test_maximum_offset_saturates() {
        let window = PageWindow::new(u64::MAX, 1);
        assert_eq!(window.current(), u64::MAX);
        assert_eq!(window.next(3), None);
        assert_eq!(window.meta(3, 0).current, Some(u64::MAX));

        let window = PageWindow::from_params(
            Some(&page(&[("offset", "18446744073709551615"), ("limit", "1")])),
            &PaginationConfig::default(),
        );
        assert_eq!(window, PageWindow::new(u64::MAX, 1));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let window = PageWindow::new(40, 20);
        assert_eq!(window.next(57), None);
        assert_eq!(window.next(60), None);
        assert_eq!(window.next(61), Some(PageWindow::new(60, 20)));
    }

    #[test]
    fn test_prev_clamps_at_zero() {
        let window = PageWindow::new(5, 20);
        assert_eq!(window.prev(), Some(PageWindow::new(0, 20)));
        assert_eq!(window.current(), 1);
    }

    #[test]
    fn test_last_window_edges() {
        let window = PageWindow::new(0, 20);
        assert_eq!(window.last(0).offset, 0);
        assert_eq!(window.last(20).offset, 0);
        assert_eq!(window.last(21).offset, 20);
        assert_eq!(window.last(40).offset, 20);
    }

    #[test]
    fn test_zero_limit_is_raised() {
        assert_eq!(PageWindow::new(0, 0).limit, 1);
    }

    #[test]
    fn test_from_params_defaults() {
        let config = PaginationConfig::default();
        assert_eq!(PageWindow::from_params(None, &config), PageWindow::new(0, 20));
        assert_eq!(
            PageWindow::from_params(Some(&page(&[])), &config),
            PageWindow::new(0, 20)
        );
    }

    #[test]
    fn test_from_params_offset_limit() {
        let config = PaginationConfig::default();
        let window = PageWindow::from_params(Some(&page(&[("offset", "40"), ("limit", "10")])), &config);
        assert_eq!(window, PageWindow::new(40, 10));
    }

    #[test]
    fn test_from_params_malformed_values_fall_back() {
        let config = PaginationConfig::default();
        let window = PageWindow::from_params(
            Some(&page(&[("offset", "-3"), ("limit", "lots")])),
            &config,
        );
        assert_eq!(window, PageWindow::new(0, 20));

        let window = PageWindow::from_params(Some(&page(&[("limit", "0")])), &config);
        assert_eq!(window, PageWindow::new(0, 20));
    }

    #[test]
    fn test_from_params_clamps_limit() {
        let config = PaginationConfig {
            default_limit: 10,
            max_limit: 50,
        };
        let window = PageWindow::from_params(Some(&page(&[("limit", "500")])), &config);
        assert_eq!(window.limit, 50);

        let window = PageWindow::from_params(Some(&page(&[("number", "2"), ("size", "500")])), &config);
        assert_eq!(window, PageWindow::new(50, 50));
    }

    #[test]
    fn test_from_params_number_and_size() {
        let config = PaginationConfig::default();
        let window = PageWindow::from_params(Some(&page(&[("number", "3"), ("size", "15")])), &config);
        assert_eq!(window, PageWindow::new(30, 15));

        let window = PageWindow::from_params(Some(&page(&[("number", "0")])), &config);
        assert_eq!(window, PageWindow::new(0, 20));
    }

    #[test]
    fn test_meta_inactive_contains_only_total() {
        let window = PageWindow::new(0, 20);
        assert_eq!(window.meta(20, 20), PageMeta::total(20));

        let json = serde_json::to_value(window.meta(3, 3)).expect("serializes");
        assert_eq!(json, serde_json::json!({"total": 3}));
    }

    #[test]
    fn test_meta_active() {
        let window = PageWindow::new(20, 20);
        let meta = window.meta(57, 20);
        assert_eq!(meta.total, 57);
        assert_eq!(meta.size, Some(20));
        assert_eq!(meta.offset, Some(20));
        assert_eq!(meta.limit, Some(20));
        assert_eq!(meta.current, Some(2));
    }

    #[test]
    fn test_links_inactive() {
        let url = PageUrl::new("/api/v1/articles", Some("sort=-title"));
        let links = PageWindow::new(0, 20).links(5, &url);
        assert_eq!(links.self_link.as_deref(), Some("/api/v1/articles?sort=-title"));
        assert!(links.first.is_none());
        assert!(links.prev.is_none());
        assert!(links.next.is_none());
        assert!(links.last.is_none());
    }

    #[test]
    fn test_links_active_merge_query() {
        let url = PageUrl::new(
            "/api/v1/articles",
            Some("sort=-title&page%5Boffset%5D=20&page[limit]=20&filter[author]=1"),
        );
        let links = PageWindow::new(20, 20).links(57, &url);

        assert_eq!(
            links.self_link.as_deref(),
            Some("/api/v1/articles?sort=-title&page%5Boffset%5D=20&page[limit]=20&filter[author]=1")
        );
        assert_eq!(
            links.first.as_deref(),
            Some("/api/v1/articles?sort=-title&filter[author]=1&page%5Boffset%5D=0&page%5Blimit%5D=20")
        );
        assert_eq!(
            links.prev.as_deref(),
            Some("/api/v1/articles?sort=-title&filter[author]=1&page%5Boffset%5D=0&page%5Blimit%5D=20")
        );
        assert_eq!(
            links.next.as_deref(),
            Some("/api/v1/articles?sort=-title&filter[author]=1&page%5Boffset%5D=40&page%5Blimit%5D=20")
        );
        assert_eq!(
            links.last.as_deref(),
            Some("/api/v1/articles?sort=-title&filter[author]=1&page%5Boffset%5D=40&page%5Blimit%5D=20")
        );
    }

    #[test]
    fn test_page_url_without_query() {
        let url = PageUrl::new("/api/v1/articles", None);
        assert_eq!(url.self_link(), "/api/v1/articles");
        assert_eq!(
            url.with_window(PageWindow::new(0, 5)),
            "/api/v1/articles?page%5Boffset%5D=0&page%5Blimit%5D=5"
        );
    }
}
