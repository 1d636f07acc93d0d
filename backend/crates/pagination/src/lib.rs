//! Page request and pagination envelope primitives.
//!
//! Pages are 1-based. A request without a page size is unbounded: the first
//! page holds every item and any later page is empty. Requests past the end
//! of the data are not errors; they resolve to an empty window.
//!
//! # Examples
//!
//! ```
//! use pagination::{PageRequest, Paginated};
//!
//! let request = PageRequest::new(2, Some(10)).expect("valid request");
//! let items: Vec<u32> = (1..=25).collect();
//! let page = Paginated::new(request.apply(items), request, 25);
//! assert_eq!(page.items.first(), Some(&11));
//! assert_eq!(page.total_pages, 3);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors raised when constructing a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Page numbers are 1-based.
    #[error("page numbers start at 1")]
    ZeroPage,
    /// A page size, when present, must be positive.
    #[error("page size must be positive when provided")]
    ZeroPageSize,
}

/// Row window selected by a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Every row; produced by the first unbounded page.
    All,
    /// A bounded slice of rows.
    Slice {
        /// Number of rows to skip.
        offset: u64,
        /// Maximum number of rows to return.
        limit: u64,
    },
    /// No rows; produced by unbounded pages after the first.
    Empty,
}

/// Validated 1-based page request.
///
/// ## Invariants
/// - `page >= 1`.
/// - `page_size`, when present, is `>= 1`; `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PageRequestDto", into = "PageRequestDto")]
pub struct PageRequest {
    page: u32,
    page_size: Option<u32>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl PageRequest {
    /// Build a validated page request.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::ZeroPage`] when `page` is zero and
    /// [`PaginationError::ZeroPageSize`] when `page_size` is `Some(0)`.
    pub const fn new(page: u32, page_size: Option<u32>) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if let Some(0) = page_size {
            return Err(PaginationError::ZeroPageSize);
        }
        Ok(Self { page, page_size })
    }

    /// First page without a size limit.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            page: 1,
            page_size: None,
        }
    }

    /// Requested 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Requested page size; `None` means unbounded.
    #[must_use]
    pub const fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Resolve the request into a row window.
    #[must_use]
    pub const fn window(&self) -> Window {
        match self.page_size {
            None if self.page == 1 => Window::All,
            None => Window::Empty,
            Some(size) => {
                let size = size as u64;
                Window::Slice {
                    offset: (self.page as u64 - 1) * size,
                    limit: size,
                }
            }
        }
    }

    /// Apply the window to an already ordered sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        match self.window() {
            Window::All => items.into_iter().collect(),
            Window::Empty => Vec::new(),
            Window::Slice { offset, limit } => {
                let skip = usize::try_from(offset).unwrap_or(usize::MAX);
                let take = usize::try_from(limit).unwrap_or(usize::MAX);
                items.into_iter().skip(skip).take(take).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRequestDto {
    page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
}

impl From<PageRequest> for PageRequestDto {
    fn from(value: PageRequest) -> Self {
        Self {
            page: value.page,
            page_size: value.page_size,
        }
    }
}

impl TryFrom<PageRequestDto> for PageRequest {
    type Error = PaginationError;

    fn try_from(value: PageRequestDto) -> Result<Self, Self::Error> {
        Self::new(value.page, value.page_size)
    }
}

/// One page of items together with the totals needed to navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on the requested page, in query order.
    pub items: Vec<T>,
    /// Requested 1-based page number.
    pub page: u32,
    /// Requested page size; absent when unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Number of items matching the query across all pages.
    pub total_items: u64,
    /// Number of pages available for the page size.
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    /// Wrap a page of items with totals derived from `total_items`.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = match request.page_size() {
            _ if total_items == 0 => 0,
            None => 1,
            Some(size) => total_items.div_ceil(u64::from(size)),
        };
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total_items,
            total_pages,
        }
    }

    /// Convert every item while keeping the page metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }

    /// Whether another page follows this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for page windows and envelope totals.
    use super::*;
    use rstest::rstest;

    fn request(page: u32, page_size: Option<u32>) -> PageRequest {
        match PageRequest::new(page, page_size) {
            Ok(request) => request,
            Err(err) => panic!("test request must be valid: {err}"),
        }
    }

    #[rstest]
    #[case(0, Some(10), PaginationError::ZeroPage)]
    #[case(0, None, PaginationError::ZeroPage)]
    #[case(1, Some(0), PaginationError::ZeroPageSize)]
    fn rejects_invalid_requests(
        #[case] page: u32,
        #[case] page_size: Option<u32>,
        #[case] expected: PaginationError,
    ) {
        assert_eq!(PageRequest::new(page, page_size), Err(expected));
    }

    #[rstest]
    #[case(1, (1..=10).collect())]
    #[case(2, (11..=20).collect())]
    #[case(3, (21..=25).collect())]
    #[case(4, Vec::new())]
    fn bounded_pages_window_the_items(#[case] page: u32, #[case] expected: Vec<u32>) {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(request(page, Some(10)).apply(items), expected);
    }

    #[rstest]
    fn unbounded_first_page_returns_everything() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(PageRequest::unbounded().apply(items.clone()), items);
        assert_eq!(request(2, None).apply(items), Vec::<u32>::new());
    }

    #[rstest]
    #[case(Some(10), 25, 3)]
    #[case(Some(5), 25, 5)]
    #[case(None, 25, 1)]
    #[case(Some(10), 0, 0)]
    fn envelope_computes_total_pages(
        #[case] page_size: Option<u32>,
        #[case] total: u64,
        #[case] expected_pages: u64,
    ) {
        let page = Paginated::<u32>::new(Vec::new(), request(1, page_size), total);
        assert_eq!(page.total_pages, expected_pages);
    }

    #[rstest]
    fn map_preserves_metadata() {
        let page = Paginated::new(vec![1_u32, 2], request(2, Some(2)), 5).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
    }

    #[rstest]
    fn request_deserialisation_validates() {
        let parsed: Result<PageRequest, _> = serde_json::from_str(r#"{"page":0,"pageSize":5}"#);
        assert!(parsed.is_err());

        let parsed: PageRequest = match serde_json::from_str(r#"{"page":2}"#) {
            Ok(value) => value,
            Err(err) => panic!("valid request must parse: {err}"),
        };
        assert_eq!(parsed, request(2, None));
    }
}
