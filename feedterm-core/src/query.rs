//! Request descriptors and the cache keys derived from them

use std::fmt;

use serde::Serialize;

use crate::error::QueryError;
use crate::Source;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Largest page any provider is asked for
pub const MAX_PAGE_SIZE: u32 = 100;

/// A request for one page of one source
///
/// Pages are 1-based. Two queries with the same fields always map to the same
/// [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Query {
    source: Source,
    category: String,
    page: u32,
    page_size: u32,
}

impl Query {
    /// First page of `category` with the default page size
    pub fn new(source: Source, category: impl AsRef<str>) -> Self {
        Self {
            source,
            category: normalize_category(category.as_ref()),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page(mut self, page: u32) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::ZeroPage);
        }
        self.page = page;
        Ok(self)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, QueryError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(QueryError::PageSize {
                got: page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Same source and category, one page further
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Same source and category, back on page 1
    pub fn first_page(&self) -> Self {
        Self {
            page: 1,
            ..self.clone()
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Zero-based index of the first item on this page
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            source: self.source.clone(),
            category: self.category.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Cache key derived deterministically from a [`Query`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    source: Source,
    category: String,
    page: u32,
    page_size: u32,
}

impl CacheKey {
    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

impl From<&Query> for CacheKey {
    fn from(query: &Query) -> Self {
        query.cache_key()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:p{}:n{}",
            self.source, self.category, self.page, self.page_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = Query::new(Source::DiscussionBoard, "top");
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_pages() {
        let query = Query::new(Source::DiscussionBoard, "top");
        assert_eq!(query.clone().with_page(0), Err(QueryError::ZeroPage));
        assert!(query.clone().with_page_size(0).is_err());
        assert!(query.clone().with_page_size(MAX_PAGE_SIZE + 1).is_err());
        assert!(query.with_page_size(MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_offset_and_next_page() {
        let query = Query::new(Source::PackageRegistry, "new")
            .with_page_size(10)
            .unwrap()
            .with_page(3)
            .unwrap();
        assert_eq!(query.offset(), 20);
        assert_eq!(query.next_page().page(), 4);
        assert_eq!(query.first_page().page(), 1);
    }

    #[test]
    fn test_equivalent_queries_share_a_cache_key() {
        let a = Query::new(Source::FinancialNews, " General ");
        let b = Query::new(Source::FinancialNews, "general");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key().to_string(), "financial_news:general:p1:n30");

        let c = b.with_page(2).unwrap();
        assert_ne!(a.cache_key(), c.cache_key());
    }
}
