//! Infinite-scroll cursor for a single (source, category) panel

use std::collections::HashSet;

use feedterm_core::{FeedItem, Query};
use tracing::debug;

use crate::error::AggregationError;
use crate::orchestrator::FeedOrchestrator;

/// Caller-side "load more" state
///
/// Accumulates pages fetched through [`FeedOrchestrator::fetch_page`],
/// skipping ids already shown (upstream lists shift while the user scrolls).
#[derive(Debug, Clone)]
pub struct FeedCursor {
    next: Query,
    items: Vec<FeedItem>,
    seen: HashSet<String>,
    exhausted: bool,
}

impl FeedCursor {
    /// Cursor starting at page 1 of `query`'s source and category
    pub fn new(query: Query) -> Self {
        Self {
            next: query.first_page(),
            items: Vec::new(),
            seen: HashSet::new(),
            exhausted: false,
        }
    }

    /// Fetch the next page and append its unseen items
    ///
    /// Returns how many items were appended. Only an empty page marks the
    /// cursor exhausted: adapters drop dead or invalid entries, so a short
    /// page says nothing about what is left upstream. On error the cursor is
    /// unchanged and the same page is retried on the next call.
    pub async fn load_more(
        &mut self,
        orchestrator: &FeedOrchestrator,
    ) -> Result<usize, AggregationError> {
        if self.exhausted {
            return Ok(0);
        }

        let page = orchestrator.fetch_page(&self.next).await?;
        let before = self.items.len();
        for item in page.iter() {
            if self.seen.insert(item.id().to_string()) {
                self.items.push(item.clone());
            }
        }
        let appended = self.items.len() - before;

        if page.is_empty() {
            self.exhausted = true;
            debug!("{} exhausted after page {}", self.next.source(), self.next.page());
        } else {
            self.next = self.next.next_page();
        }

        Ok(appended)
    }

    /// Start over from page 1
    pub fn reset(&mut self) {
        self.next = self.next.first_page();
        self.items.clear();
        self.seen.clear();
        self.exhausted = false;
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    /// Query the next `load_more` will issue
    pub fn next_query(&self) -> &Query {
        &self.next
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
