//! Provider capability contract

use async_trait::async_trait;
use feedterm_core::{FeedItem, FetchResult, Query, Source};
use serde::Serialize;

/// Whether a provider can currently serve requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ProviderStatus {
    Ready,
    /// Missing configuration, e.g. an API key
    NeedsConfig(String),
    Disabled,
}

impl ProviderStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProviderStatus::Ready)
    }
}

/// A source of feed items
///
/// Implementations translate a [`Query`] into one upstream request sequence
/// and normalize the payload into [`FeedItem`]s tagged with their own
/// [`Source`]. They never panic on malformed payloads and hold no feed data
/// between calls; caching is the aggregator's job.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Source tag attached to every item this provider returns
    fn source_id(&self) -> Source;

    /// Human-readable name
    fn display_name(&self) -> String {
        self.source_id().display_name().to_string()
    }

    /// Categories this provider understands, default first
    fn supported_categories(&self) -> &[&'static str];

    fn default_category(&self) -> &str {
        self.supported_categories().first().copied().unwrap_or("")
    }

    fn supports_category(&self, category: &str) -> bool {
        self.supported_categories()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus::Ready
    }

    /// Replace the provider's credential at runtime
    ///
    /// Returns `false` when the provider takes no credential.
    fn set_credential(&self, _token: String) -> bool {
        false
    }

    /// Fetch one page of items
    ///
    /// Returns at most `query.page_size()` items in upstream order. A short
    /// page may just mean entries were skipped; only an empty one means the
    /// upstream ran out.
    async fn fetch(&self, query: &Query) -> FetchResult<Vec<FeedItem>>;
}
