//! Unified feed item model
//!
//! Every provider normalizes its upstream payload into [`FeedItem`]s. Items are
//! immutable once built: all fields are private and only exposed through
//! accessors, so the aggregator can share and reorder them freely without
//! ever changing their content.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ItemError;
use crate::Source;

/// Well-known metadata keys
pub mod keys {
    pub const SCORE: &str = "score";
    pub const COMMENTS: &str = "comments";
    pub const CATEGORY: &str = "category";
    pub const DOWNLOADS: &str = "downloads";
    pub const VERSION: &str = "version";
    pub const RELATED: &str = "related";
    pub const IMAGE_URL: &str = "image_url";
    pub const KIND: &str = "kind";
}

/// Sparse bag of source-specific fields (point count, comment count, category...)
///
/// Never required by the aggregator; used by the presentation layer for badges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ItemMetadata(BTreeMap<String, serde_json::Value>);

impl ItemMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning `self` for chaining
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Insert a value only when present
    pub fn with_opt<V: Into<serde_json::Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Point count / upvotes
    pub fn score(&self) -> Option<i64> {
        self.get_i64(keys::SCORE)
    }

    /// Number of comments
    pub fn comments(&self) -> Option<i64> {
        self.get_i64(keys::COMMENTS)
    }

    pub fn category(&self) -> Option<&str> {
        self.get_str(keys::CATEGORY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn approx_size(&self) -> usize {
        self.0
            .iter()
            .map(|(k, v)| k.len() + v.to_string().len())
            .sum()
    }
}

/// Normalized unit of content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    id: String,
    source: Source,
    title: String,
    url: Option<String>,
    summary: Option<String>,
    author: Option<String>,
    published_at: Option<DateTime<Utc>>,
    metadata: ItemMetadata,
}

impl FeedItem {
    /// Create a new item with the required fields
    ///
    /// Fails when the id or the title is empty after trimming.
    pub fn new(
        id: impl Into<String>,
        source: Source,
        title: impl Into<String>,
    ) -> Result<Self, ItemError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ItemError::EmptyId);
        }

        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ItemError::EmptyTitle(id));
        }

        Ok(Self {
            id,
            source,
            title,
            url: None,
            summary: None,
            author: None,
            published_at: None,
            metadata: ItemMetadata::default(),
        })
    }

    /// Builder method: set URL (empty strings are ignored)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = (!url.trim().is_empty()).then_some(url);
        self
    }

    /// Builder method: set summary (empty strings are ignored)
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        self.summary = (!summary.trim().is_empty()).then_some(summary);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_metadata(mut self, metadata: ItemMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn metadata(&self) -> &ItemMetadata {
        &self.metadata
    }

    /// Host of the item's link, without a leading `www.`
    pub fn domain(&self) -> Option<String> {
        let url = url::Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }

    /// Get a display-friendly age string (e.g., "2h ago")
    pub fn time_ago(&self) -> Option<String> {
        let published_at = self.published_at?;
        let duration = Utc::now().signed_duration_since(published_at);

        let label = if duration.num_seconds() < 60 {
            "just now".to_string()
        } else if duration.num_minutes() < 60 {
            format!("{}m ago", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h ago", duration.num_hours())
        } else if duration.num_days() < 7 {
            format!("{}d ago", duration.num_days())
        } else {
            published_at.format("%Y-%m-%d").to_string()
        };

        Some(label)
    }

    /// Rough in-memory footprint, used for the cache byte budget
    pub fn approx_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.id.len()
            + self.source.as_str().len()
            + self.title.len()
            + self.url.as_ref().map_or(0, String::len)
            + self.summary.as_ref().map_or(0, String::len)
            + self.author.as_ref().map_or(0, String::len)
            + self.metadata.approx_size()
    }

    /// Default display order: newest first, ties broken by ascending id.
    ///
    /// Items without a timestamp sort after every timestamped item and compare
    /// equal to each other, so a stable sort keeps their upstream order.
    pub fn display_order(a: &FeedItem, b: &FeedItem) -> Ordering {
        match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, ts: Option<i64>) -> FeedItem {
        let item = FeedItem::new(id, Source::DiscussionBoard, format!("Story {}", id)).unwrap();
        match ts {
            Some(ts) => item.with_published_at(Utc.timestamp_opt(ts, 0).unwrap()),
            None => item,
        }
    }

    #[test]
    fn test_feed_item_builder() {
        let item = FeedItem::new("123", Source::FinancialNews, "  Test Title ")
            .unwrap()
            .with_summary("Test summary")
            .with_url("https://www.example.com/a")
            .with_metadata(ItemMetadata::new().with(keys::SCORE, 42));

        assert_eq!(item.title(), "Test Title");
        assert_eq!(item.summary(), Some("Test summary"));
        assert_eq!(item.domain().as_deref(), Some("example.com"));
        assert_eq!(item.metadata().score(), Some(42));
        assert_eq!(item.metadata().comments(), None);
    }

    #[test]
    fn test_rejects_empty_title_and_id() {
        assert_eq!(
            FeedItem::new("7", Source::DiscussionBoard, "   "),
            Err(ItemError::EmptyTitle("7".to_string()))
        );
        assert_eq!(
            FeedItem::new("", Source::DiscussionBoard, "title"),
            Err(ItemError::EmptyId)
        );
    }

    #[test]
    fn test_empty_url_is_dropped() {
        let item = FeedItem::new("1", Source::DiscussionBoard, "Ask HN: anything")
            .unwrap()
            .with_url("");
        assert_eq!(item.url(), None);
        assert_eq!(item.domain(), None);
    }

    #[test]
    fn test_display_order_newest_first_then_id() {
        let mut items = vec![
            item("b", Some(100)),
            item("c", Some(200)),
            item("a", Some(100)),
        ];
        items.sort_by(FeedItem::display_order);

        let ids: Vec<&str> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_untimestamped_items_keep_upstream_order() {
        let mut items = vec![
            item("z", None),
            item("old", Some(10)),
            item("y", None),
            item("new", Some(20)),
        ];
        items.sort_by(FeedItem::display_order);

        let ids: Vec<&str> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["new", "old", "z", "y"]);
    }

    #[test]
    fn test_approx_size_grows_with_content() {
        let small = item("1", None);
        let large = item("1", None).with_summary("x".repeat(1024));
        assert!(large.approx_size() >= small.approx_size() + 1024);
    }
}
