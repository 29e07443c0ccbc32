//! Hacker News adapter
//!
//! Uses the public Firebase API: one request for the story id list of a
//! category, then one request per item on the requested page.

use async_trait::async_trait;
use chrono::DateTime;
use feedterm_core::{keys, FeedItem, FetchError, FetchResult, ItemMetadata, Query, Source};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::html::strip_html;
use crate::http::{build_client, get_json};
use crate::paging::slice_page;
use crate::provider::FeedProvider;

pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const HN_ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

/// Item requests in flight per page fetch
const ITEM_FETCH_CONCURRENCY: usize = 10;

/// Story lists exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HnCategory {
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl HnCategory {
    pub const ALL: [&'static str; 6] = ["top", "new", "best", "ask", "show", "job"];

    pub fn parse(category: &str) -> Option<Self> {
        match category {
            "top" => Some(HnCategory::Top),
            "new" => Some(HnCategory::New),
            "best" => Some(HnCategory::Best),
            "ask" => Some(HnCategory::Ask),
            "show" => Some(HnCategory::Show),
            "job" => Some(HnCategory::Job),
            _ => None,
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            HnCategory::Top => "topstories",
            HnCategory::New => "newstories",
            HnCategory::Best => "beststories",
            HnCategory::Ask => "askstories",
            HnCategory::Show => "showstories",
            HnCategory::Job => "jobstories",
        }
    }
}

/// Raw item as returned by `/item/{id}.json`
#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(rename = "type")]
    kind: Option<String>,
    by: Option<String>,
    time: Option<i64>,
    text: Option<String>,
    url: Option<String>,
    title: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
    #[serde(default)]
    dead: bool,
    #[serde(default)]
    deleted: bool,
}

pub struct HackerNewsProvider {
    client: Client,
    base_url: String,
}

impl HackerNewsProvider {
    pub fn new() -> Self {
        Self::with_base_url(HN_API_BASE)
    }

    /// Point the adapter at another API root (mirrors, test servers)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_story_ids(&self, category: HnCategory) -> FetchResult<Vec<u64>> {
        let url = format!("{}/{}.json", self.base_url, category.endpoint());
        get_json(self.client.get(&url)).await
    }

    /// Fetch one item; the API answers `null` for ids it no longer knows
    async fn fetch_item(&self, id: u64) -> FetchResult<Option<HnItem>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        get_json(self.client.get(&url)).await
    }
}

impl Default for HackerNewsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedProvider for HackerNewsProvider {
    fn source_id(&self) -> Source {
        Source::DiscussionBoard
    }

    fn supported_categories(&self) -> &[&'static str] {
        &HnCategory::ALL
    }

    #[instrument(skip(self), fields(category = %query.category(), page = query.page()))]
    async fn fetch(&self, query: &Query) -> FetchResult<Vec<FeedItem>> {
        let category = HnCategory::parse(query.category()).ok_or_else(|| {
            FetchError::invalid_response(format!("unknown category {:?}", query.category()))
        })?;

        let ids = slice_page(self.fetch_story_ids(category).await?, query);
        debug!("Fetching {} Hacker News items", ids.len());

        // `buffered` keeps list order; one failed item fails the page
        let raw: Vec<Option<HnItem>> = stream::iter(ids)
            .map(|id| self.fetch_item(id))
            .buffered(ITEM_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        let items: Vec<FeedItem> = raw.into_iter().flatten().filter_map(convert_item).collect();
        debug!("Normalized {} Hacker News items", items.len());
        Ok(items)
    }
}

fn convert_item(item: HnItem) -> Option<FeedItem> {
    if item.dead || item.deleted {
        return None;
    }

    let id = item.id.to_string();
    let title = item.title.unwrap_or_default();
    let mut feed_item = match FeedItem::new(id.clone(), Source::DiscussionBoard, title) {
        Ok(feed_item) => feed_item,
        Err(e) => {
            debug!("Skipping Hacker News item: {}", e);
            return None;
        }
    };

    // Ask/Show posts have no external link; point at the discussion instead
    let link = item
        .url
        .unwrap_or_else(|| format!("{}{}", HN_ITEM_URL, id));
    feed_item = feed_item.with_url(link);

    if let Some(text) = item.text.as_deref() {
        feed_item = feed_item.with_summary(strip_html(text));
    }
    if let Some(by) = item.by {
        feed_item = feed_item.with_author(by);
    }
    if let Some(published_at) = item.time.and_then(|t| DateTime::from_timestamp(t, 0)) {
        feed_item = feed_item.with_published_at(published_at);
    }

    let metadata = ItemMetadata::new()
        .with_opt(keys::SCORE, item.score)
        .with_opt(keys::COMMENTS, item.descendants)
        .with_opt(keys::KIND, item.kind);

    Some(feed_item.with_metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::decode;

    #[test]
    fn test_convert_story() {
        let raw: Option<HnItem> = decode(
            br#"{"by":"dhouston","descendants":71,"id":8863,"score":111,"time":1175714200,
                "title":"My YC app: Dropbox","type":"story","url":"http://www.getdropbox.com/u/2/screencast.html"}"#,
        )
        .unwrap();

        let item = convert_item(raw.unwrap()).unwrap();
        assert_eq!(item.id(), "8863");
        assert_eq!(item.source(), &Source::DiscussionBoard);
        assert_eq!(item.author(), Some("dhouston"));
        assert_eq!(item.domain().as_deref(), Some("getdropbox.com"));
        assert_eq!(item.metadata().score(), Some(111));
        assert_eq!(item.metadata().comments(), Some(71));
        assert_eq!(item.published_at().unwrap().timestamp(), 1175714200);
    }

    #[test]
    fn test_ask_post_links_to_discussion() {
        let raw: Option<HnItem> = decode(
            br#"{"id":121003,"title":"Ask HN: The Arc Effect","text":"<i>or</i> HN: the next iteration","type":"story","time":1203647620}"#,
        )
        .unwrap();

        let item = convert_item(raw.unwrap()).unwrap();
        assert_eq!(item.url(), Some("https://news.ycombinator.com/item?id=121003"));
        assert_eq!(item.summary(), Some("or HN: the next iteration"));
    }

    #[test]
    fn test_skips_dead_deleted_and_untitled() {
        let dead: HnItem = decode(br#"{"id":1,"title":"x","dead":true}"#).unwrap();
        let deleted: HnItem = decode(br#"{"id":2,"deleted":true}"#).unwrap();
        let untitled: HnItem = decode(br#"{"id":3,"type":"comment","text":"hi"}"#).unwrap();
        assert!(convert_item(dead).is_none());
        assert!(convert_item(deleted).is_none());
        assert!(convert_item(untitled).is_none());

        let missing: Option<HnItem> = decode(b"null").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_categories() {
        let provider = HackerNewsProvider::new();
        assert_eq!(provider.default_category(), "top");
        assert!(provider.supports_category("show"));
        assert!(!provider.supports_category("general"));
        assert_eq!(HnCategory::parse("job").map(HnCategory::endpoint), Some("jobstories"));
    }
}
