//! Finnhub market news adapter
//!
//! `GET {base}/news?category=...&token=...` returns the latest articles for a
//! category, newest first. The endpoint has no paging, so pages are cut
//! client-side.

use async_trait::async_trait;
use chrono::DateTime;
use feedterm_core::{keys, FeedItem, FetchError, FetchResult, ItemMetadata, Query, Source};
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::http::{build_client, get_json};
use crate::paging::slice_page;
use crate::provider::{FeedProvider, ProviderStatus};

pub const FINNHUB_API_BASE: &str = "https://finnhub.io/api/v1";

/// News categories accepted by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsCategory {
    General,
    Forex,
    Crypto,
    Merger,
}

impl NewsCategory {
    pub const ALL: [&'static str; 4] = ["general", "forex", "crypto", "merger"];

    pub fn parse(category: &str) -> Option<Self> {
        match category {
            "general" => Some(NewsCategory::General),
            "forex" => Some(NewsCategory::Forex),
            "crypto" => Some(NewsCategory::Crypto),
            "merger" => Some(NewsCategory::Merger),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NewsCategory::General => "general",
            NewsCategory::Forex => "forex",
            NewsCategory::Crypto => "crypto",
            NewsCategory::Merger => "merger",
        }
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubNewsItem {
    #[serde(default)]
    category: String,
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    headline: String,
    id: u64,
    #[serde(default)]
    image: String,
    #[serde(default)]
    related: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    url: String,
}

pub struct FinnhubProvider {
    client: Client,
    base_url: String,
    api_key: RwLock<Option<String>>,
}

impl FinnhubProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, FINNHUB_API_BASE)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: RwLock::new(api_key.filter(|k| !k.trim().is_empty())),
        }
    }

    fn token(&self) -> Option<String> {
        self.api_key.read().clone()
    }
}

#[async_trait]
impl FeedProvider for FinnhubProvider {
    fn source_id(&self) -> Source {
        Source::FinancialNews
    }

    fn supported_categories(&self) -> &[&'static str] {
        &NewsCategory::ALL
    }

    fn status(&self) -> ProviderStatus {
        if self.api_key.read().is_some() {
            ProviderStatus::Ready
        } else {
            ProviderStatus::NeedsConfig("FINNHUB_API_KEY is not set".to_string())
        }
    }

    fn set_credential(&self, token: String) -> bool {
        let token = token.trim().to_string();
        *self.api_key.write() = (!token.is_empty()).then_some(token);
        info!("Finnhub credential updated");
        true
    }

    #[instrument(skip(self), fields(category = %query.category(), page = query.page()))]
    async fn fetch(&self, query: &Query) -> FetchResult<Vec<FeedItem>> {
        let category = NewsCategory::parse(query.category()).ok_or_else(|| {
            FetchError::invalid_response(format!("unknown category {:?}", query.category()))
        })?;

        // No request goes out without a key
        let token = self
            .token()
            .ok_or_else(|| FetchError::unauthorized("Finnhub API key not configured"))?;

        let url = format!("{}/news", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("category", category.as_str()), ("token", token.as_str())]);
        let raw: Vec<FinnhubNewsItem> = get_json(request).await?;
        debug!("Received {} Finnhub articles", raw.len());

        let items: Vec<FeedItem> = raw.into_iter().filter_map(convert_item).collect();
        Ok(slice_page(items, query))
    }
}

fn convert_item(item: FinnhubNewsItem) -> Option<FeedItem> {
    let id = item.id.to_string();
    let mut feed_item = match FeedItem::new(id, Source::FinancialNews, item.headline) {
        Ok(feed_item) => feed_item,
        Err(e) => {
            debug!("Skipping Finnhub article: {}", e);
            return None;
        }
    };

    feed_item = feed_item.with_url(item.url).with_summary(item.summary);
    if !item.source.is_empty() {
        feed_item = feed_item.with_author(item.source);
    }
    let published_at = (item.datetime > 0)
        .then(|| DateTime::from_timestamp(item.datetime, 0))
        .flatten();
    if let Some(published_at) = published_at {
        feed_item = feed_item.with_published_at(published_at);
    }

    let non_empty = |s: String| (!s.is_empty()).then_some(s);
    let metadata = ItemMetadata::new()
        .with_opt(keys::CATEGORY, non_empty(item.category))
        .with_opt(keys::RELATED, non_empty(item.related))
        .with_opt(keys::IMAGE_URL, non_empty(item.image));

    Some(feed_item.with_metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::decode;

    const SAMPLE: &[u8] = br#"[
        {"category":"company","datetime":1569550360,"headline":"More sops needed to boost electronic manufacturing",
         "id":25286,"image":"https://img.example/1.jpg","related":"AAPL","source":"The Economic Times",
         "summary":"NEW DELHI | CHENNAI: India may have to offer electronic manufacturers additional sops",
         "url":"https://economictimes.example/articleshow/71321308.cms"},
        {"category":"company","datetime":1569528720,"headline":"   ","id":25287,"source":"Reuters"}
    ]"#;

    #[test]
    fn test_convert_articles() {
        let raw: Vec<FinnhubNewsItem> = decode(SAMPLE).unwrap();
        let items: Vec<FeedItem> = raw.into_iter().filter_map(convert_item).collect();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id(), "25286");
        assert_eq!(item.source(), &Source::FinancialNews);
        assert_eq!(item.author(), Some("The Economic Times"));
        assert_eq!(item.metadata().get_str(keys::RELATED), Some("AAPL"));
        assert_eq!(item.published_at().unwrap().timestamp(), 1569550360);
    }

    #[test]
    fn test_status_follows_credential() {
        let provider = FinnhubProvider::new(None);
        assert!(matches!(provider.status(), ProviderStatus::NeedsConfig(_)));

        assert!(provider.set_credential("abc123".to_string()));
        assert_eq!(provider.status(), ProviderStatus::Ready);

        provider.set_credential("  ".to_string());
        assert!(!provider.status().is_ready());
    }

    #[tokio::test]
    async fn test_missing_key_is_unauthorized_without_network() {
        // Unroutable base URL: the call must fail before any request is made
        let provider = FinnhubProvider::with_base_url(None, "http://127.0.0.1:9");
        let query = Query::new(Source::FinancialNews, "general");

        let err = provider.fetch(&query).await.unwrap_err();
        assert!(err.is_user_actionable());
    }
}
