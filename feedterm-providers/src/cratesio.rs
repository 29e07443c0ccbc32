//! crates.io adapter
//!
//! Categories map to the sort orders of `GET /api/v1/crates`; paging is done
//! upstream. crates.io rejects requests without a User-Agent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedterm_core::{keys, FeedItem, FetchError, FetchResult, ItemMetadata, Query, Source};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::http::{build_client, get_json};
use crate::provider::FeedProvider;

pub const CRATES_IO_API: &str = "https://crates.io/api/v1";
const CRATE_PAGE_URL: &str = "https://crates.io/crates/";

/// Listing views, each backed by a sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CratesCategory {
    New,
    Updated,
    Downloads,
    Recent,
}

impl CratesCategory {
    pub const ALL: [&'static str; 4] = ["new", "updated", "downloads", "recent"];

    pub fn parse(category: &str) -> Option<Self> {
        match category {
            "new" => Some(CratesCategory::New),
            "updated" => Some(CratesCategory::Updated),
            "downloads" => Some(CratesCategory::Downloads),
            "recent" => Some(CratesCategory::Recent),
            _ => None,
        }
    }

    fn sort_param(self) -> &'static str {
        match self {
            CratesCategory::New => "new",
            CratesCategory::Updated => "recent-updates",
            CratesCategory::Downloads => "downloads",
            CratesCategory::Recent => "recent-downloads",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CratesResponse {
    crates: Vec<CrateItem>,
}

#[derive(Debug, Deserialize)]
struct CrateItem {
    name: String,
    description: Option<String>,
    #[serde(default)]
    downloads: u64,
    recent_downloads: Option<u64>,
    newest_version: Option<String>,
    max_version: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    homepage: Option<String>,
    repository: Option<String>,
}

pub struct CratesIoProvider {
    client: Client,
    base_url: String,
}

impl CratesIoProvider {
    pub fn new() -> Self {
        Self::with_base_url(CRATES_IO_API)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for CratesIoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedProvider for CratesIoProvider {
    fn source_id(&self) -> Source {
        Source::PackageRegistry
    }

    fn supported_categories(&self) -> &[&'static str] {
        &CratesCategory::ALL
    }

    #[instrument(skip(self), fields(category = %query.category(), page = query.page()))]
    async fn fetch(&self, query: &Query) -> FetchResult<Vec<FeedItem>> {
        let category = CratesCategory::parse(query.category()).ok_or_else(|| {
            FetchError::invalid_response(format!("unknown category {:?}", query.category()))
        })?;

        let url = format!("{}/crates", self.base_url);
        let request = self.client.get(&url).query(&[
            ("sort", category.sort_param().to_string()),
            ("page", query.page().to_string()),
            ("per_page", query.page_size().to_string()),
        ]);
        let response: CratesResponse = get_json(request).await?;
        debug!("Received {} crates", response.crates.len());

        Ok(response
            .crates
            .into_iter()
            .filter_map(|c| convert_crate(category, c))
            .take(query.page_size() as usize)
            .collect())
    }
}

fn convert_crate(category: CratesCategory, krate: CrateItem) -> Option<FeedItem> {
    let version = krate.newest_version.or(krate.max_version);
    let title = match &version {
        Some(v) => format!("{} v{}", krate.name, v),
        None => krate.name.clone(),
    };

    let mut item = match FeedItem::new(krate.name.clone(), Source::PackageRegistry, title) {
        Ok(item) => item,
        Err(e) => {
            debug!("Skipping crate: {}", e);
            return None;
        }
    };

    item = item.with_url(format!("{}{}", CRATE_PAGE_URL, krate.name));
    if let Some(description) = krate.description {
        item = item.with_summary(description.trim().to_string());
    }

    // "new" lists by creation date, everything else by last publish
    let published_at = match category {
        CratesCategory::New => krate.created_at.or(krate.updated_at),
        _ => krate.updated_at.or(krate.created_at),
    };
    if let Some(published_at) = published_at {
        item = item.with_published_at(published_at);
    }

    let metadata = ItemMetadata::new()
        .with(keys::DOWNLOADS, krate.downloads)
        .with_opt("recent_downloads", krate.recent_downloads)
        .with_opt(keys::VERSION, version)
        .with_opt("homepage", krate.homepage)
        .with_opt("repository", krate.repository);

    Some(item.with_metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::decode;

    const SAMPLE: &[u8] = br#"{"crates":[
        {"id":"serde","name":"serde","description":" A generic serialization framework ",
         "downloads":500000000,"recent_downloads":60000000,"max_version":"1.0.216",
         "newest_version":"1.0.216","updated_at":"2024-12-11T19:31:27.946926+00:00",
         "created_at":"2014-12-05T20:20:39.487502+00:00","homepage":"https://serde.rs",
         "repository":"https://github.com/serde-rs/serde","documentation":null},
        {"id":"fresh","name":"fresh","description":null,"downloads":3,"recent_downloads":null,
         "max_version":"0.1.0","newest_version":"0.1.0","updated_at":"2024-12-12T00:00:00+00:00",
         "created_at":"2024-12-12T00:00:00+00:00","homepage":null,"repository":null}
    ],"meta":{"total":2}}"#;

    #[test]
    fn test_convert_crates() {
        let response: CratesResponse = decode(SAMPLE).unwrap();
        let items: Vec<FeedItem> = response
            .crates
            .into_iter()
            .filter_map(|c| convert_crate(CratesCategory::Updated, c))
            .collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id(), "serde");
        assert_eq!(items[0].title(), "serde v1.0.216");
        assert_eq!(items[0].summary(), Some("A generic serialization framework"));
        assert_eq!(items[0].url(), Some("https://crates.io/crates/serde"));
        assert_eq!(items[0].metadata().get_i64(keys::DOWNLOADS), Some(500000000));
        assert_eq!(items[1].summary(), None);
    }

    #[test]
    fn test_new_category_uses_creation_date() {
        let response: CratesResponse = decode(SAMPLE).unwrap();
        let serde = response.crates.into_iter().next().unwrap();
        let item = convert_crate(CratesCategory::New, serde).unwrap();
        let published_at = item.published_at().unwrap();
        assert_eq!(published_at.to_rfc3339(), "2014-12-05T20:20:39.487502+00:00");
    }

    #[test]
    fn test_sort_mapping() {
        let sort = |c: &str| CratesCategory::parse(c).map(CratesCategory::sort_param);
        assert_eq!(sort("updated"), Some("recent-updates"));
        assert_eq!(sort("recent"), Some("recent-downloads"));
        assert!(CratesCategory::parse("trending").is_none());
    }
}
