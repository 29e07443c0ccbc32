//! Feed Orchestrator
//!
//! Turns queries into item pages: cache check, provider call under the
//! concurrency gate and request timeout, normalization, cache store.
//!
//! Concurrent requests for the same cache key share one provider call. The
//! first caller leads the fetch; later callers subscribe to its result. If the
//! leader is cancelled, a waiting caller takes over.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use feedterm_core::{CacheKey, FeedItem, FetchError, FetchResult, Query, Source};
use feedterm_providers::FeedProvider;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::AggregateFeed;
use crate::cache::FeedCache;
use crate::config::{FeedtermConfig, OrchestratorConfig};
use crate::error::AggregationError;
use crate::registry::ProviderRegistry;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

type FlightResult = FetchResult<Arc<[FeedItem]>>;

/// What a caller does for a key after checking the in-flight table
enum Flight<'a> {
    Hit(Arc<[FeedItem]>),
    Follow(broadcast::Receiver<FlightResult>),
    Lead(FlightGuard<'a>),
}

/// Owns an in-flight table entry; dropping it without completing wakes the
/// followers with a closed channel
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<CacheKey, broadcast::Sender<FlightResult>>>,
    key: CacheKey,
    completed: bool,
}

impl FlightGuard<'_> {
    fn complete(mut self, result: FlightResult) {
        self.completed = true;
        let sender = self.in_flight.lock().remove(&self.key);
        if let Some(sender) = sender {
            // No receivers is fine
            let _ = sender.send(result);
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            debug!("Abandoned in-flight fetch for {}", self.key);
            self.in_flight.lock().remove(&self.key);
        }
    }
}

pub struct FeedOrchestrator {
    registry: Arc<ProviderRegistry>,
    cache: Arc<FeedCache>,
    gate: Semaphore,
    max_concurrency: usize,
    request_timeout: Duration,
    cache_ttl: Duration,
    page_size: u32,
    in_flight: Mutex<HashMap<CacheKey, broadcast::Sender<FlightResult>>>,
}

impl FeedOrchestrator {
    /// Orchestrator with default limits
    pub fn new(registry: Arc<ProviderRegistry>, cache: Arc<FeedCache>) -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            registry,
            cache,
            gate: Semaphore::new(defaults.max_concurrency),
            max_concurrency: defaults.max_concurrency,
            request_timeout: defaults.request_timeout(),
            cache_ttl: DEFAULT_CACHE_TTL,
            page_size: defaults.page_size,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Build registry, cache and orchestrator from configuration
    pub fn from_config(config: &FeedtermConfig) -> Self {
        let registry = Arc::new(ProviderRegistry::from_config(&config.providers));
        let cache = Arc::new(config.cache.build());

        info!(
            "Feed orchestrator: {} providers, max {} concurrent requests, {}s timeout, cache {}",
            registry.len(),
            config.orchestrator.max_concurrency,
            config.orchestrator.request_timeout_secs,
            if config.cache.enabled { "on" } else { "off" }
        );

        Self::new(registry, cache)
            .with_max_concurrency(config.orchestrator.max_concurrency)
            .with_request_timeout(config.orchestrator.request_timeout())
            .with_cache_ttl(config.cache.ttl())
            .with_page_size(config.orchestrator.page_size)
    }

    /// Limit on provider calls in flight across all sources (at least 1)
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        self.gate = Semaphore::new(max_concurrency);
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Page size for queries built by the orchestrator itself
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<FeedCache> {
        &self.cache
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Free slots in the concurrency gate
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Page 1 of `source`'s default category
    pub fn default_query(&self, source: &Source) -> Result<Query, AggregationError> {
        let provider = self
            .registry
            .get(source)
            .map_err(|_| AggregationError::UnknownSource(source.clone()))?;

        let query = Query::new(source.clone(), provider.default_category());
        Ok(query.clone().with_page_size(self.page_size).unwrap_or(query))
    }

    /// One page of one source
    ///
    /// Pages come back newest first. A category's upstream ranking (top,
    /// downloads...) decides which items land in the page window, not their
    /// order inside it.
    #[instrument(skip(self), fields(key = %query.cache_key()))]
    pub async fn fetch_page(&self, query: &Query) -> Result<Arc<[FeedItem]>, AggregationError> {
        let provider = self.resolve(query)?;
        let key = query.cache_key();
        let tag = |e| AggregationError::fetch(query.source().clone(), e);

        if let Some(entry) = self.cache.get(&key) {
            debug!("Cache hit ({} items)", entry.items().len());
            return Ok(Arc::clone(entry.items()));
        }

        loop {
            match self.join_or_lead(&key) {
                Flight::Hit(items) => return Ok(items),
                Flight::Follow(mut rx) => match rx.recv().await {
                    Ok(result) => {
                        debug!("Joined in-flight fetch");
                        return result.map_err(tag);
                    }
                    // Leader went away before finishing; try again
                    Err(_) => continue,
                },
                Flight::Lead(guard) => {
                    let result = self.fetch_from_provider(provider.as_ref(), query).await;
                    if let Ok(items) = &result {
                        self.cache.put(key.clone(), Arc::clone(items), self.cache_ttl);
                    }
                    guard.complete(result.clone());
                    return result.map_err(tag);
                }
            }
        }
    }

    /// One page per source, fetched concurrently
    ///
    /// Never fails as a whole: each source's outcome is reported separately.
    /// Only the first query per source is used. Dropping the returned future
    /// cancels every outstanding fetch and frees their gate slots.
    #[instrument(skip_all, fields(sources = queries.len()))]
    pub async fn fetch_all(&self, queries: &[Query]) -> AggregateFeed {
        let mut seen = HashSet::new();
        let queries: Vec<&Query> = queries
            .iter()
            .filter(|q| {
                let first = seen.insert(q.source().clone());
                if !first {
                    warn!("Ignoring duplicate query for {}", q.source());
                }
                first
            })
            .collect();

        let outcomes = join_all(queries.into_iter().map(|query| async move {
            (query.source().clone(), self.fetch_page(query).await)
        }))
        .await;

        let feed = AggregateFeed::new(self.registry.active_sources(), outcomes);
        for error in feed.failures() {
            warn!("Source failed: {}", error);
        }
        feed
    }

    /// Page 1 of every ready source, in its default category
    pub async fn fetch_front_page(&self) -> AggregateFeed {
        let queries: Vec<Query> = self
            .registry
            .ready_sources()
            .iter()
            .filter_map(|source| self.default_query(source).ok())
            .collect();
        self.fetch_all(&queries).await
    }

    /// Bypass the cache for `query`
    ///
    /// Joins a fetch for the same key that is already in flight instead of
    /// starting a second one.
    #[instrument(skip(self), fields(key = %query.cache_key()))]
    pub async fn refresh(&self, query: &Query) -> Result<Arc<[FeedItem]>, AggregationError> {
        self.cache.invalidate(&query.cache_key());
        self.fetch_page(query).await
    }

    /// Drop every cached page of `source`; returns how many were dropped
    pub fn refresh_source(&self, source: &Source) -> usize {
        self.cache.invalidate_source(source)
    }

    fn resolve(&self, query: &Query) -> Result<Arc<dyn FeedProvider>, AggregationError> {
        let provider = self
            .registry
            .get(query.source())
            .map_err(|_| AggregationError::UnknownSource(query.source().clone()))?;

        if !provider.supports_category(query.category()) {
            return Err(AggregationError::UnsupportedCategory {
                source_id: query.source().clone(),
                category: query.category().to_string(),
            });
        }
        Ok(provider)
    }

    fn join_or_lead(&self, key: &CacheKey) -> Flight<'_> {
        let mut in_flight = self.in_flight.lock();

        // A leader may have stored the page between our cache miss and now
        if let Some(entry) = self.cache.lookup(key) {
            return Flight::Hit(Arc::clone(entry.items()));
        }

        if let Some(sender) = in_flight.get(key) {
            return Flight::Follow(sender.subscribe());
        }

        let (sender, _) = broadcast::channel(1);
        in_flight.insert(key.clone(), sender);
        Flight::Lead(FlightGuard {
            in_flight: &self.in_flight,
            key: key.clone(),
            completed: false,
        })
    }

    async fn fetch_from_provider(
        &self,
        provider: &dyn FeedProvider,
        query: &Query,
    ) -> FlightResult {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| FetchError::network("concurrency gate closed"))?;

        let items = match timeout(self.request_timeout, provider.fetch(query)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Request timed out after {:?}", self.request_timeout);
                return Err(FetchError::network(format!(
                    "request timed out after {}s",
                    self.request_timeout.as_secs_f64()
                )));
            }
        };

        Ok(normalize(query, items).into())
    }
}

/// Enforce the page contract on provider output
///
/// Drops items tagged with another source and repeated ids, caps the page at
/// `page_size`, then orders newest first.
fn normalize(query: &Query, items: Vec<FeedItem>) -> Vec<FeedItem> {
    let received = items.len();
    let mut seen = HashSet::with_capacity(received);

    let mut items: Vec<FeedItem> = items
        .into_iter()
        .filter(|item| item.source() == query.source())
        .filter(|item| seen.insert(item.id().to_string()))
        .take(query.page_size() as usize)
        .collect();

    if items.len() != received {
        debug!("Normalized {} items down to {}", received, items.len());
    }
    items.sort_by(FeedItem::display_order);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_normalize_filters_dedups_and_orders() {
        let query = Query::new(Source::DiscussionBoard, "top")
            .with_page_size(3)
            .unwrap();
        let at = |ts| Utc.timestamp_opt(ts, 0).unwrap();
        let hn = |id: &str| FeedItem::new(id, Source::DiscussionBoard, "t").unwrap();

        let items = vec![
            hn("a").with_published_at(at(10)),
            FeedItem::new("x", Source::FinancialNews, "t").unwrap(),
            hn("a").with_published_at(at(99)),
            hn("b").with_published_at(at(20)),
            hn("c"),
            hn("d"),
        ];

        let ids: Vec<String> = normalize(&query, items)
            .iter()
            .map(|i| i.id().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
