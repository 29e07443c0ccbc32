//! Fake providers shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use feedterm_core::{FeedItem, FetchError, FetchResult, Query, Source};
use feedterm_providers::{slice_page, FeedProvider, ProviderStatus};
use feedterm_services::{CacheBudget, FeedCache, FeedOrchestrator, ProviderRegistry};

pub const CATEGORIES: &[&str] = &["top", "new"];

/// Tracks how many provider calls are running at once, across providers
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard(Arc::clone(self))
    }
}

struct ProbeGuard(Arc<ConcurrencyProbe>);

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Configurable in-memory provider
///
/// Serves client-side pages of a fixed dataset, counts calls, and can add
/// latency, report into a [`ConcurrencyProbe`] or always fail.
pub struct FakeProvider {
    source: Source,
    items: Vec<FeedItem>,
    latency: Duration,
    failure: Option<FetchError>,
    status: ProviderStatus,
    probe: Option<Arc<ConcurrencyProbe>>,
    skipped: Vec<String>,
    calls: AtomicUsize,
}

impl FakeProvider {
    /// `count` items with ids "0".."count", newest first
    pub fn dataset(source: Source, count: usize) -> Self {
        let items = (0..count).map(|i| item(&source, &i.to_string(), Some(i))).collect();
        Self::with_items(source, items)
    }

    pub fn with_items(source: Source, items: Vec<FeedItem>) -> Self {
        Self {
            source,
            items,
            latency: Duration::ZERO,
            failure: None,
            status: ProviderStatus::Ready,
            probe: None,
            skipped: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(source: Source, error: FetchError) -> Self {
        Self {
            failure: Some(error),
            ..Self::with_items(source, Vec::new())
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_probe(mut self, probe: &Arc<ConcurrencyProbe>) -> Self {
        self.probe = Some(Arc::clone(probe));
        self
    }

    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.status = status;
        self
    }

    /// Drop these ids from each served page, after slicing
    pub fn skipping(mut self, ids: &[&str]) -> Self {
        self.skipped = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedProvider for FakeProvider {
    fn source_id(&self) -> Source {
        self.source.clone()
    }

    fn supported_categories(&self) -> &[&'static str] {
        CATEGORIES
    }

    fn status(&self) -> ProviderStatus {
        self.status.clone()
    }

    async fn fetch(&self, query: &Query) -> FetchResult<Vec<FeedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.probe.as_ref().map(|p| p.enter());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut page = slice_page(self.items.clone(), query);
        page.retain(|item| !self.skipped.iter().any(|id| id == item.id()));
        Ok(page)
    }
}

/// Item whose timestamp decreases with `age`; `None` leaves it untimestamped
pub fn item(source: &Source, id: &str, age: Option<usize>) -> FeedItem {
    let item = FeedItem::new(id, source.clone(), format!("{} item {}", source, id)).unwrap();
    match age {
        Some(age) => {
            let ts = 1_700_000_000 - (age as i64) * 60;
            item.with_published_at(Utc.timestamp_opt(ts, 0).unwrap())
        }
        None => item,
    }
}

pub fn custom(name: &str) -> Source {
    Source::Custom(name.to_string())
}

pub fn query(source: &Source, page: u32, page_size: u32) -> Query {
    Query::new(source.clone(), "top")
        .with_page_size(page_size)
        .unwrap()
        .with_page(page)
        .unwrap()
}

/// Registry over `providers`, in the given order
pub fn registry(providers: &[Arc<FakeProvider>]) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register_arc(Arc::clone(provider) as Arc<dyn FeedProvider>);
    }
    Arc::new(registry)
}

/// Orchestrator with an unbounded cache
pub fn orchestrator(providers: &[Arc<FakeProvider>]) -> FeedOrchestrator {
    orchestrator_with_cache(providers, FeedCache::new(CacheBudget::default()))
}

pub fn orchestrator_with_cache(
    providers: &[Arc<FakeProvider>],
    cache: FeedCache,
) -> FeedOrchestrator {
    FeedOrchestrator::new(registry(providers), Arc::new(cache))
}

pub fn ids(items: &[FeedItem]) -> Vec<String> {
    items.iter().map(|i| i.id().to_string()).collect()
}
