//! Feed Cache
//!
//! In-memory page cache keyed by [`CacheKey`]. Entries expire after their TTL
//! and the cache stays under a configurable item/byte budget by evicting the
//! least-recently-read entries (stale entries go first).
//!
//! Entries are immutable and handed out as `Arc`s, so a reader never sees a
//! half-written page: a `put` swaps the whole entry in one map operation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use feedterm_core::{CacheKey, FeedItem, Source};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

/// Size limits for the whole cache; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheBudget {
    /// Total feed items across all entries
    pub max_items: Option<usize>,
    /// Approximate total bytes across all entries
    pub max_bytes: Option<usize>,
}

impl CacheBudget {
    pub fn items(max_items: usize) -> Self {
        Self {
            max_items: Some(max_items),
            max_bytes: None,
        }
    }

    fn exceeded_by(&self, items: usize, bytes: usize) -> bool {
        self.max_items.is_some_and(|max| items > max)
            || self.max_bytes.is_some_and(|max| bytes > max)
    }
}

/// One cached page
#[derive(Debug)]
pub struct CacheEntry {
    key: CacheKey,
    items: Arc<[FeedItem]>,
    fetched_at: DateTime<Utc>,
    stored_at: Instant,
    ttl: Duration,
    size_bytes: usize,
}

impl CacheEntry {
    fn new(key: CacheKey, items: Arc<[FeedItem]>, ttl: Duration) -> Self {
        let size_bytes = items.iter().map(FeedItem::approx_size).sum();
        Self {
            key,
            items,
            fetched_at: Utc::now(),
            stored_at: Instant::now(),
            ttl,
            size_bytes,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn items(&self) -> &Arc<[FeedItem]> {
        &self.items
    }

    /// Wall-clock time of the fetch that produced this entry
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    pub fn is_stale(&self) -> bool {
        self.age() > self.ttl
    }

    pub fn remaining_ttl(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

struct Slot {
    entry: Arc<CacheEntry>,
    /// Logical clock value of the last read (or the write, if never read)
    last_read: AtomicU64,
}

enum Lookup {
    Fresh(Arc<CacheEntry>),
    Stale,
    Missing,
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// All lookups that returned nothing, stale ones included
    pub misses: u64,
    pub stale_misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub items: usize,
    pub bytes: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

pub struct FeedCache {
    entries: DashMap<CacheKey, Slot>,
    enabled: bool,
    budget: CacheBudget,
    clock: AtomicU64,
    total_items: AtomicUsize,
    total_bytes: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_misses: AtomicU64,
    evictions: AtomicU64,
    /// Serializes eviction passes; reads and writes never take it
    eviction_lock: Mutex<()>,
}

impl FeedCache {
    pub fn new(budget: CacheBudget) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: true,
            budget,
            clock: AtomicU64::new(0),
            total_items: AtomicUsize::new(0),
            total_bytes: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            eviction_lock: Mutex::new(()),
        }
    }

    /// A cache that never stores or returns anything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(CacheBudget::default())
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn budget(&self) -> CacheBudget {
        self.budget
    }

    /// Fresh entry for `key`; stale entries count as misses
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        match self.read(key) {
            Lookup::Fresh(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Lookup::Stale => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.stale_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Lookup::Missing => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Same as [`get`](Self::get) without touching any counter
    pub(crate) fn lookup(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        match self.read(key) {
            Lookup::Fresh(entry) => Some(entry),
            Lookup::Stale | Lookup::Missing => None,
        }
    }

    fn read(&self, key: &CacheKey) -> Lookup {
        if !self.enabled {
            return Lookup::Missing;
        }

        let Some(slot) = self.entries.get(key) else {
            return Lookup::Missing;
        };
        if slot.entry.is_stale() {
            return Lookup::Stale;
        }
        slot.last_read.store(self.tick(), Ordering::Relaxed);
        Lookup::Fresh(Arc::clone(&slot.entry))
    }

    /// Store a page, replacing any previous entry for `key`
    ///
    /// Runs an eviction pass afterwards. Returns the stored entry, or `None`
    /// when the cache is disabled.
    pub fn put(
        &self,
        key: CacheKey,
        items: impl Into<Arc<[FeedItem]>>,
        ttl: Duration,
    ) -> Option<Arc<CacheEntry>> {
        if !self.enabled {
            return None;
        }

        let entry = Arc::new(CacheEntry::new(key.clone(), items.into(), ttl));
        let slot = Slot {
            entry: Arc::clone(&entry),
            last_read: AtomicU64::new(self.tick()),
        };

        // Count before inserting so a concurrent removal can never underflow
        self.account_add(&entry);
        if let Some(old) = self.entries.insert(key, slot) {
            self.account_sub(&old.entry);
        }
        debug!(
            "Cached {} items for {} (ttl {}s)",
            entry.items.len(),
            entry.key,
            ttl.as_secs()
        );

        self.evict_if_over_budget();
        Some(entry)
    }

    /// Drop one entry; returns whether anything was removed
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        match self.entries.remove(key) {
            Some((_, slot)) => {
                self.account_sub(&slot.entry);
                debug!("Invalidated {}", key);
                true
            }
            None => false,
        }
    }

    /// Drop every page cached for `source`
    pub fn invalidate_source(&self, source: &Source) -> usize {
        let keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|e| e.key().source() == source)
            .map(|e| e.key().clone())
            .collect();

        let removed = keys.iter().filter(|k| self.invalidate(k)).count();
        info!("Invalidated {} cached pages for {}", removed, source);
        removed
    }

    /// Drop all stale entries
    pub fn purge_stale(&self) -> usize {
        let stale: Vec<(CacheKey, Arc<CacheEntry>)> = self
            .entries
            .iter()
            .filter(|e| e.entry.is_stale())
            .map(|e| (e.key().clone(), Arc::clone(&e.entry)))
            .collect();

        let removed = stale
            .iter()
            .filter(|(key, entry)| self.remove_exact(key, entry))
            .count();
        if removed > 0 {
            debug!("Purged {} stale cache entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        let keys: Vec<CacheKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in &keys {
            self.invalidate(key);
        }
    }

    /// Evict until the cache is within budget
    ///
    /// Stale entries are evicted first, then the least recently read.
    /// Returns the number of evicted entries.
    pub fn evict_if_over_budget(&self) -> usize {
        let _guard = self.eviction_lock.lock();
        let mut evicted = 0;

        while self.over_budget() {
            let victim = self
                .entries
                .iter()
                .map(|e| {
                    let rank = (!e.entry.is_stale(), e.last_read.load(Ordering::Relaxed));
                    (rank, e.key().clone(), Arc::clone(&e.entry))
                })
                .min_by_key(|(rank, _, _)| *rank);

            let Some((_, key, entry)) = victim else {
                break;
            };

            if self.remove_exact(&key, &entry) {
                evicted += 1;
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("Evicted {}", key);
            }
        }

        evicted
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_misses: self.stale_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
            items: self.total_items.load(Ordering::Relaxed),
            bytes: self.total_bytes.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove `key` only if it still holds `entry` (a newer `put` wins)
    fn remove_exact(&self, key: &CacheKey, entry: &Arc<CacheEntry>) -> bool {
        match self
            .entries
            .remove_if(key, |_, slot| Arc::ptr_eq(&slot.entry, entry))
        {
            Some((_, slot)) => {
                self.account_sub(&slot.entry);
                true
            }
            None => false,
        }
    }

    fn over_budget(&self) -> bool {
        self.budget.exceeded_by(
            self.total_items.load(Ordering::Relaxed),
            self.total_bytes.load(Ordering::Relaxed),
        )
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn account_add(&self, entry: &CacheEntry) {
        self.total_items.fetch_add(entry.items.len(), Ordering::Relaxed);
        self.total_bytes.fetch_add(entry.size_bytes, Ordering::Relaxed);
    }

    fn account_sub(&self, entry: &CacheEntry) {
        self.total_items.fetch_sub(entry.items.len(), Ordering::Relaxed);
        self.total_bytes.fetch_sub(entry.size_bytes, Ordering::Relaxed);
    }
}
