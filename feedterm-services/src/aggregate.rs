//! Multi-source aggregate results and the merge policy

use std::cmp::Ordering;
use std::sync::Arc;

use feedterm_core::{FeedItem, Source};
use indexmap::IndexMap;

use crate::error::AggregationError;

pub type PageResult = Result<Arc<[FeedItem]>, AggregationError>;

/// Outcome of one `fetch_all` call, one entry per requested source
///
/// Entries are ordered by registry order; sources the registry does not know
/// come last, in request order.
#[derive(Debug, Clone, Default)]
pub struct AggregateFeed {
    results: IndexMap<Source, PageResult>,
}

impl AggregateFeed {
    pub(crate) fn new(registry_order: &[Source], outcomes: Vec<(Source, PageResult)>) -> Self {
        let mut outcomes: IndexMap<Source, PageResult> = outcomes.into_iter().collect();
        let mut results = IndexMap::with_capacity(outcomes.len());

        for source in registry_order {
            if let Some(result) = outcomes.shift_remove(source) {
                results.insert(source.clone(), result);
            }
        }
        results.extend(outcomes);

        Self { results }
    }

    pub fn get(&self, source: &Source) -> Option<&PageResult> {
        self.results.get(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Source, &PageResult)> {
        self.results.iter()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.results.keys()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&Source, &Arc<[FeedItem]>)> {
        self.results
            .iter()
            .filter_map(|(source, result)| result.as_ref().ok().map(|items| (source, items)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &AggregationError> {
        self.results.values().filter_map(|result| result.as_ref().err())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All successful items as one list
    ///
    /// Newest first; equal timestamps fall back to source order, then id.
    /// Untimestamped items go last and keep their per-source order.
    pub fn merged(&self) -> Vec<FeedItem> {
        let mut ranked: Vec<(usize, &FeedItem)> = self
            .successes()
            .enumerate()
            .flat_map(|(rank, (_, items))| items.iter().map(move |item| (rank, item)))
            .collect();

        ranked.sort_by(|a, b| merge_order(*a, *b));
        ranked.into_iter().map(|(_, item)| item.clone()).collect()
    }
}

fn merge_order((rank_a, a): (usize, &FeedItem), (rank_b, b): (usize, &FeedItem)) -> Ordering {
    match (a.published_at(), b.published_at()) {
        (Some(x), Some(y)) => y
            .cmp(&x)
            .then(rank_a.cmp(&rank_b))
            .then_with(|| a.id().cmp(b.id())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
