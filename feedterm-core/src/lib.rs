//! Core types for the feedterm feed aggregator
//!
//! This crate defines the shared data structures used across the workspace:
//! the unified feed item model, source identifiers, query descriptors and the
//! error taxonomy at the provider boundary.

pub mod error;
pub mod item;
pub mod query;
pub mod source;

pub use error::{ErrorKind, FetchError, FetchResult, ItemError, QueryError};
pub use item::{keys, FeedItem, ItemMetadata};
pub use query::{CacheKey, Query, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use source::Source;
