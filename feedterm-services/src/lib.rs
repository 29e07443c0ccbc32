//! Feed aggregation services
//!
//! - [`ProviderRegistry`]: source → provider mapping in registration order
//! - [`FeedCache`]: TTL and budget bounded page cache
//! - [`FeedOrchestrator`]: bounded-concurrency, single-flight fetches across sources
//! - [`FeedCursor`]: caller-side "load more" state for one panel

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pagination;
pub mod registry;

pub use aggregate::AggregateFeed;
pub use cache::{CacheBudget, CacheEntry, CacheStats, FeedCache};
pub use config::{CacheConfig, FeedtermConfig, OrchestratorConfig, ProvidersConfig};
pub use error::{AggregationError, ConfigError, RegistryError};
pub use orchestrator::FeedOrchestrator;
pub use pagination::FeedCursor;
pub use registry::ProviderRegistry;
