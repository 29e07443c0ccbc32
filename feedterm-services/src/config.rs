//! Runtime configuration
//!
//! Everything is read from the environment (the binary loads `.env.local`
//! first). Unset variables fall back to the `default_*` values below.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use feedterm_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use feedterm_providers::cratesio::CRATES_IO_API;
use feedterm_providers::finnhub::FINNHUB_API_BASE;
use feedterm_providers::hackernews::HN_API_BASE;
use serde::Deserialize;

use crate::cache::{CacheBudget, FeedCache};
use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedtermConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Credentials and base URLs for the built-in providers
#[derive(Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Finnhub API token; the provider reports `NeedsConfig` without it
    #[serde(default)]
    pub finnhub_api_key: Option<String>,
    #[serde(default = "default_finnhub_base_url")]
    pub finnhub_base_url: String,
    #[serde(default = "default_hn_base_url")]
    pub hn_base_url: String,
    #[serde(default = "default_crates_io_base_url")]
    pub crates_io_base_url: String,
}

// Keeps the token out of logs
impl fmt::Debug for ProvidersConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidersConfig")
            .field(
                "finnhub_api_key",
                &self.finnhub_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("finnhub_base_url", &self.finnhub_base_url)
            .field("hn_base_url", &self.hn_base_url)
            .field("crates_io_base_url", &self.crates_io_base_url)
            .finish()
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            finnhub_base_url: default_finnhub_base_url(),
            hn_base_url: default_hn_base_url(),
            crates_io_base_url: default_crates_io_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long a fetched page stays fresh (in seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Item budget across all cached pages
    #[serde(default = "default_cache_max_items")]
    pub max_items: Option<usize>,
    /// Approximate byte budget across all cached pages
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn budget(&self) -> CacheBudget {
        CacheBudget {
            max_items: self.max_items,
            max_bytes: self.max_bytes,
        }
    }

    pub fn build(&self) -> FeedCache {
        if self.enabled {
            FeedCache::new(self.budget())
        } else {
            FeedCache::disabled()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_secs: default_cache_ttl_secs(),
            max_items: default_cache_max_items(),
            max_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Provider calls in flight across all sources
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Deadline for a single provider call (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Page size used when the caller does not pick one
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl FeedtermConfig {
    /// Load configuration from environment variables
    ///
    /// Reads:
    /// - FINNHUB_API_KEY, FINNHUB_BASE_URL, HN_BASE_URL, CRATES_IO_BASE_URL
    /// - FEEDTERM_CACHE_ENABLED, FEEDTERM_CACHE_TTL_SECS,
    ///   FEEDTERM_CACHE_MAX_ITEMS, FEEDTERM_CACHE_MAX_BYTES
    /// - FEEDTERM_MAX_CONCURRENCY, FEEDTERM_REQUEST_TIMEOUT_SECS, FEEDTERM_PAGE_SIZE
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        config.providers.finnhub_api_key = var("FINNHUB_API_KEY");
        if let Some(url) = var("FINNHUB_BASE_URL") {
            config.providers.finnhub_base_url = url;
        }
        if let Some(url) = var("HN_BASE_URL") {
            config.providers.hn_base_url = url;
        }
        if let Some(url) = var("CRATES_IO_BASE_URL") {
            config.providers.crates_io_base_url = url;
        }

        if let Some(raw) = var("FEEDTERM_CACHE_ENABLED") {
            config.cache.enabled = parse_bool("FEEDTERM_CACHE_ENABLED", &raw)?;
        }
        if let Some(raw) = var("FEEDTERM_CACHE_TTL_SECS") {
            config.cache.ttl_secs = parse("FEEDTERM_CACHE_TTL_SECS", &raw)?;
        }
        if let Some(raw) = var("FEEDTERM_CACHE_MAX_ITEMS") {
            config.cache.max_items = Some(parse("FEEDTERM_CACHE_MAX_ITEMS", &raw)?);
        }
        if let Some(raw) = var("FEEDTERM_CACHE_MAX_BYTES") {
            config.cache.max_bytes = Some(parse("FEEDTERM_CACHE_MAX_BYTES", &raw)?);
        }

        if let Some(raw) = var("FEEDTERM_MAX_CONCURRENCY") {
            config.orchestrator.max_concurrency = parse("FEEDTERM_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = var("FEEDTERM_REQUEST_TIMEOUT_SECS") {
            config.orchestrator.request_timeout_secs =
                parse("FEEDTERM_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = var("FEEDTERM_PAGE_SIZE") {
            config.orchestrator.page_size = parse("FEEDTERM_PAGE_SIZE", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const AT_LEAST_ONE: &str = "must be at least 1";

        let orchestrator = &self.orchestrator;
        if orchestrator.max_concurrency == 0 {
            return Err(ConfigError::invalid("FEEDTERM_MAX_CONCURRENCY", AT_LEAST_ONE));
        }
        if orchestrator.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("FEEDTERM_REQUEST_TIMEOUT_SECS", AT_LEAST_ONE));
        }
        if orchestrator.page_size == 0 || orchestrator.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::invalid(
                "FEEDTERM_PAGE_SIZE",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }

        if self.cache.enabled {
            if self.cache.max_items == Some(0) {
                return Err(ConfigError::invalid("FEEDTERM_CACHE_MAX_ITEMS", AT_LEAST_ONE));
            }
            if self.cache.max_bytes == Some(0) {
                return Err(ConfigError::invalid("FEEDTERM_CACHE_MAX_BYTES", AT_LEAST_ONE));
            }
        }
        Ok(())
    }
}

fn parse<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::invalid(field, e.to_string()))
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            field,
            format!("expected a boolean, got {:?}", other),
        )),
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_cache_max_items() -> Option<usize> {
    Some(2000)
}

fn default_max_concurrency() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_finnhub_base_url() -> String {
    FINNHUB_API_BASE.to_string()
}

fn default_hn_base_url() -> String {
    HN_API_BASE.to_string()
}

fn default_crates_io_base_url() -> String {
    CRATES_IO_API.to_string()
}
