//! Provider registry
//!
//! Built once at startup and shared with the orchestrator behind an `Arc`.
//! Registration order is the display order for multi-source aggregates.

use std::collections::HashMap;
use std::sync::Arc;

use feedterm_core::Source;
use feedterm_providers::{
    CratesIoProvider, FeedProvider, FinnhubProvider, HackerNewsProvider, ProviderStatus,
};
use tracing::{info, warn};

use crate::config::ProvidersConfig;
use crate::error::RegistryError;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<Source, Arc<dyn FeedProvider>>,
    order: Vec<Source>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in adapters, in display order
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut registry = Self::new();
        registry.register(HackerNewsProvider::with_base_url(&config.hn_base_url));
        registry.register(FinnhubProvider::with_base_url(
            config.finnhub_api_key.clone(),
            &config.finnhub_base_url,
        ));
        registry.register(CratesIoProvider::with_base_url(&config.crates_io_base_url));
        registry
    }

    /// Register a provider under its own source id
    ///
    /// Registering a source twice replaces the provider but keeps its position.
    pub fn register<P: FeedProvider + 'static>(&mut self, provider: P) {
        self.register_arc(Arc::new(provider));
    }

    pub fn register_arc(&mut self, provider: Arc<dyn FeedProvider>) {
        let source = provider.source_id();
        if self.providers.insert(source.clone(), provider).is_some() {
            warn!("Replacing provider for {}", source);
        } else {
            info!("Registered provider {}", source);
            self.order.push(source);
        }
    }

    pub fn get(&self, source: &Source) -> Result<Arc<dyn FeedProvider>, RegistryError> {
        self.providers
            .get(source)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(source.clone()))
    }

    /// Registered sources in insertion order
    pub fn active_sources(&self) -> &[Source] {
        &self.order
    }

    /// Sources whose provider currently reports [`ProviderStatus::Ready`]
    pub fn ready_sources(&self) -> Vec<Source> {
        self.order
            .iter()
            .filter(|s| self.providers.get(*s).is_some_and(|p| p.status().is_ready()))
            .cloned()
            .collect()
    }

    pub fn status_summary(&self) -> Vec<(Source, ProviderStatus)> {
        self.order
            .iter()
            .filter_map(|s| self.providers.get(s).map(|p| (s.clone(), p.status())))
            .collect()
    }

    /// Position of `source` in display order
    pub fn rank(&self, source: &Source) -> Option<usize> {
        self.order.iter().position(|s| s == source)
    }

    /// Rotate a provider's credential; safe while fetches are in flight
    pub fn update_credential(&self, source: &Source, token: String) -> Result<(), RegistryError> {
        let provider = self.get(source)?;
        if provider.set_credential(token) {
            Ok(())
        } else {
            Err(RegistryError::CredentialNotSupported(source.clone()))
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order_and_status() {
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default());
        assert_eq!(
            registry.active_sources(),
            &[
                Source::DiscussionBoard,
                Source::FinancialNews,
                Source::PackageRegistry
            ]
        );
        // No Finnhub key in the default config
        assert_eq!(
            registry.ready_sources(),
            vec![Source::DiscussionBoard, Source::PackageRegistry]
        );
        assert!(matches!(
            registry.status_summary()[1],
            (Source::FinancialNews, ProviderStatus::NeedsConfig(_))
        ));
    }

    #[test]
    fn test_credential_rotation() {
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default());

        registry
            .update_credential(&Source::FinancialNews, "token".to_string())
            .unwrap();
        assert_eq!(registry.ready_sources().len(), 3);

        assert_eq!(
            registry.update_credential(&Source::DiscussionBoard, "x".to_string()),
            Err(RegistryError::CredentialNotSupported(Source::DiscussionBoard))
        );
        assert!(matches!(
            registry.get(&Source::Custom("lobsters".into())),
            Err(RegistryError::NotFound(_))
        ));
    }
}
