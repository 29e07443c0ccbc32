//! Error types for the aggregation services

use feedterm_core::{FetchError, Source};
use thiserror::Error;

/// Per-source failure reported by the orchestrator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// The provider call failed
    #[error("{source_id}: {error}")]
    Fetch {
        source_id: Source,
        #[source]
        error: FetchError,
    },

    #[error("No provider registered for {0}")]
    UnknownSource(Source),

    #[error("{source_id} does not support category {category:?}")]
    UnsupportedCategory { source_id: Source, category: String },
}

impl AggregationError {
    pub fn fetch(source_id: Source, error: FetchError) -> Self {
        AggregationError::Fetch { source_id, error }
    }

    pub fn source_id(&self) -> &Source {
        match self {
            AggregationError::Fetch { source_id, .. } => source_id,
            AggregationError::UnknownSource(source_id) => source_id,
            AggregationError::UnsupportedCategory { source_id, .. } => source_id,
        }
    }

    /// The underlying provider error, if the provider was called at all
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            AggregationError::Fetch { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.fetch_error().is_some_and(FetchError::is_retryable)
    }

    /// Whether the user has to change something (credential, source, category)
    pub fn is_user_actionable(&self) -> bool {
        match self {
            AggregationError::Fetch { error, .. } => error.is_user_actionable(),
            _ => true,
        }
    }
}

/// Registry lookups and credential updates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No provider registered for {0}")]
    NotFound(Source),

    #[error("{0} does not take a credential")]
    CredentialNotSupported(Source),
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {error}")]
    Invalid { field: &'static str, error: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, error: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_error_classification() {
        let unauthorized = AggregationError::fetch(
            Source::FinancialNews,
            FetchError::unauthorized("no key"),
        );
        assert!(unauthorized.is_user_actionable());
        assert!(!unauthorized.is_retryable());
        assert_eq!(unauthorized.to_string(), "financial_news: Unauthorized: no key");

        let network = AggregationError::fetch(Source::DiscussionBoard, FetchError::network("reset"));
        assert!(network.is_retryable());
        assert!(!network.is_user_actionable());

        let unknown = AggregationError::UnknownSource(Source::Custom("lobsters".into()));
        assert_eq!(unknown.source_id(), &Source::Custom("lobsters".into()));
        assert!(unknown.fetch_error().is_none());
    }
}
