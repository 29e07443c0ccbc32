//! Feed source identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream sources a feed item can come from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Discussion board (Hacker News)
    DiscussionBoard,
    /// Financial news wire (Finnhub)
    FinancialNews,
    /// Package registry (crates.io)
    PackageRegistry,
    /// Any other source registered at runtime
    Custom(String),
}

impl Source {
    /// Stable identifier used in cache keys and logs
    pub fn as_str(&self) -> &str {
        match self {
            Source::DiscussionBoard => "discussion_board",
            Source::FinancialNews => "financial_news",
            Source::PackageRegistry => "package_registry",
            Source::Custom(name) => name,
        }
    }

    /// Get the full display name
    pub fn display_name(&self) -> &str {
        match self {
            Source::DiscussionBoard => "Hacker News",
            Source::FinancialNews => "Finnhub",
            Source::PackageRegistry => "crates.io",
            Source::Custom(name) => name,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "discussion_board" | "hackernews" | "hacker_news" | "hn" => Ok(Source::DiscussionBoard),
            "financial_news" | "finnhub" | "news" => Ok(Source::FinancialNews),
            "package_registry" | "cratesio" | "crates" | "crates.io" => {
                Ok(Source::PackageRegistry)
            }
            "" => Err(format!("Unknown source: {:?}", s)),
            _ => Ok(Source::Custom(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_aliases() {
        assert_eq!("hn".parse::<Source>().unwrap(), Source::DiscussionBoard);
        assert_eq!("Finnhub".parse::<Source>().unwrap(), Source::FinancialNews);
        assert_eq!("crates.io".parse::<Source>().unwrap(), Source::PackageRegistry);
        assert_eq!(
            "lobsters".parse::<Source>().unwrap(),
            Source::Custom("lobsters".to_string())
        );
        assert!("  ".parse::<Source>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for source in [
            Source::DiscussionBoard,
            Source::FinancialNews,
            Source::PackageRegistry,
        ] {
            assert_eq!(source.to_string().parse::<Source>().unwrap(), source);
        }
    }
}
