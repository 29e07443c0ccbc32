//! Plain-text rendering of feeds and per-source errors

use feedterm_core::{keys, FeedItem};
use feedterm_services::{AggregateFeed, AggregationError};

pub fn print_panels(feed: &AggregateFeed) {
    for (source, result) in feed.iter() {
        println!("== {} ==", source.display_name());
        match result {
            Ok(items) if items.is_empty() => println!("   (no items)"),
            Ok(items) => print_items(items, 0),
            Err(e) => print_error(e),
        }
        println!();
    }
}

/// One list, newest first; failed sources are listed as badges on top
pub fn print_merged(feed: &AggregateFeed) {
    for error in feed.failures() {
        print_error(error);
    }

    let items = feed.merged();
    if items.is_empty() {
        println!("   (no items)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, item.source().display_name(), item.title());
        print_details(item);
    }
}

/// Print `items`, numbering from `offset + 1`
pub fn print_items(items: &[FeedItem], offset: usize) {
    for (i, item) in items.iter().enumerate() {
        println!("{:>3}. {}", offset + i + 1, item.title());
        print_details(item);
    }
}

pub fn print_error(error: &AggregationError) {
    println!("   [{}] {}", badge(error), error);
}

/// Transient failures versus ones that need the user (or a fix) first
fn badge(error: &AggregationError) -> &'static str {
    if error.is_retryable() {
        "retry later"
    } else {
        "action needed"
    }
}

fn print_details(item: &FeedItem) {
    let mut parts = Vec::new();

    if let Some(domain) = item.domain() {
        parts.push(domain);
    }
    if let Some(score) = item.metadata().score() {
        parts.push(format!("{} points", score));
    }
    if let Some(comments) = item.metadata().comments() {
        parts.push(format!("{} comments", comments));
    }
    if let Some(downloads) = item.metadata().get_i64(keys::DOWNLOADS) {
        parts.push(format!("{} downloads", downloads));
    }
    if let Some(author) = item.author() {
        parts.push(format!("by {}", author));
    }
    if let Some(age) = item.time_ago() {
        parts.push(age);
    }

    if !parts.is_empty() {
        println!("     {}", parts.join(" | "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedterm_core::{FetchError, Source};

    #[test]
    fn test_badges() {
        let fetch = |e| AggregationError::fetch(Source::FinancialNews, e);
        assert_eq!(badge(&fetch(FetchError::unauthorized("no key"))), "action needed");
        assert_eq!(badge(&fetch(FetchError::rate_limited(None))), "retry later");
        assert_eq!(badge(&fetch(FetchError::network("reset"))), "retry later");
        assert_eq!(badge(&fetch(FetchError::invalid_response("bad"))), "action needed");
        assert_eq!(
            badge(&AggregationError::UnknownSource(Source::Custom("x".into()))),
            "action needed"
        );
    }
}
