//! feedterm
//!
//! Fetches Hacker News, Finnhub and crates.io through the aggregator and
//! prints one panel per source, or a single merged list.

mod render;

use anyhow::{bail, Context};
use clap::Parser;
use feedterm_core::{Query, Source};
use feedterm_services::{FeedCursor, FeedOrchestrator, FeedtermConfig};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "feedterm", version)]
#[command(about = "Aggregate Hacker News, Finnhub and crates.io feeds in the terminal")]
struct Cli {
    /// Source to show (hn, finnhub, crates); repeat for several.
    /// Defaults to every source that is ready.
    #[arg(short, long = "source", value_name = "SOURCE")]
    sources: Vec<Source>,

    /// Category, e.g. top/new/best for hn, general/crypto for finnhub,
    /// new/updated/downloads for crates. Defaults per source.
    #[arg(short, long)]
    category: Option<String>,

    /// Page to fetch (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Items per page
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,

    /// Print one list ordered by publish time instead of one panel per source
    #[arg(short, long)]
    merged: bool,

    /// Ignore cached pages
    #[arg(short, long)]
    refresh: bool,

    /// Scroll through N pages of a single source
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Disable the cache for this run
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Logs go to stderr so feed output stays pipeable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,feedterm=debug")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = FeedtermConfig::from_env().context("invalid configuration")?;
    if cli.no_cache {
        config.cache.enabled = false;
    }
    let page_size = cli.page_size.unwrap_or(config.orchestrator.page_size);
    let orchestrator = FeedOrchestrator::from_config(&config);

    for (source, status) in orchestrator.registry().status_summary() {
        if !status.is_ready() {
            info!("{} unavailable: {:?}", source.display_name(), status);
        }
    }

    let sources = selected_sources(&cli, &orchestrator);
    if sources.is_empty() {
        bail!("No source is ready; set FINNHUB_API_KEY or pass --source");
    }

    let category = cli.category.as_deref();
    let queries = sources
        .iter()
        .map(|source| build_query(&orchestrator, source, category, cli.page, page_size))
        .collect::<anyhow::Result<Vec<Query>>>()?;

    if cli.refresh {
        for source in &sources {
            orchestrator.refresh_source(source);
        }
    }

    if let Some(pages) = cli.pages {
        let [query] = queries.as_slice() else {
            bail!("--pages scrolls a single source; pass exactly one --source");
        };
        return scroll(&orchestrator, query.clone(), pages).await;
    }

    tokio::select! {
        feed = orchestrator.fetch_all(&queries) => {
            if cli.merged {
                render::print_merged(&feed);
            } else {
                render::print_panels(&feed);
            }
            let stats = orchestrator.cache().stats();
            info!(
                "Cache: {} entries, {} items, hit rate {:.0}%",
                stats.entries,
                stats.items,
                stats.hit_rate() * 100.0
            );
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, dropping in-flight requests");
        }
    }

    Ok(())
}

fn selected_sources(cli: &Cli, orchestrator: &FeedOrchestrator) -> Vec<Source> {
    if cli.sources.is_empty() {
        return orchestrator.registry().ready_sources();
    }

    let mut sources: Vec<Source> = Vec::with_capacity(cli.sources.len());
    for source in &cli.sources {
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }
    sources
}

fn build_query(
    orchestrator: &FeedOrchestrator,
    source: &Source,
    category: Option<&str>,
    page: u32,
    page_size: u32,
) -> anyhow::Result<Query> {
    // Unknown sources still get a query so the aggregate reports them
    let category = match category {
        Some(category) => category.to_string(),
        None => orchestrator
            .default_query(source)
            .map(|q| q.category().to_string())
            .unwrap_or_default(),
    };

    Ok(Query::new(source.clone(), category)
        .with_page(page)?
        .with_page_size(page_size)?)
}

/// Drive a cursor through `pages` pages, printing each batch as it arrives
async fn scroll(orchestrator: &FeedOrchestrator, query: Query, pages: u32) -> anyhow::Result<()> {
    let mut cursor = FeedCursor::new(query);

    for _ in 0..pages {
        let before = cursor.len();
        let loaded = tokio::select! {
            result = cursor.load_more(orchestrator) => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                return Ok(());
            }
        };

        match loaded {
            Ok(_) => render::print_items(&cursor.items()[before..], before),
            Err(e) => {
                render::print_error(&e);
                break;
            }
        }
        if cursor.is_exhausted() {
            println!("-- end of feed --");
            break;
        }
    }

    Ok(())
}
