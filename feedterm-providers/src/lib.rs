//! Feed provider adapters
//!
//! This crate provides the [`FeedProvider`] capability contract and one
//! adapter per upstream source:
//! - Hacker News: discussion board, category → story list endpoint
//! - Finnhub: financial news, requires an API token
//! - crates.io: package registry, category → sort order

pub mod cratesio;
pub mod finnhub;
pub mod hackernews;
mod html;
mod http;
pub mod paging;
pub mod provider;

pub use cratesio::{CratesCategory, CratesIoProvider};
pub use finnhub::{FinnhubProvider, NewsCategory};
pub use hackernews::{HackerNewsProvider, HnCategory};
pub use paging::slice_page;
pub use provider::{FeedProvider, ProviderStatus};
