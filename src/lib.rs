//! Resumable review scraping and lexicon sentiment scoring.
//!
//! Two independent halves:
//! - [`crawl::PagedScraper`] pages through a review listing, persisting
//!   records and a resume cursor after every page.
//! - [`sentiment::SentimentScorer`] turns a review text plus an optional
//!   rating into a score in `[-1, 1]` using a static [`lexicon::Lexicon`].

pub mod batch;
pub mod config;
pub mod crawl;
pub mod cursor;
pub mod error;
pub mod fetch;
pub mod lexicon;
pub mod record;
pub mod retry;
pub mod sentiment;
pub mod sites;

pub use config::Config;
pub use error::{ConfigError, FetchError};
pub use crawl::{CrawlOutcome, CrawlSummary, PagedScraper};
pub use sentiment::SentimentScorer;
