//! Application layer: fetch, extract, orchestrate
//!
//! The crawl workflow over the infrastructure pieces. `fetcher` owns the
//! per-vendor attempt loop, `extractor` flattens payloads into records,
//! `crawler` drives the whole run.

pub mod crawler;
pub mod extractor;
pub mod fetcher;

pub use crawler::{MenuCrawler, RunSummary};
pub use extractor::ProductExtractor;
pub use fetcher::{DecodeError, FetchError, VendorFetcher};
