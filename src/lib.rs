//! SnappFood vendor menu crawler
//!
//! Crawls the SnappFood public vendor API to enumerate restaurant and grocery
//! menus, downloads product images into a local cache, and writes a
//! consolidated CSV export of every product encountered.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::crawler::{MenuCrawler, RunSummary};
pub use infrastructure::config::{AppConfig, ConfigManager};
