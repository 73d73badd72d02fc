//! Infrastructure layer for configuration, logging, and external I/O
//!
//! Everything that touches the outside world lives here: the config file,
//! the tracing setup, identity pools, the bound HTTP client, the vendor
//! input sheet, the image cache, and the CSV export.

pub mod config;
pub mod export;
pub mod http_client;
pub mod identity;
pub mod image_store;
pub mod logging;
pub mod vendor_reader;

pub use config::{AppConfig, ConfigManager, CrawlerConfig};
pub use http_client::{BoundClient, BoundClientConfig};
pub use identity::{Identity, IdentityPool};
pub use image_store::ImageStore;
pub use logging::{init_logging_with_config, log_system_info};
