//! Configuration infrastructure
//!
//! Configuration loading and management for the vendor menu crawl.
//! All knobs are static startup parameters read from a JSON config file;
//! nothing here is runtime-mutable. The file is created with defaults on
//! first run so users have something concrete to edit.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl behavior (input/output paths, pacing, retry budget)
    pub crawler: CrawlerConfig,

    /// Request identity pools (source IPs, header fingerprints)
    pub identity: IdentityConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Application-managed settings (auto-updated after each run)
    pub app_managed: AppManagedConfig,
}

/// Crawl behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Vendor input sheet (CSV with vendor_id, vendor_code, lat, lon)
    pub vendor_file: String,

    /// Product table output path (CSV, overwritten on each run)
    pub output_file: String,

    /// Root directory of the image cache
    pub image_dir: String,

    /// Base URL of the vendor details endpoint
    pub api_base_url: String,

    /// Uniform random pause between vendors, in seconds (min, max)
    pub vendor_delay_secs: (f64, f64),

    /// Fixed pause between products, in seconds
    pub product_delay_secs: f64,

    /// Attempts per vendor before it is skipped
    pub max_attempts: u32,

    /// Total-request timeout for vendor fetches, in seconds
    pub request_timeout_seconds: u64,

    /// Total-request timeout for image downloads, in seconds
    pub image_timeout_seconds: u64,

    /// Extra in-session retries on 502/503/504 responses
    pub status_retries: u32,

    /// Base of the exponential backoff between status retries, in seconds
    pub status_backoff_base_secs: f64,

    /// Log request URLs at debug level
    pub verbose: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            vendor_file: "snappfood_vendors.csv".to_string(),
            output_file: "snappfood_vendor_products.csv".to_string(),
            image_dir: "images".to_string(),
            api_base_url: snappfood::VENDOR_DETAILS_BASE.to_string(),
            vendor_delay_secs: (1.0, 2.0),
            product_delay_secs: 0.2,
            max_attempts: 3,
            request_timeout_seconds: 15,
            image_timeout_seconds: 10,
            status_retries: 2,
            status_backoff_base_secs: 0.3,
            verbose: false,
        }
    }
}

/// Identity pool configuration.
///
/// `source_ips` is host-specific and empty by default; requests then bind to
/// the default local address. `header_sets` overrides the built-in browser
/// fingerprints when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub source_ips: Vec<String>,
    pub header_sets: Option<Vec<HashMap<String, String>>>,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output (logs/crawler.log)
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: true,
        }
    }
}

/// Settings the application updates by itself after each run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppManagedConfig {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_vendor_count: u64,
    pub last_run_product_count: u64,
}

/// Loads and persists the application configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    const DEFAULT_CONFIG_FILE: &'static str = "crawler.json";

    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILE)),
        }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load the configuration, writing defaults first if the file is missing.
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            let defaults = AppConfig::default();
            self.save_config(&defaults).await?;
            info!(
                "Created default configuration at {}",
                self.config_path.display()
            );
            return Ok(defaults);
        }
        self.load_config().await
    }

    pub async fn load_config(&self) -> Result<AppConfig> {
        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| {
                format!("failed to read config file {}", self.config_path.display())
            })?;
        serde_json::from_str(&content).with_context(|| {
            format!("failed to parse config file {}", self.config_path.display())
        })
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let content =
            serde_json::to_string_pretty(config).context("failed to serialize configuration")?;
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("failed to create config directory {}", parent.display())
                })?;
            }
        }
        fs::write(&self.config_path, content)
            .await
            .with_context(|| {
                format!("failed to write config file {}", self.config_path.display())
            })
    }

    /// Update the app-managed section in place and persist the file.
    pub async fn update_app_managed<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut AppManagedConfig),
    {
        let mut config = self.load_config().await?;
        updater(&mut config.app_managed);
        self.save_config(&config).await
    }
}

/// SnappFood endpoint constants and URL helpers.
///
/// The query string mirrors what the mobile web client sends; `lat`/`long`
/// must carry exactly six decimal digits or the upstream cache keys miss.
pub mod snappfood {
    pub const VENDOR_DETAILS_BASE: &str =
        "https://snappfood.ir/mobile/v2/restaurant/details/dynamic";
    pub const APP_VERSION: &str = "8.1.1";
    pub const UDID: &str = "afc6e8a9-e6af-4940-ba31-0ff2fe96830d";
    pub const LOCALE: &str = "fa";

    /// Build the vendor details request URL.
    pub fn vendor_details_url(base: &str, lat: f64, lon: f64, vendor_code: &str) -> String {
        let lat = format!("{lat:.6}");
        let lon = format!("{lon:.6}");
        format!(
            "{base}?lat={lat}&long={lon}&optionalClient=WEBSITE&client=WEBSITE&deviceType=WEBSITE&\
             appVersion={APP_VERSION}&UDID={UDID}&vendorCode={vendor_code}&\
             locationCacheKey=lat%3D{lat}%26long%3D{lon}&show_party=1&fetch-static-data=1&locale={LOCALE}"
        )
    }
}
