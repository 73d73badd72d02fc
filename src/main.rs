//! CLI entry point
//!
//! Loads the configuration (creating a default file on first run), sets up
//! logging, runs the crawl, and records the run outcome back into the
//! config file's app-managed section.

use anyhow::Result;
use chrono::Utc;

use snappfood_crawler::application::crawler::MenuCrawler;
use snappfood_crawler::infrastructure::config::ConfigManager;
use snappfood_crawler::infrastructure::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let manager = ConfigManager::new(config_path);
    let mut config = manager.initialize_on_first_run().await?;
    if config.crawler.verbose && config.logging.level.eq_ignore_ascii_case("info") {
        config.logging.level = "debug".to_string();
    }
    logging::init_logging_with_config(&config.logging)?;
    logging::log_system_info();

    let mut crawler = MenuCrawler::new(config)?;
    let summary = crawler.run().await?;

    manager
        .update_app_managed(|managed| {
            managed.last_run_at = Some(Utc::now());
            managed.last_run_vendor_count = summary.vendors_total as u64;
            managed.last_run_product_count = summary.products as u64;
        })
        .await?;

    Ok(())
}
