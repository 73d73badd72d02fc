//! Crawl orchestration
//!
//! Sequential vendor loop: fetch, extract, accumulate, pause. Vendors are
//! independent; a vendor that exhausts its attempt budget is skipped with a
//! logged reason and never aborts the run. The only fatal errors are the
//! up-front configuration checks (vendor sheet, identity pool) and the final
//! export write.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::application::extractor::ProductExtractor;
use crate::application::fetcher::VendorFetcher;
use crate::domain::ProductRecord;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::identity::IdentityPool;
use crate::infrastructure::image_store::ImageStore;
use crate::infrastructure::{export, vendor_reader};

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub vendors_total: usize,
    pub vendors_with_products: usize,
    pub products: usize,
    pub output_file: Option<PathBuf>,
    pub elapsed_secs: f64,
}

/// The crawl driver. Owns the identity pool, the image cache, and the
/// growing record collection.
pub struct MenuCrawler {
    config: AppConfig,
    pool: IdentityPool,
    images: ImageStore,
    records: Vec<ProductRecord>,
}

impl MenuCrawler {
    pub fn new(config: AppConfig) -> Result<Self> {
        let pool = IdentityPool::from_config(&config.identity)
            .context("invalid identity configuration")?;
        let images = ImageStore::new(
            &config.crawler.image_dir,
            config.crawler.image_timeout_seconds,
        )?;
        Ok(Self {
            config,
            pool,
            images,
            records: Vec::new(),
        })
    }

    /// Crawl every vendor in the input sheet and write the product export.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();

        let vendors = vendor_reader::load_vendors(Path::new(&self.config.crawler.vendor_file))?;
        if vendors.is_empty() {
            info!("Vendor file is empty; nothing to crawl");
            return Ok(self.summary(0, 0, None, started));
        }
        if self.pool.source_ip_count() == 0 {
            warn!("No source IPs configured; requests bind to the default local address");
        }

        let fetcher = VendorFetcher::new(&self.pool, &self.config.crawler);
        let extractor = ProductExtractor::new(
            &self.images,
            Duration::from_secs_f64(self.config.crawler.product_delay_secs.max(0.0)),
        );
        let mut vendors_with_products = 0usize;

        for (index, vendor) in vendors.iter().enumerate() {
            info!(
                "[{}/{}] vendor {} ({})",
                index + 1,
                vendors.len(),
                vendor.vendor_id,
                vendor.vendor_code
            );

            let Some(payload) = fetcher.fetch(vendor).await else {
                warn!("[{}] skipped - no success", vendor.vendor_id);
                self.vendor_pause().await;
                continue;
            };
            if !payload
                .get("status")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                warn!("[{}] skipped - no success", vendor.vendor_id);
                self.vendor_pause().await;
                continue;
            }
            let menu_count = payload
                .pointer("/data/menus")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if menu_count == 0 {
                warn!("[{}] no menus", vendor.vendor_id);
                self.vendor_pause().await;
                continue;
            }

            // Image requests carry the fingerprint of a fresh identity, like
            // any other traffic from this host.
            let identity = self.pool.pick();
            let records = extractor
                .extract(vendor.vendor_id, &payload, identity.user_agent())
                .await;
            if !records.is_empty() {
                vendors_with_products += 1;
            }
            self.records.extend(records);

            info!(
                "[{}] done - total products so far {}",
                vendor.vendor_id,
                self.records.len()
            );
            self.vendor_pause().await;
        }

        if self.records.is_empty() {
            warn!("No products collected.");
            return Ok(self.summary(vendors.len(), vendors_with_products, None, started));
        }

        let output = PathBuf::from(&self.config.crawler.output_file);
        export::write_records(&output, &self.records)?;
        let summary = self.summary(vendors.len(), vendors_with_products, Some(output), started);
        info!(
            "Crawl finished: {} products from {}/{} vendors ({:.1}s)",
            summary.products, summary.vendors_with_products, summary.vendors_total, summary.elapsed_secs
        );
        Ok(summary)
    }

    /// Records accumulated so far, in encounter order.
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    fn summary(
        &self,
        vendors_total: usize,
        vendors_with_products: usize,
        output_file: Option<PathBuf>,
        started: Instant,
    ) -> RunSummary {
        RunSummary {
            vendors_total,
            vendors_with_products,
            products: self.records.len(),
            output_file,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    /// Uniform random courtesy pause between vendors.
    async fn vendor_pause(&self) {
        let (min, max) = self.config.crawler.vendor_delay_secs;
        let span = (max - min).max(0.0);
        let secs = min.max(0.0) + fastrand::f64() * span;
        if secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }
}
