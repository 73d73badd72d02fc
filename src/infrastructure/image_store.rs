//! Product image cache
//!
//! Images live at `{root}/{vendor_id}/{image_id}.jpg`. An existing file is
//! returned without any network call; there is no freshness check, checksum
//! validation, or expiry. Bodies are streamed to disk in chunks and written
//! verbatim, never decoded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tokio::io::AsyncWriteExt;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0";

/// Downloads and caches product images keyed by (vendor_id, image_id).
pub struct ImageStore {
    root: PathBuf,
    client: Client,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("failed to build image HTTP client")?;
        Ok(Self {
            root: root.into(),
            client,
        })
    }

    /// Deterministic cache path for an image.
    pub fn path_for(&self, vendor_id: i64, image_id: &str) -> PathBuf {
        self.root
            .join(vendor_id.to_string())
            .join(format!("{image_id}.jpg"))
    }

    /// Fetch an image into the cache, or return the cached path if the file
    /// already exists. `user_agent` is carried over from the referring
    /// session so the image request matches its fingerprint.
    pub async fn download(
        &self,
        url: &str,
        vendor_id: i64,
        image_id: &str,
        user_agent: Option<&str>,
    ) -> Result<PathBuf> {
        let dest = self.path_for(vendor_id, image_id);
        if dest.exists() {
            return Ok(dest);
        }

        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent.unwrap_or(FALLBACK_USER_AGENT))
            .header(ACCEPT, IMAGE_ACCEPT)
            .send()
            .await
            .with_context(|| format!("image request failed: {url}"))?;
        if !response.status().is_success() {
            bail!("HTTP {} for image {}", response.status(), url);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create image directory {}", parent.display()))?;
        }
        let mut file = tokio::fs::File::create(&dest)
            .await
            .with_context(|| format!("failed to create image file {}", dest.display()))?;
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("failed while streaming image body: {url}"))?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write image file {}", dest.display()))?;
        }
        file.flush()
            .await
            .with_context(|| format!("failed to flush image file {}", dest.display()))?;

        Ok(dest)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
