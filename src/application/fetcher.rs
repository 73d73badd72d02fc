//! Vendor payload fetching
//!
//! One fetch is a loop of attempts, each under a fresh identity. A 200
//! response goes through a three-stage body decode: direct JSON parse,
//! manual Brotli decompression when the body is declared `br` but the
//! transport handed it back compressed, then a lossy UTF-8 parse. Any
//! failure is logged and charged against the vendor's attempt budget.

use reqwest::StatusCode;
use reqwest::header::CONTENT_ENCODING;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::Vendor;
use crate::infrastructure::config::{CrawlerConfig, snappfood};
use crate::infrastructure::http_client::{BoundClient, BoundClientConfig};
use crate::infrastructure::identity::IdentityPool;

const SNIPPET_LEN: usize = 100;

/// Why a response body could not be decoded into JSON.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("brotli body but no decompressor support compiled in")]
    BrotliUnavailable,
    #[error("manual brotli decompress failed: {0}")]
    Brotli(String),
    #[error("failed to parse JSON | {snippet:?}")]
    Json { snippet: String },
}

/// Why a single fetch attempt failed. All variants are transient from the
/// attempt loop's point of view.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("net-err: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status} | {snippet:?}")]
    Status { status: StatusCode, snippet: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Decode a response body into JSON, tolerating content-encoding ambiguity.
///
/// Stages, in order: direct parse; if the declared encoding includes `br`,
/// manual Brotli decompression then parse (no further fallback — a garbled
/// brotli body is not recoverable as text); otherwise a lossy UTF-8 decode
/// and parse.
pub fn decode_payload(body: &[u8], content_encoding: &str) -> Result<Value, DecodeError> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return Ok(value);
    }

    if content_encoding.to_ascii_lowercase().contains("br") {
        #[cfg(feature = "brotli-fallback")]
        {
            let decoded = decompress_brotli(body)?;
            return serde_json::from_slice(&decoded).map_err(|_| DecodeError::Json {
                snippet: snippet(&String::from_utf8_lossy(&decoded)),
            });
        }
        #[cfg(not(feature = "brotli-fallback"))]
        {
            return Err(DecodeError::BrotliUnavailable);
        }
    }

    let text = String::from_utf8_lossy(body);
    serde_json::from_str(&text).map_err(|_| DecodeError::Json {
        snippet: snippet(&text),
    })
}

#[cfg(feature = "brotli-fallback")]
fn decompress_brotli(body: &[u8]) -> Result<Vec<u8>, DecodeError> {
    use std::io::Read;
    let mut decoder = brotli::Decompressor::new(body, 4096);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| DecodeError::Brotli(e.to_string()))?;
    Ok(decoded)
}

/// First characters of a body, flattened to one line, for log context.
fn snippet(text: &str) -> String {
    text.chars()
        .take(SNIPPET_LEN)
        .collect::<String>()
        .replace(['\n', '\r'], " ")
}

/// Fetches one vendor's menu payload with per-attempt identity rotation.
pub struct VendorFetcher<'a> {
    pool: &'a IdentityPool,
    config: &'a CrawlerConfig,
}

impl<'a> VendorFetcher<'a> {
    pub fn new(pool: &'a IdentityPool, config: &'a CrawlerConfig) -> Self {
        Self { pool, config }
    }

    /// Fetch and decode the vendor payload, or `None` once the attempt
    /// budget is exhausted.
    pub async fn fetch(&self, vendor: &Vendor) -> Option<Value> {
        for attempt in 1..=self.config.max_attempts {
            let mut identity = self.pool.pick();
            if attempt > 1 {
                // First-attempt-only credentials are presumed revoked or
                // rate-limited once an attempt has failed.
                identity.drop_authorization();
            }
            let ip = identity.ip_label();

            let client_config = BoundClientConfig {
                timeout_seconds: self.config.request_timeout_seconds,
                status_retries: self.config.status_retries,
                status_backoff_base_secs: self.config.status_backoff_base_secs,
            };
            let client = match BoundClient::new(&identity, client_config) {
                Ok(client) => client,
                Err(err) => {
                    warn!(
                        "[{}] attempt {}/{} via {} could not build session: {:#}",
                        vendor.vendor_id, attempt, self.config.max_attempts, ip, err
                    );
                    continue;
                }
            };

            let url = snappfood::vendor_details_url(
                &self.config.api_base_url,
                vendor.lat,
                vendor.lon,
                &vendor.vendor_code,
            );
            info!(
                "[{}] attempt {}/{} using IP {}",
                vendor.vendor_id, attempt, self.config.max_attempts, ip
            );
            if self.config.verbose {
                debug!("[{}] attempt {} url -> {}", vendor.vendor_id, attempt, url);
            }

            match self.fetch_once(&client, &url).await {
                Ok(payload) => return Some(payload),
                Err(err) => warn!(
                    "[{}] attempt {}/{} via {} -> {}",
                    vendor.vendor_id, attempt, self.config.max_attempts, ip, err
                ),
            }
        }
        None
    }

    async fn fetch_once(&self, client: &BoundClient, url: &str) -> Result<Value, FetchError> {
        let response = client.get(url).await?;
        let status = response.status();
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status,
                snippet: snippet(&String::from_utf8_lossy(&body)),
            });
        }

        Ok(decode_payload(&body, &content_encoding)?)
    }
}
