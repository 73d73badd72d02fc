//! HTTP client bound to a request identity
//!
//! Builds a `reqwest` client pinned to an identity's source address and
//! carrying its header fingerprint. The client retries a small, fixed set of
//! gateway errors (502/503/504) in-session with exponential backoff; every
//! other failure is returned to the caller, whose attempt loop owns it.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::infrastructure::identity::Identity;

/// Knobs of the bound client, taken from the crawler configuration.
#[derive(Debug, Clone)]
pub struct BoundClientConfig {
    pub timeout_seconds: u64,
    pub status_retries: u32,
    pub status_backoff_base_secs: f64,
}

impl Default for BoundClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            status_retries: 2,
            status_backoff_base_secs: 0.3,
        }
    }
}

/// A request-execution context pinned to one identity.
///
/// Every outgoing connection originates from the identity's source address
/// (when one is configured) and carries its headers. Binding to an address
/// not assignable on this host surfaces as a connection error on first use.
pub struct BoundClient {
    client: Client,
    config: BoundClientConfig,
    user_agent: Option<String>,
}

impl BoundClient {
    pub fn new(identity: &Identity, config: BoundClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &identity.headers {
            // Accept-Encoding is left to the transport so it only advertises
            // codings it can transparently decode.
            if name.eq_ignore_ascii_case("accept-encoding") {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name: {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(ip) = identity.source_ip {
            builder = builder.local_address(ip);
        }

        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            user_agent: identity.user_agent().map(str::to_string),
        })
    }

    /// GET with built-in retry on 502/503/504 only.
    ///
    /// Network errors propagate immediately; any other status is returned to
    /// the caller as-is for its own attempt loop to judge.
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        let mut tries = 0u32;
        loop {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let gateway_error = matches!(
                status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            );
            if gateway_error && tries < self.config.status_retries {
                tries += 1;
                let delay = self.config.status_backoff_base_secs * 2f64.powi(tries as i32 - 1);
                debug!(
                    "gateway error {} for {}, retrying in {:.1}s ({}/{})",
                    status, url, delay, tries, self.config.status_retries
                );
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                continue;
            }
            return Ok(response);
        }
    }

    /// The user-agent this client sends, carried over to image downloads.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::IdentityConfig;
    use crate::infrastructure::identity::IdentityPool;

    #[test]
    fn builds_from_default_identity() {
        let pool = IdentityPool::from_config(&IdentityConfig::default()).unwrap();
        let identity = pool.pick();
        let client = BoundClient::new(&identity, BoundClientConfig::default()).unwrap();
        assert!(client.user_agent().is_some());
    }

    #[test]
    fn rejects_headers_with_invalid_values() {
        let identity = Identity {
            source_ip: None,
            headers: vec![("accept".into(), "line\nbreak".into())],
        };
        assert!(BoundClient::new(&identity, BoundClientConfig::default()).is_err());
    }

    #[test]
    fn binds_to_loopback_source_address() {
        let identity = Identity {
            source_ip: Some("127.0.0.1".parse().unwrap()),
            headers: vec![("user-agent".into(), "test".into())],
        };
        // Construction succeeds; an unassignable address only fails on connect.
        assert!(BoundClient::new(&identity, BoundClientConfig::default()).is_ok());
    }
}
