//! Request identity pools
//!
//! An identity is the combination of a source IP address and a header
//! fingerprint, used to make each request attempt look like a distinct
//! client. Both pools are static configuration data: header sets ship with
//! built-in browser fingerprints and can be overridden from the config file,
//! source IPs are host-specific and configured explicitly.

use std::net::IpAddr;

use anyhow::{Context, Result};

use crate::infrastructure::config::IdentityConfig;

/// One disguise: a source address plus a browser-like header set.
#[derive(Debug, Clone)]
pub struct Identity {
    pub source_ip: Option<IpAddr>,
    pub headers: Vec<(String, String)>,
}

impl Identity {
    /// Remove any authorization header, case-insensitively. Applied from the
    /// second attempt on, when a first-attempt credential is presumed
    /// revoked or rate-limited.
    pub fn drop_authorization(&mut self) {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
    }

    /// The user-agent carried by this identity, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.as_str())
    }

    /// Label for log lines: the bound source IP or "default".
    pub fn ip_label(&self) -> String {
        self.source_ip
            .map_or_else(|| "default".to_string(), |ip| ip.to_string())
    }
}

/// Static pools of header sets and source IPs; supplies one of each per
/// request attempt, chosen uniformly at random.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    source_ips: Vec<IpAddr>,
    header_sets: Vec<Vec<(String, String)>>,
}

impl IdentityPool {
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let source_ips = config
            .source_ips
            .iter()
            .map(|ip| {
                ip.parse::<IpAddr>()
                    .with_context(|| format!("invalid source IP in configuration: {ip}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let header_sets = match &config.header_sets {
            Some(sets) if !sets.is_empty() => sets
                .iter()
                .map(|set| {
                    set.iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                })
                .collect(),
            _ => default_header_sets(),
        };

        Ok(Self {
            source_ips,
            header_sets,
        })
    }

    /// Fresh uniform random choice of header set and source IP. Callers pick
    /// anew on every attempt; a failed identity is never deliberately reused.
    pub fn pick(&self) -> Identity {
        let headers = self.header_sets[fastrand::usize(..self.header_sets.len())].clone();
        let source_ip = if self.source_ips.is_empty() {
            None
        } else {
            Some(self.source_ips[fastrand::usize(..self.source_ips.len())])
        };
        Identity { source_ip, headers }
    }

    pub fn source_ip_count(&self) -> usize {
        self.source_ips.len()
    }

    pub fn header_set_count(&self) -> usize {
        self.header_sets.len()
    }
}

/// Built-in header fingerprints mirroring the mobile web client.
///
/// Accept-Encoding is intentionally absent: the transport layer negotiates
/// compression it can actually decode (see `BoundClient`).
fn default_header_sets() -> Vec<Vec<(String, String)>> {
    let chrome_ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";
    let iphone_ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";

    vec![
        vec![
            ("accept".into(), "application/json, text/plain, */*".into()),
            (
                "accept-language".into(),
                "en-US,en;q=0.9,fa;q=0.8,tr;q=0.7,ru;q=0.6".into(),
            ),
            (
                "content-type".into(),
                "application/x-www-form-urlencoded".into(),
            ),
            (
                "cookie".into(),
                format!("UUID={}", crate::infrastructure::config::snappfood::UDID),
            ),
            ("priority".into(), "u=1, i".into()),
            ("referer".into(), "https://m.snappfood.ir/".into()),
            (
                "sec-ch-ua".into(),
                "\"Not)A;Brand\";v=\"8\", \"Chromium\";v=\"138\", \"Google Chrome\";v=\"138\""
                    .into(),
            ),
            ("sec-ch-ua-mobile".into(), "?0".into()),
            ("sec-ch-ua-platform".into(), "\"Windows\"".into()),
            ("sec-fetch-dest".into(), "empty".into()),
            ("sec-fetch-mode".into(), "cors".into()),
            ("sec-fetch-site".into(), "same-origin".into()),
            ("user-agent".into(), chrome_ua.into()),
        ],
        vec![
            ("accept".into(), "application/json, text/plain, */*".into()),
            (
                "accept-language".into(),
                "en-US,en;q=0.9,fa;q=0.8,tr;q=0.7,ru;q=0.6".into(),
            ),
            ("cache-control".into(), "no-cache".into()),
            (
                "cookie".into(),
                format!("UUID={}", crate::infrastructure::config::snappfood::UDID),
            ),
            ("origin".into(), "https://m.snappfood.ir".into()),
            ("pragma".into(), "no-cache".into()),
            ("priority".into(), "u=1, i".into()),
            ("referer".into(), "https://m.snappfood.ir/".into()),
            ("sec-fetch-dest".into(), "empty".into()),
            ("sec-fetch-mode".into(), "cors".into()),
            ("sec-fetch-site".into(), "same-site".into()),
            ("user-agent".into(), iphone_ua.into()),
            ("x-is-bonyan".into(), "true".into()),
        ],
        vec![
            ("accept".into(), "application/json, text/plain, */*".into()),
            (
                "accept-language".into(),
                "en-US,en;q=0.9,fa;q=0.8,tr;q=0.7,ru;q=0.6".into(),
            ),
            ("cache-control".into(), "no-cache".into()),
            (
                "cookie".into(),
                format!("UUID={}", crate::infrastructure::config::snappfood::UDID),
            ),
            ("origin".into(), "https://m.snappfood.ir".into()),
            ("pragma".into(), "no-cache".into()),
            ("priority".into(), "u=1, i".into()),
            ("referer".into(), "https://m.snappfood.ir/".into()),
            (
                "sec-ch-ua".into(),
                "\"Not)A;Brand\";v=\"8\", \"Chromium\";v=\"138\", \"Google Chrome\";v=\"138\""
                    .into(),
            ),
            ("sec-ch-ua-mobile".into(), "?0".into()),
            ("sec-ch-ua-platform".into(), "\"Windows\"".into()),
            ("sec-fetch-dest".into(), "empty".into()),
            ("sec-fetch-mode".into(), "cors".into()),
            ("sec-fetch-site".into(), "same-site".into()),
            ("user-agent".into(), chrome_ua.into()),
            ("x-is-bonyan".into(), "true".into()),
        ],
    ]
}
