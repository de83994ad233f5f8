use std::{error::Error, net::IpAddr, time::Duration};

use reqwest::Url;

use crate::config::FetchConfig;
use crate::error::AppError;

/// Transport seam for the preview pipeline. Tests swap in a stub that serves
/// fixture HTML and counts calls.
pub trait PageFetcher: Send + Sync {
    /// GET the page body. Timeouts, connection failures, non-success statuses
    /// and policy rejections are all fatal for the whole preview operation.
    fn fetch_page(&self, url: &str) -> Result<String, AppError>;

    /// HEAD probe used only for /favicon.ico discovery. Failure means
    /// "favicon absent", never an error.
    fn head_exists(&self, url: &str) -> bool;

    /// Best-effort byte fetch for card rendering (preview image, favicon).
    fn fetch_bytes(&self, url: &str) -> Option<Vec<u8>>;
}

fn is_ip_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

fn is_private_ip(host: &str) -> bool {
    use std::net::ToSocketAddrs;

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_ip_private(&ip);
    }

    if let Ok(addrs) = (host, 80).to_socket_addrs() {
        for addr in addrs {
            if is_ip_private(&addr.ip()) {
                return true;
            }
        }
    }

    false
}

fn validate_url_policy(url_parsed: &Url, config: &FetchConfig) -> Result<(), AppError> {
    if !config
        .allowed_schemes
        .iter()
        .any(|s| s == url_parsed.scheme())
    {
        return Err(AppError::Fetch(format!(
            "URL scheme '{}' not allowed",
            url_parsed.scheme()
        )));
    }

    let host = url_parsed.host_str().unwrap_or_default();

    if config.blocked_hosts.iter().any(|h| h == host) {
        return Err(AppError::Fetch(format!("host '{host}' is blocked")));
    }

    if config.block_private_ips && is_private_ip(host) {
        return Err(AppError::Fetch(format!(
            "host '{host}' resolves to a private IP"
        )));
    }

    Ok(())
}

/// Unwrap reqwest's error chain down to the root cause for logging.
fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

pub struct HttpFetcher {
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn client(&self, timeout: Duration) -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(10))
            .build()
            .unwrap()
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, AppError> {
        let url_parsed = Url::parse(url)
            .map_err(|err| AppError::Fetch(format!("{url}: invalid URL: {err}")))?;
        validate_url_policy(&url_parsed, &self.config)?;

        let host = url_parsed.host_str().unwrap_or_default();
        let path = url_parsed.path();
        let iden = format!("{host}{path}");

        log::debug!("{iden}: requesting");

        let client = self.client(Duration::from_secs(self.config.timeout_secs));
        let resp = client
            .get(url)
            .send()
            .map_err(|err| AppError::Fetch(format!("{iden}: {}", get_error(&err))))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!("{iden}: unexpected status {status}")));
        }

        let bytes = resp
            .bytes()
            .map_err(|err| AppError::Fetch(format!("{iden}: {}", get_error(&err))))?;

        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    fn head_exists(&self, url: &str) -> bool {
        let url_parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };
        if validate_url_policy(&url_parsed, &self.config).is_err() {
            return false;
        }

        let client = self.client(Duration::from_secs(self.config.probe_timeout_secs));
        match client.head(url).send() {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                log::debug!("{url}: probe failed: {}", get_error(&err));
                false
            }
        }
    }

    fn fetch_bytes(&self, url: &str) -> Option<Vec<u8>> {
        let url_parsed = Url::parse(url).ok()?;
        validate_url_policy(&url_parsed, &self.config).ok()?;

        let client = self.client(Duration::from_secs(self.config.timeout_secs));
        let resp = match client.get(url).send() {
            Ok(r) => r,
            Err(err) => {
                log::debug!("{url}: {}", get_error(&err));
                return None;
            }
        };

        if !resp.status().is_success() {
            return None;
        }

        resp.bytes().ok().map(|b| b.into())
    }
}
