//! Configuration module for UptimeView.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Gateway and aggregation configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// HTTP port for the JSON gateway (default: 8090)
    pub http_port: u16,
    /// Base URL of the monitoring backend, including the API version prefix
    pub api_url: String,
    /// Bearer token attached to backend requests
    pub api_token: Option<String>,
    /// Number of most recent observations used per endpoint (default: 50)
    pub window_size: usize,
    /// Maximum number of in-flight observation fetches (default: 8)
    pub max_concurrency: usize,
    /// Per-request timeout enforced by the transport (default: 10s)
    pub request_timeout: Duration,
    /// Number of alert records requested (default: 50)
    pub alert_limit: usize,
    /// Default page size for observation history (default: 20)
    pub page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            http_port: 8090,
            api_url: "http://localhost:8080/v1".to_string(),
            api_token: None,
            window_size: 50,
            max_concurrency: 8,
            request_timeout: Duration::from_secs(10),
            alert_limit: 50,
            page_size: 20,
        }
    }
}

impl ViewConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPTIMEVIEW_HTTP_PORT`: gateway port (default: 8090)
    /// - `UPTIMEVIEW_API_URL`: backend base URL (default: "http://localhost:8080/v1")
    /// - `UPTIMEVIEW_API_TOKEN`: bearer token (default: none)
    /// - `UPTIMEVIEW_WINDOW_SIZE`: observation window (default: 50)
    /// - `UPTIMEVIEW_MAX_CONCURRENCY`: fan-out limit (default: 8)
    /// - `UPTIMEVIEW_REQUEST_TIMEOUT_SECS`: request timeout (default: 10)
    /// - `UPTIMEVIEW_ALERT_LIMIT`: alerts per fetch (default: 50)
    /// - `UPTIMEVIEW_PAGE_SIZE`: history page size (default: 20)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Values that are missing or fail to parse keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "UPTIMEVIEW_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(url) = lookup("UPTIMEVIEW_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                cfg.api_url = url.to_string();
            }
        }

        cfg.api_token = lookup("UPTIMEVIEW_API_TOKEN").filter(|t| !t.trim().is_empty());

        if let Some(window) = parse_var::<usize, _>(&lookup, "UPTIMEVIEW_WINDOW_SIZE") {
            cfg.window_size = window.max(1);
        }

        if let Some(limit) = parse_var::<usize, _>(&lookup, "UPTIMEVIEW_MAX_CONCURRENCY") {
            cfg.max_concurrency = limit.max(1);
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "UPTIMEVIEW_REQUEST_TIMEOUT_SECS") {
            if secs > 0 {
                cfg.request_timeout = Duration::from_secs(secs);
            }
        }

        // The backend clamps anything outside 1..=100 back to its own default.
        if let Some(limit) = parse_var::<usize, _>(&lookup, "UPTIMEVIEW_ALERT_LIMIT") {
            cfg.alert_limit = limit.clamp(1, 100);
        }

        if let Some(size) = parse_var::<usize, _>(&lookup, "UPTIMEVIEW_PAGE_SIZE") {
            cfg.page_size = size.max(1);
        }

        cfg
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
