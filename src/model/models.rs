//! Canonical and wire model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend identifier of a monitored endpoint.
pub type EndpointId = i64;

/// Smallest probe interval the backend accepts, in seconds.
pub const MIN_INTERVAL_SECS: u32 = 10;

/// Normalized live status of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
    #[default]
    Unknown,
}

impl Status {
    /// Map a status token. Matching is case-sensitive.
    pub fn from_token(token: &str) -> Self {
        match token {
            "up" => Status::Up,
            "down" => Status::Down,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "up",
            Status::Down => "down",
            Status::Unknown => "unknown",
        }
    }
}

/// The kind of probe the backend runs against an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    #[default]
    Http,
    Tcp,
    Ping,
    Keyword,
}

impl CheckKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "http" => Some(CheckKind::Http),
            "tcp" => Some(CheckKind::Tcp),
            "ping" => Some(CheckKind::Ping),
            "keyword" => Some(CheckKind::Keyword),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Http => "http",
            CheckKind::Tcp => "tcp",
            CheckKind::Ping => "ping",
            CheckKind::Keyword => "keyword",
        }
    }
}

/// A monitored target as owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub user_id: Option<String>,
    pub url: String,
    pub method: Option<String>,
    pub kind: CheckKind,
    pub interval_secs: Option<u32>,
    pub is_active: bool,
    pub status: Status,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One probe result for an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub id: Option<i64>,
    pub endpoint_id: EndpointId,
    pub status_code: Option<i64>,
    /// Response time in milliseconds, as reported.
    pub response_time_ms: Option<f64>,
    pub dns_ok: Option<bool>,
    pub ssl_ok: Option<bool>,
    pub content_ok: Option<bool>,
    pub error_message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl Observation {
    /// An empty observation for `endpoint_id`.
    pub fn empty(endpoint_id: EndpointId) -> Self {
        Self {
            id: None,
            endpoint_id,
            status_code: None,
            response_time_ms: None,
            dns_ok: None,
            ssl_ok: None,
            content_ok: None,
            error_message: None,
            checked_at: None,
        }
    }

    /// A check succeeded iff it produced a status code in `[200, 400)`.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..400).contains(&code))
    }

    /// Response time usable for averaging: present, finite and positive.
    pub fn usable_response_time(&self) -> Option<f64> {
        self.response_time_ms.filter(|rt| rt.is_finite() && *rt > 0.0)
    }
}

/// One page of an endpoint's observation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPage {
    pub observations: Vec<Observation>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub total: u64,
    /// Server-reported has-more flag, when the server sent one.
    pub has_more: Option<bool>,
}

/// Aggregate snapshot of the whole account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_monitors: u64,
    pub active_monitors: u64,
    pub uptime_percent: f64,
    pub avg_response_time: f64,
    pub alerts_today: u64,
    pub monitors_up: u64,
    pub monitors_down: u64,
}

// ============================================================================
// Wire types
//
// Every field is kept as a raw JSON value; the normalizer decides what it means.
// ============================================================================

/// Endpoint record as delivered by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEndpoint {
    pub id: Value,
    pub user_id: Value,
    pub url: Value,
    pub method: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub interval: Value,
    pub status: Value,
    pub is_active: Value,
    pub created_at: Value,
    pub updated_at: Value,
}

/// Observation record as delivered by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawObservation {
    pub id: Value,
    pub monitor_id: Value,
    pub status_code: Value,
    pub response_time: Value,
    pub dns_ok: Value,
    pub ssl_ok: Value,
    pub content_ok: Value,
    pub error_message: Value,
    pub checked_at: Value,
    pub created_at: Value,
}

/// Alert/event record as delivered by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAlert {
    pub id: Value,
    pub monitor_id: Value,
    pub url: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub message: Value,
    pub timestamp: Value,
    pub status: Value,
}

/// Paged observation response as delivered by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLogPage {
    pub logs: Value,
    #[serde(rename = "pageination", alias = "pagination")]
    pub pagination: Value,
}

// ============================================================================
// Mutations
// ============================================================================

/// Fields for creating or updating an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDraft {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(rename = "type", default)]
    pub kind: CheckKind,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_interval() -> u32 {
    60
}

fn default_active() -> bool {
    true
}

impl EndpointDraft {
    /// Check the draft against the backend's acceptance rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("url cannot be empty".to_string());
        }
        if self.interval < MIN_INTERVAL_SECS {
            return Err(format!(
                "interval {}s is below the minimum of {}s",
                self.interval, MIN_INTERVAL_SECS
            ));
        }
        Ok(())
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateEndpointRequest<'a> {
    pub url: &'a str,
    pub method: &'a str,
    #[serde(rename = "type")]
    pub kind: CheckKind,
    pub interval: u32,
    pub is_active: bool,
}

impl<'a> From<&'a EndpointDraft> for CreateEndpointRequest<'a> {
    fn from(draft: &'a EndpointDraft) -> Self {
        Self {
            url: &draft.url,
            method: &draft.method,
            kind: draft.kind,
            interval: draft.interval,
            is_active: draft.is_active,
        }
    }
}

/// Body of an update request.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateEndpointRequest<'a> {
    pub id: EndpointId,
    pub url: &'a str,
    pub method: &'a str,
    #[serde(rename = "type")]
    pub kind: CheckKind,
    pub interval: u32,
}

/// Body of a toggle request.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleEndpointRequest {
    pub id: EndpointId,
    pub is_active: bool,
}
