//! Alert classifier.

use super::relative::relative_label;
use crate::model::normalize::{integer, text, timestamp, token};
use crate::model::{EndpointId, RawAlert};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// What an alert event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Up,
    Down,
    Slow,
    Warning,
    Unknown,
}

impl AlertKind {
    pub fn from_token(token: &str) -> Self {
        match token {
            "up" => AlertKind::Up,
            "down" => AlertKind::Down,
            "slow" => AlertKind::Slow,
            "warning" => AlertKind::Warning,
            _ => AlertKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Severity depends on the alert kind alone.
    pub fn for_kind(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Down => Severity::High,
            AlertKind::Slow => Severity::Medium,
            AlertKind::Up | AlertKind::Warning | AlertKind::Unknown => Severity::Low,
        }
    }
}

/// Lifecycle of an alert event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    #[default]
    Resolved,
}

impl AlertStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "active" => AlertStatus::Active,
            _ => AlertStatus::Resolved,
        }
    }
}

/// Display-ready alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub id: Option<i64>,
    pub endpoint_id: Option<EndpointId>,
    pub url: Option<String>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub status: AlertStatus,
    pub timestamp: Option<DateTime<Utc>>,
    pub time_label: Option<String>,
}

/// Classify one raw alert record.
pub fn classify(raw: &RawAlert, now: DateTime<Utc>) -> AlertView {
    let kind = token(&raw.kind)
        .map(AlertKind::from_token)
        .unwrap_or(AlertKind::Unknown);
    let ts = timestamp(&raw.timestamp);

    AlertView {
        id: integer(&raw.id),
        endpoint_id: integer(&raw.monitor_id),
        url: text(&raw.url),
        kind,
        severity: Severity::for_kind(kind),
        message: text(&raw.message).unwrap_or_default(),
        status: token(&raw.status)
            .map(AlertStatus::from_token)
            .unwrap_or_default(),
        timestamp: ts,
        time_label: ts.map(|t| relative_label(t, now)),
    }
}

/// Classify a batch of raw alert records, preserving order.
pub fn classify_all(raws: &[RawAlert], now: DateTime<Utc>) -> Vec<AlertView> {
    raws.iter().map(|raw| classify(raw, now)).collect()
}

/// Count alerts raised since local midnight of `now`'s calendar day.
///
/// This is a calendar-date comparison in `now`'s time zone, not a rolling
/// 24 hour window. Alerts without a timestamp are not counted.
pub fn count_since_midnight<Tz: TimeZone>(alerts: &[AlertView], now: &DateTime<Tz>) -> usize {
    let today = now.date_naive();
    let tz = now.timezone();

    alerts
        .iter()
        .filter_map(|a| a.timestamp)
        .filter(|ts| ts.with_timezone(&tz).date_naive() >= today)
        .count()
}

/// Selection criteria for the alerts view.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub status: Option<AlertStatus>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &AlertView) -> bool {
        self.severity.map_or(true, |s| alert.severity == s)
            && self.status.map_or(true, |s| alert.status == s)
    }

    pub fn apply<'a>(&self, alerts: &'a [AlertView]) -> Vec<&'a AlertView> {
        alerts.iter().filter(|a| self.matches(a)).collect()
    }
}
