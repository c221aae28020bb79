//! Observation normalizer.
//!
//! Turns untrusted backend records into canonical types. Every field may be
//! absent, null, a bare scalar, or a nullable wrapper object such as
//! `{"monitor_status": "up", "valid": true}` or `{"String": "GET", "Valid": true}`.
//! Nothing here returns an error: unusable input degrades to `None`,
//! [`Status::Unknown`], or the documented default.

use super::models::*;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Inner-value keys used by the nullable wrappers the backend emits.
const WRAPPER_VALUE_KEYS: &[&str] = &[
    "value",
    "Value",
    "monitor_status",
    "String",
    "Int32",
    "Int64",
    "Float64",
    "Bool",
    "Time",
];

const WRAPPER_VALID_KEYS: &[&str] = &["valid", "Valid"];

/// Resolve a possibly-wrapped value to its payload.
///
/// Returns `None` for null, and for wrappers whose validity flag is not `true`.
pub fn unwrap_nullable(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let Some(valid) = WRAPPER_VALID_KEYS.iter().find_map(|k| map.get(*k)) else {
                return Some(value);
            };
            if valid.as_bool() != Some(true) {
                return None;
            }
            if let Some(inner) = WRAPPER_VALUE_KEYS.iter().find_map(|k| map.get(*k)) {
                return non_null(inner);
            }
            let mut rest = map
                .iter()
                .filter(|(k, _)| !WRAPPER_VALID_KEYS.contains(&k.as_str()));
            match (rest.next(), rest.next()) {
                (Some((_, inner)), None) => non_null(inner),
                _ => None,
            }
        }
        other => Some(other),
    }
}

fn non_null(value: &Value) -> Option<&Value> {
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}

/// A non-empty string token.
pub fn token(value: &Value) -> Option<&str> {
    unwrap_nullable(value)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Normalize a polymorphic status field. Total: every input maps to a status.
pub fn normalize_status(value: &Value) -> Status {
    token(value).map(Status::from_token).unwrap_or_default()
}

/// Normalize a polymorphic check-kind field, defaulting to `http`.
pub fn normalize_kind(value: &Value) -> CheckKind {
    token(value)
        .and_then(CheckKind::from_token)
        .unwrap_or_default()
}

/// An owned, non-empty string.
pub fn text(value: &Value) -> Option<String> {
    token(value).map(str::to_string)
}

/// An integer from a number or numeric string.
pub fn integer(value: &Value) -> Option<i64> {
    match unwrap_nullable(value)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A finite float from a number or numeric string.
pub fn float(value: &Value) -> Option<f64> {
    let parsed = match unwrap_nullable(value)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// A boolean from a JSON bool or a `"true"`/`"false"` string.
pub fn flag(value: &Value) -> Option<bool> {
    match unwrap_nullable(value)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A timestamp from a string field; see [`parse_timestamp`].
pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    unwrap_nullable(value)
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

fn zone_marker() -> Option<&'static Regex> {
    static ZONE: OnceLock<Option<Regex>> = OnceLock::new();
    ZONE.get_or_init(|| Regex::new(r"(?:[Zz]|([+-]\d{2}):?(\d{2})?)$").ok())
        .as_ref()
}

/// Parse a backend timestamp.
///
/// The backend writes UTC wall-clock times without an offset, so a timestamp
/// with no zone marker is read as UTC. A space date/time separator, compact
/// offsets (`-0500`, `+02`) and a bare calendar date are also accepted.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replacen(' ', "T", 1);
    let Some((_, time)) = normalized.split_once(|c: char| c == 'T' || c == 't') else {
        return NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    };

    let zoned = match zone_marker().and_then(|re| re.captures(time)) {
        Some(caps) => match caps.get(1) {
            Some(hours) => {
                let minutes = caps.get(2).map_or("00", |m| m.as_str());
                let zone_start = normalized.len() - caps[0].len();
                format!("{}{}:{}", &normalized[..zone_start], hours.as_str(), minutes)
            }
            None => normalized.clone(),
        },
        None => format!("{normalized}Z"),
    };

    DateTime::parse_from_rfc3339(&zoned)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize an endpoint record. Records without a usable id are dropped.
pub fn normalize_endpoint(raw: &RawEndpoint) -> Option<Endpoint> {
    let id = integer(&raw.id)?;

    Some(Endpoint {
        id,
        user_id: text(&raw.user_id),
        url: text(&raw.url).unwrap_or_default(),
        method: text(&raw.method),
        kind: normalize_kind(&raw.kind),
        interval_secs: integer(&raw.interval)
            .and_then(|i| u32::try_from(i).ok())
            .map(|i| i.max(MIN_INTERVAL_SECS)),
        is_active: flag(&raw.is_active).unwrap_or(false),
        status: normalize_status(&raw.status),
        created_at: timestamp(&raw.created_at),
        updated_at: timestamp(&raw.updated_at),
    })
}

/// Normalize an observation record.
///
/// `endpoint_id` is used when the record does not name its endpoint.
pub fn normalize_observation(raw: &RawObservation, endpoint_id: EndpointId) -> Observation {
    Observation {
        id: integer(&raw.id),
        endpoint_id: integer(&raw.monitor_id).unwrap_or(endpoint_id),
        status_code: integer(&raw.status_code),
        response_time_ms: float(&raw.response_time),
        dns_ok: flag(&raw.dns_ok),
        ssl_ok: flag(&raw.ssl_ok),
        content_ok: flag(&raw.content_ok),
        error_message: text(&raw.error_message),
        checked_at: timestamp(&raw.checked_at).or_else(|| timestamp(&raw.created_at)),
    }
}

/// Normalize a list of observation records, skipping entries that are not objects.
pub fn normalize_observations(values: &Value, endpoint_id: EndpointId) -> Vec<Observation> {
    let Some(items) = unwrap_nullable(values).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| serde_json::from_value::<RawObservation>(item.clone()).ok())
        .map(|raw| normalize_observation(&raw, endpoint_id))
        .collect()
}

/// Unwrap a total count that may be a scalar or a single-element array.
///
/// Missing, empty, negative or non-numeric totals read as `0`.
pub fn normalize_total(value: &Value) -> u64 {
    let scalar = match unwrap_nullable(value) {
        Some(Value::Array(items)) => items.first().and_then(integer),
        Some(other) => integer(other),
        None => None,
    };
    scalar.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

/// Normalize a paged observation response.
pub fn normalize_log_page(raw: &RawLogPage, endpoint_id: EndpointId) -> LogPage {
    let field = |key: &str| raw.pagination.get(key).unwrap_or(&Value::Null);
    let count = |key: &str| integer(field(key)).and_then(|n| u64::try_from(n).ok());

    LogPage {
        observations: normalize_observations(&raw.logs, endpoint_id),
        limit: count("limit"),
        offset: count("offset"),
        total: normalize_total(field("total")),
        has_more: flag(field("hasMore")).or_else(|| flag(field("has_more"))),
    }
}

/// Normalize the analytics overview. Missing fields read as zero.
pub fn normalize_overview(value: &Value) -> AnalyticsOverview {
    let field = |key: &str| value.get(key).unwrap_or(&Value::Null);
    let count = |key: &str| {
        integer(field(key))
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0)
    };
    let ratio = |key: &str| float(field(key)).unwrap_or(0.0);

    AnalyticsOverview {
        total_monitors: count("total_monitors"),
        active_monitors: count("active_monitors"),
        uptime_percent: ratio("uptime_percent").clamp(0.0, 100.0),
        avg_response_time: ratio("avg_response_time").max(0.0),
        alerts_today: count("alerts_today"),
        monitors_up: count("monitors_up"),
        monitors_down: count("monitors_down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_status_shapes() {
        assert_eq!(normalize_status(&json!({"monitor_status": "down", "valid": true})), Status::Down);
        assert_eq!(normalize_status(&json!({"monitor_status": "down", "valid": false})), Status::Unknown);
        assert_eq!(normalize_status(&json!("up")), Status::Up);
        assert_eq!(normalize_status(&Value::Null), Status::Unknown);
        assert_eq!(normalize_status(&json!("")), Status::Unknown);
        assert_eq!(normalize_status(&json!("Down")), Status::Unknown);
        assert_eq!(normalize_status(&json!(42)), Status::Unknown);
        assert_eq!(normalize_status(&json!({"value": "up", "valid": true})), Status::Up);
        assert_eq!(normalize_status(&json!({"monitor_status": "up"})), Status::Unknown);
        assert_eq!(normalize_status(&json!(["up"])), Status::Unknown);
    }

    #[test]
    fn test_kind_defaults_to_http() {
        assert_eq!(normalize_kind(&json!("tcp")), CheckKind::Tcp);
        assert_eq!(normalize_kind(&json!({"String": "keyword", "Valid": true})), CheckKind::Keyword);
        assert_eq!(normalize_kind(&json!({"String": "ping", "Valid": false})), CheckKind::Http);
        assert_eq!(normalize_kind(&json!("smtp")), CheckKind::Http);
        assert_eq!(normalize_kind(&Value::Null), CheckKind::Http);
    }

    #[test]
    fn test_wrapper_with_single_unknown_key() {
        assert_eq!(integer(&json!({"Count": 7, "Valid": true})), Some(7));
        assert_eq!(integer(&json!({"A": 1, "B": 2, "Valid": true})), None);
        assert_eq!(integer(&json!({"Int32": null, "Valid": true})), None);
    }

    #[test]
    fn test_scalar_helpers() {
        assert_eq!(integer(&json!("200")), Some(200));
        assert_eq!(integer(&json!(200.0)), Some(200));
        assert_eq!(integer(&json!(200.5)), None);
        assert_eq!(float(&json!("12.5")), Some(12.5));
        assert_eq!(flag(&json!({"Bool": true, "Valid": true})), Some(true));
        assert_eq!(flag(&json!("yes")), None);
        assert_eq!(text(&json!("")), None);
    }

    #[test]
    fn test_naive_timestamps_are_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 14, 5, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-10T14:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10 14:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T14:05:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T16:05:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-10T09:05:00-0500"), Some(expected));
    }

    #[test]
    fn test_timestamp_edge_shapes() {
        let with_micros = parse_timestamp("2024-03-10T14:05:00.123456").unwrap();
        assert_eq!(with_micros.timestamp_subsec_micros(), 123456);

        assert_eq!(
            parse_timestamp("2024-03-10"),
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(timestamp(&json!({"Time": "2024-03-10T14:05:00", "Valid": false})), None);
    }

    #[test]
    fn test_normalize_endpoint() {
        let raw: RawEndpoint = serde_json::from_value(json!({
            "id": 7,
            "user_id": "b1c2",
            "url": "https://example.com",
            "method": {"String": "GET", "Valid": true},
            "type": {"String": "", "Valid": false},
            "interval": 5,
            "status": {"monitor_status": "up", "valid": true},
            "is_active": true,
            "created_at": "2024-03-10T14:05:00",
        }))
        .unwrap();

        let endpoint = normalize_endpoint(&raw).unwrap();
        assert_eq!(endpoint.id, 7);
        assert_eq!(endpoint.method.as_deref(), Some("GET"));
        assert_eq!(endpoint.kind, CheckKind::Http);
        assert_eq!(endpoint.interval_secs, Some(MIN_INTERVAL_SECS));
        assert_eq!(endpoint.status, Status::Up);
        assert!(endpoint.is_active);
        assert!(endpoint.created_at.is_some());
        assert!(endpoint.updated_at.is_none());
    }

    #[test]
    fn test_endpoint_without_id_is_dropped() {
        let raw: RawEndpoint = serde_json::from_value(json!({"url": "https://example.com"})).unwrap();
        assert!(normalize_endpoint(&raw).is_none());
    }

    #[test]
    fn test_normalize_observation() {
        let raw: RawObservation = serde_json::from_value(json!({
            "id": 91,
            "status_code": null,
            "response_time": 231.4,
            "dns_ok": true,
            "ssl_ok": {"Bool": false, "Valid": true},
            "error_message": "connection reset",
            "created_at": "2024-03-10T14:05:00",
        }))
        .unwrap();

        let obs = normalize_observation(&raw, 3);
        assert_eq!(obs.endpoint_id, 3);
        assert_eq!(obs.status_code, None);
        assert_eq!(obs.response_time_ms, Some(231.4));
        assert_eq!(obs.dns_ok, Some(true));
        assert_eq!(obs.ssl_ok, Some(false));
        assert_eq!(obs.content_ok, None);
        assert_eq!(obs.error_message.as_deref(), Some("connection reset"));
        assert!(obs.checked_at.is_some());
    }

    #[test]
    fn test_normalize_observations_skips_garbage() {
        let logs = json!([{"id": 1, "status_code": 200}, "oops", 5, {"id": 2}]);
        let observations = normalize_observations(&logs, 9);
        assert_eq!(observations.len(), 2);
        assert!(normalize_observations(&Value::Null, 9).is_empty());
    }

    #[test]
    fn test_total_shapes() {
        assert_eq!(normalize_total(&json!([42])), 42);
        assert_eq!(normalize_total(&json!(42)), 42);
        assert_eq!(normalize_total(&json!([])), 0);
        assert_eq!(normalize_total(&json!([0])), 0);
        assert_eq!(normalize_total(&Value::Null), 0);
        assert_eq!(normalize_total(&json!(-4)), 0);
        assert_eq!(normalize_total(&json!(["many"])), 0);
    }

    #[test]
    fn test_normalize_log_page() {
        let raw: RawLogPage = serde_json::from_value(json!({
            "logs": [{"id": 1, "status_code": 200, "checked_at": "2024-03-10T14:05:00"}],
            "pageination": {"limit": 20, "offset": 40, "total": [41], "hasMore": false},
        }))
        .unwrap();

        let page = normalize_log_page(&raw, 4);
        assert_eq!(page.observations.len(), 1);
        assert_eq!(page.limit, Some(20));
        assert_eq!(page.offset, Some(40));
        assert_eq!(page.total, 41);
        assert_eq!(page.has_more, Some(false));
    }

    #[test]
    fn test_normalize_overview_tolerates_gaps() {
        let overview = normalize_overview(&json!({
            "total_monitors": 4,
            "uptime_percent": 120.0,
            "avg_response_time": null,
            "monitors_up": "3",
        }));
        assert_eq!(overview.total_monitors, 4);
        assert_eq!(overview.uptime_percent, 100.0);
        assert_eq!(overview.avg_response_time, 0.0);
        assert_eq!(overview.monitors_up, 3);
        assert_eq!(overview.alerts_today, 0);
    }
}
