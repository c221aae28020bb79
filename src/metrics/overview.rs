//! Account-wide overview derived from per-endpoint metrics.

use super::aggregate::DerivedMetrics;
use super::alerts::{count_since_midnight, AlertView};
use crate::model::{AnalyticsOverview, Endpoint, Status};

use chrono::{DateTime, TimeZone};

/// Derive an overview locally.
///
/// Global uptime and response time are the mean of the per-endpoint values
/// over endpoints that have them; endpoints without data do not count as zero.
pub fn derive_overview<Tz: TimeZone>(
    endpoints: &[Endpoint],
    metrics: &[DerivedMetrics],
    alerts: &[AlertView],
    now: &DateTime<Tz>,
) -> AnalyticsOverview {
    AnalyticsOverview {
        total_monitors: endpoints.len() as u64,
        active_monitors: endpoints.iter().filter(|e| e.is_active).count() as u64,
        uptime_percent: mean(metrics.iter().filter_map(|m| m.uptime_percentage)).unwrap_or(0.0),
        avg_response_time: mean(metrics.iter().filter_map(|m| m.avg_response_time)).unwrap_or(0.0),
        alerts_today: count_since_midnight(alerts, now) as u64,
        monitors_up: endpoints.iter().filter(|e| e.status == Status::Up).count() as u64,
        monitors_down: endpoints.iter().filter(|e| e.status == Status::Down).count() as u64,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CheckKind;
    use chrono::Utc;

    fn endpoint(id: i64, status: Status, is_active: bool) -> Endpoint {
        Endpoint {
            id,
            user_id: None,
            url: format!("https://{}.example.com", id),
            method: None,
            kind: CheckKind::Http,
            interval_secs: Some(60),
            is_active,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_derive_overview_skips_endpoints_without_data() {
        let endpoints = vec![
            endpoint(1, Status::Up, true),
            endpoint(2, Status::Down, true),
            endpoint(3, Status::Unknown, false),
        ];

        let mut with_data = DerivedMetrics::no_data(&endpoints[0]);
        with_data.uptime_percentage = Some(90.0);
        with_data.avg_response_time = Some(200.0);
        with_data.total_checks = 10;

        let mut partial = DerivedMetrics::no_data(&endpoints[1]);
        partial.uptime_percentage = Some(50.0);
        partial.total_checks = 4;

        let metrics = vec![with_data, partial, DerivedMetrics::no_data(&endpoints[2])];
        let overview = derive_overview(&endpoints, &metrics, &[], &Utc::now());

        assert_eq!(overview.total_monitors, 3);
        assert_eq!(overview.active_monitors, 2);
        assert_eq!(overview.monitors_up, 1);
        assert_eq!(overview.monitors_down, 1);
        assert_eq!(overview.uptime_percent, 70.0);
        assert_eq!(overview.avg_response_time, 200.0);
        assert_eq!(overview.alerts_today, 0);
    }

    #[test]
    fn test_empty_overview() {
        let overview = derive_overview(&[], &[], &[], &Utc::now());
        assert_eq!(overview, AnalyticsOverview::default());
    }
}
