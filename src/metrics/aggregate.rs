//! Metrics aggregator: reduces an observation window into per-endpoint metrics.

use super::relative::relative_label;
use crate::model::{Endpoint, EndpointId, Observation, Status};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default number of observations in a window.
pub const DEFAULT_WINDOW: usize = 50;

/// Metrics derived from an endpoint's most recent observations.
///
/// `None` is the no-data sentinel and is never conflated with a computed zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub endpoint_id: EndpointId,
    /// The backend's live status; not derived from the window.
    pub status: Status,
    pub uptime_percentage: Option<f64>,
    pub avg_response_time: Option<f64>,
    pub last_check_label: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub total_checks: usize,
    pub successful_checks: usize,
    pub failed_checks: usize,
}

impl DerivedMetrics {
    /// Metrics for an endpoint with no observations available.
    pub fn no_data(endpoint: &Endpoint) -> Self {
        Self {
            endpoint_id: endpoint.id,
            status: endpoint.status,
            uptime_percentage: None,
            avg_response_time: None,
            last_check_label: None,
            last_checked_at: None,
            total_checks: 0,
            successful_checks: 0,
            failed_checks: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.total_checks > 0
    }
}

/// Computes [`DerivedMetrics`] over a bounded window.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    window: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Aggregator {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Aggregate `observations` for `endpoint`.
    ///
    /// Source ordering is not trusted: the window is rebuilt from the most
    /// recent observations by timestamp, and the last-check label comes from
    /// the maximum timestamp rather than the first element.
    pub fn aggregate(
        &self,
        endpoint: &Endpoint,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> DerivedMetrics {
        let window = self.select_window(observations);
        if window.is_empty() {
            return DerivedMetrics::no_data(endpoint);
        }

        let total = window.len();
        let successes = window.iter().filter(|o| o.is_success()).count();
        let uptime = 100.0 * successes as f64 / total as f64;

        let (rt_sum, rt_count) = window
            .iter()
            .filter_map(|o| o.usable_response_time())
            .fold((0.0, 0usize), |(sum, n), rt| (sum + rt, n + 1));
        let avg_response_time = if rt_count > 0 {
            Some(rt_sum / rt_count as f64)
        } else {
            None
        };

        let last_checked_at = window.iter().filter_map(|o| o.checked_at).max();

        DerivedMetrics {
            endpoint_id: endpoint.id,
            status: endpoint.status,
            uptime_percentage: Some(uptime.clamp(0.0, 100.0)),
            avg_response_time,
            last_check_label: last_checked_at.map(|ts| relative_label(ts, now)),
            last_checked_at,
            total_checks: total,
            successful_checks: successes,
            failed_checks: total - successes,
        }
    }

    /// The `window` most recent observations, newest first. Observations
    /// without a timestamp sort last.
    fn select_window<'a>(&self, observations: &'a [Observation]) -> Vec<&'a Observation> {
        let mut ordered: Vec<&Observation> = observations.iter().collect();
        ordered.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        ordered.truncate(self.window);
        ordered
    }
}
