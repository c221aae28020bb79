//! Dashboard module: fetch orchestration and history paging.
//!
//! [`Dashboard`] lists endpoints, then fetches an observation window for each
//! one through a bounded pool of in-flight requests and folds every completion
//! into shared state. Completions are tagged with a per-endpoint generation;
//! a result whose generation is no longer the latest is dropped.

mod generation;
mod pagination;

pub use generation::*;
pub use pagination::*;

use crate::api::{ApiError, LogQuery, Transport};
use crate::config::ViewConfig;
use crate::metrics::{
    classify_all, count_since_midnight, derive_overview, Aggregator, AlertView, DerivedMetrics,
};
use crate::model::{
    normalize_endpoint, normalize_log_page, normalize_overview, AnalyticsOverview, Endpoint,
    EndpointDraft, EndpointId, RawLogPage,
};

use chrono::{DateTime, Local, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of "now" for labels and day boundaries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// State of a list-level fetch (endpoints, alerts).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Ready,
    Failed { reason: String },
    /// The backend rejected the session; teardown belongs to the caller.
    Unauthorized,
}

impl LoadState {
    fn from_error(err: &ApiError) -> Self {
        match err {
            ApiError::Unauthorized => LoadState::Unauthorized,
            other => LoadState::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// State of one endpoint's observation fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum FetchState {
    Loading,
    Ready,
    Failed { reason: String },
}

/// An endpoint together with its derived metrics.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointView {
    pub endpoint: Endpoint,
    pub metrics: DerivedMetrics,
    pub fetch: FetchState,
}

/// Point-in-time copy of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub list: LoadState,
    pub endpoints: Vec<EndpointView>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    pub fn metrics(&self) -> Vec<DerivedMetrics> {
        self.endpoints.iter().map(|v| v.metrics.clone()).collect()
    }

    pub fn endpoint_list(&self) -> Vec<Endpoint> {
        self.endpoints.iter().map(|v| v.endpoint.clone()).collect()
    }
}

/// Classified alerts for the alerts view.
#[derive(Debug, Clone, Serialize)]
pub struct AlertsSnapshot {
    pub list: LoadState,
    pub alerts: Vec<AlertView>,
    pub alerts_today: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverviewSource {
    Backend,
    Derived,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewSnapshot {
    pub source: OverviewSource,
    pub overview: AnalyticsOverview,
}

#[derive(Debug)]
struct DashboardState {
    list: LoadState,
    order: Vec<EndpointId>,
    views: HashMap<EndpointId, EndpointView>,
    generations: GenerationTracker<EndpointId>,
    /// One key: the generation of the latest endpoint-list request.
    cycles: GenerationTracker<()>,
    refreshed_at: Option<DateTime<Utc>>,
    closed: bool,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            list: LoadState::Idle,
            order: Vec::new(),
            views: HashMap::new(),
            generations: GenerationTracker::new(),
            cycles: GenerationTracker::new(),
            refreshed_at: None,
            closed: false,
        }
    }
}

impl DashboardState {
    fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            list: self.list.clone(),
            endpoints: self
                .order
                .iter()
                .filter_map(|id| self.views.get(id).cloned())
                .collect(),
            refreshed_at: self.refreshed_at,
        }
    }
}

/// Tuning for a [`Dashboard`].
#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    pub window_size: usize,
    pub max_concurrency: usize,
    pub alert_limit: usize,
    pub page_size: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self::from(&ViewConfig::default())
    }
}

impl From<&ViewConfig> for DashboardOptions {
    fn from(cfg: &ViewConfig) -> Self {
        Self {
            window_size: cfg.window_size,
            max_concurrency: cfg.max_concurrency,
            alert_limit: cfg.alert_limit,
            page_size: cfg.page_size,
        }
    }
}

/// Fetch orchestrator holding the aggregate dashboard state.
pub struct Dashboard {
    transport: Arc<dyn Transport>,
    aggregator: Aggregator,
    options: DashboardOptions,
    clock: Clock,
    state: RwLock<DashboardState>,
}

impl Dashboard {
    pub fn new(transport: Arc<dyn Transport>, options: DashboardOptions) -> Self {
        Self::with_clock(transport, options, Arc::new(Utc::now))
    }

    /// Create a dashboard that reads time from `clock`.
    pub fn with_clock(transport: Arc<dyn Transport>, options: DashboardOptions, clock: Clock) -> Self {
        Self {
            transport,
            aggregator: Aggregator::new(options.window_size),
            options: DashboardOptions {
                max_concurrency: options.max_concurrency.max(1),
                ..options
            },
            clock,
            state: RwLock::new(DashboardState::default()),
        }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().await.snapshot()
    }

    /// List endpoints, then fetch every endpoint's window with at most
    /// `max_concurrency` requests in flight.
    ///
    /// A failed endpoint list yields an empty snapshot in a failed state; a
    /// failed window fetch leaves only that endpoint without data.
    ///
    /// Overlapping refreshes are ordered by when they were issued: a list
    /// response from an older refresh is dropped once a newer one has started.
    pub async fn refresh(&self) -> DashboardSnapshot {
        let cycle = {
            let mut state = self.state.write().await;
            if state.closed {
                return state.snapshot();
            }
            state.cycles.issue(&())
        };

        let listed = self.transport.list_endpoints().await;

        let mut state = self.state.write().await;
        if state.closed || !state.cycles.is_current(&(), cycle) {
            tracing::debug!(
                "Discarding stale endpoint list (cycle {})",
                cycle.value()
            );
            return state.snapshot();
        }

        let endpoints = match listed {
            Ok(raw) => {
                let total = raw.len();
                let endpoints: Vec<Endpoint> = raw.iter().filter_map(normalize_endpoint).collect();
                if endpoints.len() < total {
                    tracing::warn!("Dropped {} endpoint records without an id", total - endpoints.len());
                }
                endpoints
            }
            Err(e) => {
                tracing::error!("Failed to list endpoints: {}", e);
                state.generations.invalidate_all();
                state.order.clear();
                state.views.clear();
                state.list = LoadState::from_error(&e);
                state.refreshed_at = Some((self.clock)());
                return state.snapshot();
            }
        };

        let tickets = self.begin_cycle(&mut state, &endpoints);
        drop(state);

        tracing::info!(
            "Refreshing {} endpoints with up to {} concurrent fetches",
            tickets.len(),
            self.options.max_concurrency
        );

        self.fan_out(tickets).await;

        let mut state = self.state.write().await;
        if !state.closed && state.cycles.is_current(&(), cycle) {
            state.refreshed_at = Some((self.clock)());
        }
        state.snapshot()
    }

    /// Re-fetch a single endpoint's window.
    ///
    /// Returns `None` if the endpoint is not on the dashboard.
    pub async fn refresh_endpoint(&self, id: EndpointId) -> Option<EndpointView> {
        let ticket = {
            let mut state = self.state.write().await;
            if state.closed {
                return None;
            }
            let endpoint = state.views.get(&id)?.endpoint.clone();
            let generation = state.generations.issue(&id);
            if let Some(view) = state.views.get_mut(&id) {
                view.fetch = FetchState::Loading;
            }
            (endpoint, generation)
        };

        self.fan_out(vec![ticket]).await;
        self.state.read().await.views.get(&id).cloned()
    }

    /// Stop applying results. Anything still in flight is discarded on arrival.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.closed = true;
        state.generations.invalidate_all();
        state.cycles.invalidate_all();
    }

    /// Fetch and classify recent alerts.
    pub async fn alerts(&self) -> AlertsSnapshot {
        let now = (self.clock)();
        match self.transport.fetch_alerts(self.options.alert_limit).await {
            Ok(raw) => {
                let alerts = classify_all(&raw, now);
                let alerts_today = count_since_midnight(&alerts, &now.with_timezone(&Local));
                AlertsSnapshot {
                    list: LoadState::Ready,
                    alerts,
                    alerts_today,
                }
            }
            Err(e) => {
                tracing::error!("Failed to fetch alerts: {}", e);
                AlertsSnapshot {
                    list: LoadState::from_error(&e),
                    alerts: Vec::new(),
                    alerts_today: 0,
                }
            }
        }
    }

    /// The backend's overview, or one derived from the current snapshot if
    /// the backend cannot provide it.
    pub async fn overview(&self) -> OverviewSnapshot {
        match self.transport.fetch_overview().await {
            Ok(value) => OverviewSnapshot {
                source: OverviewSource::Backend,
                overview: normalize_overview(&value),
            },
            Err(e) => {
                tracing::warn!("Failed to fetch overview, deriving locally: {}", e);
                let snapshot = self.snapshot().await;
                let alerts = self.alerts().await;
                let now = (self.clock)().with_timezone(&Local);
                OverviewSnapshot {
                    source: OverviewSource::Derived,
                    overview: derive_overview(
                        &snapshot.endpoint_list(),
                        &snapshot.metrics(),
                        &alerts.alerts,
                        &now,
                    ),
                }
            }
        }
    }

    /// A pager over one endpoint's history.
    pub fn pager(&self, id: EndpointId) -> LogPager {
        LogPager::new(self.transport.clone(), id, self.options.page_size)
    }

    pub async fn create_endpoint(&self, draft: &EndpointDraft) -> Result<DashboardSnapshot, ApiError> {
        draft.validate().map_err(ApiError::Config)?;
        self.transport.create_endpoint(draft).await?;
        Ok(self.refresh().await)
    }

    pub async fn update_endpoint(
        &self,
        id: EndpointId,
        draft: &EndpointDraft,
    ) -> Result<DashboardSnapshot, ApiError> {
        draft.validate().map_err(ApiError::Config)?;
        self.transport.update_endpoint(id, draft).await?;
        Ok(self.refresh().await)
    }

    pub async fn toggle_endpoint(&self, id: EndpointId, is_active: bool) -> Result<DashboardSnapshot, ApiError> {
        self.transport.toggle_endpoint(id, is_active).await?;
        Ok(self.refresh().await)
    }

    pub async fn delete_endpoint(&self, id: EndpointId) -> Result<DashboardSnapshot, ApiError> {
        self.transport.delete_endpoint(id).await?;
        Ok(self.refresh().await)
    }

    /// Replace the endpoint list and issue a generation for every endpoint.
    fn begin_cycle(
        &self,
        state: &mut DashboardState,
        endpoints: &[Endpoint],
    ) -> Vec<(Endpoint, Generation)> {
        let mut listed = HashSet::with_capacity(endpoints.len());
        let unique: Vec<&Endpoint> = endpoints.iter().filter(|e| listed.insert(e.id)).collect();
        if unique.len() < endpoints.len() {
            tracing::warn!(
                "Ignored {} duplicate endpoint records",
                endpoints.len() - unique.len()
            );
        }

        for id in state.order.iter().filter(|id| !listed.contains(*id)) {
            state.generations.invalidate(id);
        }
        state.views.retain(|id, _| listed.contains(id));
        state.order = unique.iter().map(|e| e.id).collect();
        state.list = LoadState::Ready;

        unique
            .into_iter()
            .map(|endpoint| {
                let generation = state.generations.issue(&endpoint.id);
                let metrics = state
                    .views
                    .get(&endpoint.id)
                    .map(|v| DerivedMetrics {
                        status: endpoint.status,
                        ..v.metrics.clone()
                    })
                    .unwrap_or_else(|| DerivedMetrics::no_data(endpoint));
                state.views.insert(
                    endpoint.id,
                    EndpointView {
                        endpoint: endpoint.clone(),
                        metrics,
                        fetch: FetchState::Loading,
                    },
                );
                (endpoint.clone(), generation)
            })
            .collect()
    }

    async fn fan_out(&self, tickets: Vec<(Endpoint, Generation)>) {
        let query = LogQuery::window(self.aggregator.window());
        let transport = &self.transport;
        let query = &query;

        let mut completions = stream::iter(tickets)
            .map(move |(endpoint, generation)| async move {
                let result = transport.fetch_observations(endpoint.id, query).await;
                (endpoint, generation, result)
            })
            .buffer_unordered(self.options.max_concurrency);

        while let Some((endpoint, generation, result)) = completions.next().await {
            self.apply(endpoint, generation, result).await;
        }
    }

    /// Fold one completion into state if it is still the latest for its endpoint.
    async fn apply(
        &self,
        endpoint: Endpoint,
        generation: Generation,
        result: Result<RawLogPage, ApiError>,
    ) -> bool {
        let now = (self.clock)();
        let mut state = self.state.write().await;

        if state.closed || !state.generations.is_current(&endpoint.id, generation) {
            tracing::debug!(
                "Discarding stale result for endpoint {} (generation {})",
                endpoint.id,
                generation.value()
            );
            return false;
        }

        let view = match result {
            Ok(raw) => {
                let page = normalize_log_page(&raw, endpoint.id);
                EndpointView {
                    metrics: self.aggregator.aggregate(&endpoint, &page.observations, now),
                    endpoint,
                    fetch: FetchState::Ready,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to fetch observations for endpoint {}: {}", endpoint.id, e);
                EndpointView {
                    metrics: DerivedMetrics::no_data(&endpoint),
                    endpoint,
                    fetch: FetchState::Failed {
                        reason: e.to_string(),
                    },
                }
            }
        };

        state.views.insert(view.endpoint.id, view);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawAlert, RawEndpoint, Status};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio_test::{assert_ok, assert_pending, assert_ready, task};

    type Reply = Result<RawLogPage, ApiError>;
    type ListReply = Result<Vec<Value>, ApiError>;

    /// Scripted backend double.
    ///
    /// Observation fetches either answer from `pages`, fail for ids in
    /// `failing`, or wait on a queued gate so tests control completion order.
    #[derive(Default)]
    struct ScriptedTransport {
        endpoints: Mutex<Option<Vec<Value>>>,
        pages: Mutex<HashMap<EndpointId, Value>>,
        failing: Mutex<Vec<EndpointId>>,
        gates: Mutex<HashMap<EndpointId, VecDeque<oneshot::Receiver<Reply>>>>,
        list_gates: Mutex<VecDeque<oneshot::Receiver<ListReply>>>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        overview: Mutex<Option<Value>>,
        alerts: Mutex<Option<Vec<Value>>>,
        toggles: Mutex<Vec<(EndpointId, bool)>>,
    }

    impl ScriptedTransport {
        fn with_endpoints(endpoints: Vec<Value>) -> Self {
            Self {
                endpoints: Mutex::new(Some(endpoints)),
                ..Default::default()
            }
        }

        fn page(&self, id: EndpointId, logs: Value) {
            self.pages.lock().unwrap().insert(id, json!({"logs": logs}));
        }

        fn list_gate(&self) -> oneshot::Sender<ListReply> {
            let (tx, rx) = oneshot::channel();
            self.list_gates.lock().unwrap().push_back(rx);
            tx
        }

        fn gate(&self, id: EndpointId) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().entry(id).or_default().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn list_endpoints(&self) -> Result<Vec<RawEndpoint>, ApiError> {
            let gate = self.list_gates.lock().unwrap().pop_front();
            if let Some(rx) = gate {
                let list = rx.await.unwrap_or(Err(ApiError::Timeout))?;
                return Ok(list
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap())
                    .collect());
            }

            match self.endpoints.lock().unwrap().clone() {
                Some(list) => Ok(list
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap())
                    .collect()),
                None => Err(ApiError::Network("connection refused".to_string())),
            }
        }

        async fn fetch_observations(&self, id: EndpointId, _query: &LogQuery) -> Result<RawLogPage, ApiError> {
            let gate = self.gates.lock().unwrap().get_mut(&id).and_then(|q| q.pop_front());
            if let Some(rx) = gate {
                return rx.await.unwrap_or(Err(ApiError::Timeout));
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().unwrap().contains(&id) {
                return Err(ApiError::Timeout);
            }
            let page = self.pages.lock().unwrap().get(&id).cloned().unwrap_or(json!({"logs": []}));
            Ok(serde_json::from_value(page).unwrap())
        }

        async fn fetch_alerts(&self, _limit: usize) -> Result<Vec<RawAlert>, ApiError> {
            match self.alerts.lock().unwrap().clone() {
                Some(list) => Ok(list
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap())
                    .collect()),
                None => Err(ApiError::Unauthorized),
            }
        }

        async fn fetch_overview(&self) -> Result<Value, ApiError> {
            self.overview
                .lock()
                .unwrap()
                .clone()
                .ok_or(ApiError::Status { status: 500, body: "boom".to_string() })
        }

        async fn create_endpoint(&self, _draft: &EndpointDraft) -> Result<(), ApiError> {
            Ok(())
        }

        async fn update_endpoint(&self, _id: EndpointId, _draft: &EndpointDraft) -> Result<(), ApiError> {
            Ok(())
        }

        async fn toggle_endpoint(&self, id: EndpointId, is_active: bool) -> Result<(), ApiError> {
            self.toggles.lock().unwrap().push((id, is_active));
            if let Some(list) = self.endpoints.lock().unwrap().as_mut() {
                for e in list.iter_mut().filter(|e| e["id"] == json!(id)) {
                    e["is_active"] = json!(is_active);
                }
            }
            Ok(())
        }

        async fn delete_endpoint(&self, _id: EndpointId) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn endpoint_json(id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "url": format!("https://{}.example.com", id),
            "type": "http",
            "interval": 60,
            "status": {"monitor_status": status, "valid": true},
            "is_active": true,
        })
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn dashboard(transport: Arc<ScriptedTransport>, max_concurrency: usize) -> Dashboard {
        let options = DashboardOptions {
            max_concurrency,
            ..DashboardOptions::default()
        };
        Dashboard::with_clock(transport, options, Arc::new(fixed_now))
    }

    fn page_with_code(code: i64) -> Value {
        json!({"logs": [{"status_code": code, "response_time": 100.0, "checked_at": "2024-06-01T11:58:00"}]})
    }

    #[tokio::test]
    async fn test_refresh_aggregates_every_endpoint() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![
            endpoint_json(1, "up"),
            endpoint_json(2, "down"),
        ]));
        transport.page(
            1,
            json!([
                {"status_code": 200, "response_time": 100.0, "checked_at": "2024-06-01T11:58:00"},
                {"status_code": 500, "response_time": 300.0, "checked_at": "2024-06-01T11:57:00"},
            ]),
        );

        let snapshot = dashboard(transport, 4).refresh().await;
        assert_eq!(snapshot.list, LoadState::Ready);
        assert_eq!(snapshot.endpoints.len(), 2);
        assert_eq!(snapshot.refreshed_at, Some(fixed_now()));

        let first = &snapshot.endpoints[0];
        assert_eq!(first.fetch, FetchState::Ready);
        assert_eq!(first.metrics.uptime_percentage, Some(50.0));
        assert_eq!(first.metrics.avg_response_time, Some(200.0));
        assert_eq!(first.metrics.last_check_label.as_deref(), Some("2 minutes ago"));

        let second = &snapshot.endpoints[1];
        assert_eq!(second.metrics.status, Status::Down);
        assert_eq!(second.metrics.uptime_percentage, None);
    }

    #[tokio::test]
    async fn test_one_failing_endpoint_does_not_abort_others() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![
            endpoint_json(1, "up"),
            endpoint_json(2, "up"),
            endpoint_json(3, "up"),
        ]));
        for id in 1..=3 {
            transport.pages.lock().unwrap().insert(id, page_with_code(200));
        }
        transport.failing.lock().unwrap().push(2);

        let snapshot = dashboard(transport, 2).refresh().await;
        assert_eq!(snapshot.list, LoadState::Ready);

        let by_id: HashMap<EndpointId, &EndpointView> =
            snapshot.endpoints.iter().map(|v| (v.endpoint.id, v)).collect();
        assert_eq!(by_id[&1].metrics.uptime_percentage, Some(100.0));
        assert_eq!(by_id[&3].metrics.uptime_percentage, Some(100.0));
        assert!(matches!(by_id[&2].fetch, FetchState::Failed { .. }));
        assert_eq!(by_id[&2].metrics.uptime_percentage, None);
        assert_eq!(by_id[&2].metrics.avg_response_time, None);
    }

    #[tokio::test]
    async fn test_endpoint_list_failure_is_an_empty_labeled_state() {
        let transport = Arc::new(ScriptedTransport::default());
        let snapshot = dashboard(transport, 2).refresh().await;

        assert!(snapshot.endpoints.is_empty());
        assert!(matches!(snapshot.list, LoadState::Failed { ref reason } if reason.contains("connection refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_is_bounded() {
        let endpoints: Vec<Value> = (1..=20).map(|id| endpoint_json(id, "up")).collect();
        let transport = Arc::new(ScriptedTransport {
            endpoints: Mutex::new(Some(endpoints)),
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });

        let snapshot = dashboard(transport.clone(), 3).refresh().await;
        assert_eq!(snapshot.endpoints.len(), 20);
        assert!(snapshot.endpoints.iter().all(|v| v.fetch == FetchState::Ready));

        let peak = transport.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {}", peak);
        assert!(peak > 1, "fetches never overlapped");
    }

    #[tokio::test]
    async fn test_stale_response_never_overwrites_newer_one() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![endpoint_json(1, "up")]));
        transport.page(1, json!([]));
        let dash = dashboard(transport.clone(), 2);
        dash.refresh().await;

        // Generation 1 and generation 2 in flight for the same endpoint.
        let first = transport.gate(1);
        let second = transport.gate(1);

        let run = async {
            tokio::join!(dash.refresh_endpoint(1), dash.refresh_endpoint(1), async {
                tokio::task::yield_now().await;
                // Generation 2 resolves first with a healthy window...
                second
                    .send(Ok(serde_json::from_value(page_with_code(200)).unwrap()))
                    .unwrap();
                tokio::task::yield_now().await;
                // ...then generation 1 arrives late with a failing one.
                first
                    .send(Ok(serde_json::from_value(page_with_code(500)).unwrap()))
                    .unwrap();
            })
        };
        run.await;

        let view = dash.snapshot().await.endpoints.remove(0);
        assert_eq!(view.metrics.uptime_percentage, Some(100.0));
        assert_eq!(view.fetch, FetchState::Ready);
    }

    #[tokio::test]
    async fn test_stale_endpoint_list_never_overwrites_newer_one() {
        let mut inactive = endpoint_json(1, "up");
        inactive["is_active"] = json!(false);
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![inactive.clone()]));
        let dash = dashboard(transport.clone(), 2);
        dash.refresh().await;

        // An older refresh whose list response is held back.
        let gate = transport.list_gate();
        let mut older = task::spawn(dash.refresh());
        assert_pending!(older.poll());

        // A toggle completes and re-fetches in the meantime.
        let toggled = assert_ok!(dash.toggle_endpoint(1, true).await);
        assert!(toggled.endpoints[0].endpoint.is_active);

        // The older list, taken before the toggle, arrives last.
        gate.send(Ok(vec![inactive])).unwrap();
        assert!(older.is_woken());
        let late = assert_ready!(older.poll());
        assert!(late.endpoints[0].endpoint.is_active);

        let view = dash.snapshot().await.endpoints.remove(0);
        assert!(view.endpoint.is_active);
        assert_eq!(view.fetch, FetchState::Ready);
    }

    #[tokio::test]
    async fn test_stale_list_failure_does_not_clear_newer_state() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![endpoint_json(1, "up")]));
        let dash = dashboard(transport.clone(), 2);

        let gate = transport.list_gate();
        let mut older = task::spawn(dash.refresh());
        assert_pending!(older.poll());

        let newer = dash.refresh().await;
        assert_eq!(newer.list, LoadState::Ready);

        gate.send(Err(ApiError::Network("connection reset".to_string()))).unwrap();
        assert_ready!(older.poll());

        let snapshot = dash.snapshot().await;
        assert_eq!(snapshot.list, LoadState::Ready);
        assert_eq!(snapshot.endpoints.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_endpoint_records_yield_one_row() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![
            endpoint_json(1, "up"),
            endpoint_json(2, "up"),
            endpoint_json(1, "down"),
        ]));
        let snapshot = dashboard(transport, 2).refresh().await;

        let ids: Vec<EndpointId> = snapshot.endpoints.iter().map(|v| v.endpoint.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(snapshot.endpoints[0].endpoint.status, Status::Up);
    }

    #[tokio::test]
    async fn test_results_after_close_are_discarded() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![endpoint_json(1, "up")]));
        let dash = dashboard(transport.clone(), 2);
        dash.refresh().await;

        let gate = transport.gate(1);
        tokio::join!(dash.refresh_endpoint(1), async {
            tokio::task::yield_now().await;
            dash.close().await;
            gate.send(Ok(serde_json::from_value(page_with_code(200)).unwrap()))
                .unwrap();
        });

        let view = dash.snapshot().await.endpoints.remove(0);
        assert_eq!(view.metrics.uptime_percentage, None);
        assert_eq!(view.fetch, FetchState::Loading);

        // Closed dashboards ignore new refreshes too.
        assert!(dash.refresh_endpoint(1).await.is_none());
    }

    #[tokio::test]
    async fn test_endpoints_dropped_between_refreshes_are_removed() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![
            endpoint_json(1, "up"),
            endpoint_json(2, "up"),
        ]));
        let dash = dashboard(transport.clone(), 2);
        assert_eq!(dash.refresh().await.endpoints.len(), 2);

        *transport.endpoints.lock().unwrap() = Some(vec![endpoint_json(2, "down")]);
        let snapshot = dash.refresh().await;
        assert_eq!(snapshot.endpoints.len(), 1);
        assert_eq!(snapshot.endpoints[0].endpoint.id, 2);
        assert_eq!(snapshot.endpoints[0].metrics.status, Status::Down);
    }

    #[tokio::test]
    async fn test_mutation_refetches_instead_of_patching() {
        let mut inactive = endpoint_json(1, "up");
        inactive["is_active"] = json!(false);
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![inactive]));
        let dash = dashboard(transport.clone(), 2);
        dash.refresh().await;

        let snapshot = dash.toggle_endpoint(1, true).await.unwrap();
        assert_eq!(transport.toggles.lock().unwrap().as_slice(), &[(1, true)]);
        assert!(snapshot.endpoints[0].endpoint.is_active);
    }

    #[tokio::test]
    async fn test_invalid_draft_is_rejected_before_the_backend() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![]));
        let dash = dashboard(transport, 2);
        let draft = EndpointDraft {
            url: "https://example.com".to_string(),
            method: "GET".to_string(),
            kind: crate::model::CheckKind::Http,
            interval: 3,
            is_active: true,
        };
        assert!(matches!(dash.create_endpoint(&draft).await, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn test_alerts_unauthorized_is_surfaced() {
        let transport = Arc::new(ScriptedTransport::default());
        let alerts = dashboard(transport, 2).alerts().await;
        assert_eq!(alerts.list, LoadState::Unauthorized);
        assert!(alerts.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_overview_falls_back_to_derived() {
        let transport = Arc::new(ScriptedTransport::with_endpoints(vec![
            endpoint_json(1, "up"),
            endpoint_json(2, "down"),
        ]));
        transport.page(1, page_with_code(200)["logs"].clone());
        *transport.alerts.lock().unwrap() = Some(vec![]);
        let dash = dashboard(transport.clone(), 2);
        dash.refresh().await;

        let derived = dash.overview().await;
        assert_eq!(derived.source, OverviewSource::Derived);
        assert_eq!(derived.overview.total_monitors, 2);
        assert_eq!(derived.overview.monitors_down, 1);
        assert_eq!(derived.overview.uptime_percent, 100.0);

        *transport.overview.lock().unwrap() = Some(json!({"total_monitors": 9, "uptime_percent": 99.5}));
        let fetched = dash.overview().await;
        assert_eq!(fetched.source, OverviewSource::Backend);
        assert_eq!(fetched.overview.total_monitors, 9);
    }
}
