//! Pagination controller for browsing one endpoint's observation history.

use crate::api::{ApiError, LogQuery, Transport};
use crate::model::{normalize_log_page, EndpointId, Observation};

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of the last page fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PageState {
    Idle,
    Loaded,
    Failed { reason: String },
    /// The backend rejected the session.
    Unauthorized,
}

/// Serializable view of the pager.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub endpoint_id: EndpointId,
    pub limit: usize,
    pub offset: usize,
    pub total: u64,
    pub has_more: bool,
    pub can_previous: bool,
    pub can_next: bool,
    #[serde(flatten)]
    pub state: PageState,
    pub observations: Vec<Observation>,
}

/// Offset/limit cursor over an endpoint's observations.
pub struct LogPager {
    transport: Arc<dyn Transport>,
    endpoint_id: EndpointId,
    limit: usize,
    offset: usize,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    observations: Vec<Observation>,
    total: u64,
    has_more: bool,
    state: PageState,
}

impl LogPager {
    pub fn new(transport: Arc<dyn Transport>, endpoint_id: EndpointId, limit: usize) -> Self {
        Self {
            transport,
            endpoint_id,
            limit: limit.max(1),
            offset: 0,
            from: None,
            to: None,
            observations: Vec::new(),
            total: 0,
            has_more: false,
            state: PageState::Idle,
        }
    }

    /// Restrict the history to a calendar date range. Resets to the first page.
    pub fn set_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if self.from != from || self.to != to {
            self.from = from;
            self.to = to;
            self.offset = 0;
            self.state = PageState::Idle;
        }
    }

    /// Move the cursor without fetching.
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
        self.state = PageState::Idle;
    }

    /// Fetch the page at the current offset.
    ///
    /// A failed fetch leaves the pager in [`PageState::Failed`] (or
    /// [`PageState::Unauthorized`] on a 401) with no observations; it is
    /// logged, not returned.
    pub async fn fetch_page(&mut self) -> &PageState {
        let query = LogQuery {
            limit: self.limit,
            offset: self.offset,
            from: self.from,
            to: self.to,
        };

        match self.transport.fetch_observations(self.endpoint_id, &query).await {
            Ok(raw) => {
                let page = normalize_log_page(&raw, self.endpoint_id);
                self.total = page.total;
                let end = self.offset.saturating_add(self.limit) as u64;
                self.has_more = page.has_more.unwrap_or_else(|| end < page.total);
                self.observations = page.observations;
                self.state = PageState::Loaded;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch logs for endpoint {} at offset {}: {}",
                    self.endpoint_id,
                    self.offset,
                    e
                );
                self.fail(e);
            }
        }

        &self.state
    }

    /// Advance one page. Returns `false` without fetching when disabled.
    pub async fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.offset = self.offset.saturating_add(self.limit);
        self.fetch_page().await;
        true
    }

    /// Go back one page. Returns `false` without fetching at offset 0.
    pub async fn previous(&mut self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.limit);
        self.fetch_page().await;
        true
    }

    pub fn can_previous(&self) -> bool {
        self.offset > 0
    }

    /// Next is available only after a full page that the server says is not the last.
    pub fn can_next(&self) -> bool {
        self.state == PageState::Loaded && self.observations.len() >= self.limit && self.has_more
    }

    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint_id
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn view(&self) -> PageView {
        PageView {
            endpoint_id: self.endpoint_id,
            limit: self.limit,
            offset: self.offset,
            total: self.total,
            has_more: self.has_more,
            can_previous: self.can_previous(),
            can_next: self.can_next(),
            state: self.state.clone(),
            observations: self.observations.clone(),
        }
    }

    fn fail(&mut self, err: ApiError) {
        self.observations.clear();
        self.has_more = false;
        self.state = match err {
            ApiError::Unauthorized => PageState::Unauthorized,
            other => PageState::Failed {
                reason: other.to_string(),
            },
        };
    }
}
