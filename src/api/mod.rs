//! Backend transport module.
//!
//! The monitoring backend is reached through the [`Transport`] trait so the
//! orchestration layer can run against the real HTTP client or an in-memory
//! double.

mod http;

pub use http::*;

use crate::model::{EndpointDraft, EndpointId, RawAlert, RawEndpoint, RawLogPage};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

/// Transport error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    /// The session is no longer valid; the caller owns teardown.
    #[error("unauthorized")]
    Unauthorized,
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Window/page selection for an observation fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: usize,
    pub offset: usize,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl LogQuery {
    /// The most recent `limit` observations.
    pub fn window(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Query-string pairs. Zero limit/offset are omitted, matching the backend defaults.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }
        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        if let Some(from) = self.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

/// Request/response access to the monitoring backend.
///
/// Responses are returned in their raw wire shape; normalization happens in
/// [`crate::model::normalize`]. Timeouts are enforced here and reported as
/// [`ApiError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// List the endpoints of the authenticated principal.
    async fn list_endpoints(&self) -> Result<Vec<RawEndpoint>, ApiError>;

    /// Fetch one page (or window) of observations for an endpoint.
    async fn fetch_observations(
        &self,
        id: EndpointId,
        query: &LogQuery,
    ) -> Result<RawLogPage, ApiError>;

    /// Fetch the most recent alert records.
    async fn fetch_alerts(&self, limit: usize) -> Result<Vec<RawAlert>, ApiError>;

    /// Fetch the analytics overview aggregate.
    async fn fetch_overview(&self) -> Result<Value, ApiError>;

    async fn create_endpoint(&self, draft: &EndpointDraft) -> Result<(), ApiError>;

    async fn update_endpoint(&self, id: EndpointId, draft: &EndpointDraft) -> Result<(), ApiError>;

    async fn toggle_endpoint(&self, id: EndpointId, is_active: bool) -> Result<(), ApiError>;

    async fn delete_endpoint(&self, id: EndpointId) -> Result<(), ApiError>;
}
