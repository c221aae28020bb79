//! HTTP transport implementation.

use super::{ApiError, LogQuery, Transport};
use crate::config::ViewConfig;
use crate::model::{
    CreateEndpointRequest, EndpointDraft, EndpointId, RawAlert, RawEndpoint, RawLogPage,
    ToggleEndpointRequest, UpdateEndpointRequest,
};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// [`Transport`] backed by the monitoring backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for `base_url` (e.g. `http://localhost:8080/v1`).
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiError::Config("empty API base URL".to_string()));
        }

        let base_url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(cfg: &ViewConfig) -> Result<Self, ApiError> {
        Self::new(&cfg.api_url, cfg.api_token.clone(), cfg.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Decode a JSON array of records, skipping elements that are not objects.
///
/// A `null` body (an empty list on the backend side) decodes as empty.
pub(crate) fn decode_records<T: DeserializeOwned>(body: Value, what: &str) -> Result<Vec<T>, ApiError> {
    let items = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(ApiError::Decode(format!(
                "expected a list of {}, got {}",
                what,
                json_kind(&other)
            )))
        }
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if records.len() < total {
        tracing::debug!("Skipped {} malformed {} records", total - records.len(), what);
    }

    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_endpoints(&self) -> Result<Vec<RawEndpoint>, ApiError> {
        let body: Value = self.get_json("/monitor/get-all-monitors", &[]).await?;
        decode_records(body, "endpoint")
    }

    async fn fetch_observations(
        &self,
        id: EndpointId,
        query: &LogQuery,
    ) -> Result<RawLogPage, ApiError> {
        let path = format!("/monitor/monitor/{}/logs", id);
        self.get_json(&path, &query.params()).await
    }

    async fn fetch_alerts(&self, limit: usize) -> Result<Vec<RawAlert>, ApiError> {
        let body: Value = self
            .get_json("/alert/recent-alerts", &[("limit", limit.to_string())])
            .await?;
        decode_records(body, "alert")
    }

    async fn fetch_overview(&self) -> Result<Value, ApiError> {
        self.get_json("/analytics/overview", &[]).await
    }

    async fn create_endpoint(&self, draft: &EndpointDraft) -> Result<(), ApiError> {
        let body = CreateEndpointRequest::from(draft);
        self.send(self.request(Method::POST, "/monitor/create-monitor").json(&body))
            .await?;
        Ok(())
    }

    async fn update_endpoint(&self, id: EndpointId, draft: &EndpointDraft) -> Result<(), ApiError> {
        let body = UpdateEndpointRequest {
            id,
            url: &draft.url,
            method: &draft.method,
            kind: draft.kind,
            interval: draft.interval,
        };
        self.send(self.request(Method::PUT, "/monitor/update-monitor").json(&body))
            .await?;
        Ok(())
    }

    async fn toggle_endpoint(&self, id: EndpointId, is_active: bool) -> Result<(), ApiError> {
        let body = ToggleEndpointRequest { id, is_active };
        self.send(self.request(Method::POST, "/monitor/toggle-monitor").json(&body))
            .await?;
        Ok(())
    }

    async fn delete_endpoint(&self, id: EndpointId) -> Result<(), ApiError> {
        let path = format!("/monitor/delete-monitor/{}", id);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}
