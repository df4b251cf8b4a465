//! HTTP client for the alerts REST API.

use async_trait::async_trait;
use dispatch_shared::{
    Alert, AlertId, AlertPatch, AlertStatus, ApiError, AssignRequest, NewAlert, Severity,
    StatusUpdateRequest,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Filters for the list call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertQuery {
    pub statuses: Vec<AlertStatus>,
    pub severity: Option<Severity>,
}

impl AlertQuery {
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
            params.push(format!("status={}", urlencoding::encode(&statuses.join(","))));
        }
        if let Some(severity) = self.severity {
            params.push(format!("severity={}", urlencoding::encode(severity.as_str())));
        }
        params.join("&")
    }
}

/// The REST surface the mutation coordinator depends on.
///
/// Every mutating call returns the canonical record the server ended up with.
#[async_trait]
pub trait AlertApi: Send + Sync {
    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, ApiError>;
    async fn get_alert(&self, id: AlertId) -> Result<Alert, ApiError>;
    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert, ApiError>;
    async fn update_alert(&self, id: AlertId, update: &AlertPatch) -> Result<Alert, ApiError>;
    async fn update_status(&self, id: AlertId, status: AlertStatus) -> Result<Alert, ApiError>;
    async fn assign(&self, id: AlertId, request: &AssignRequest) -> Result<Alert, ApiError>;
    async fn delete_alert(&self, id: AlertId) -> Result<(), ApiError>;
}

/// HTTP client for the dispatch REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
            token: None,
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Bearer token issued by the auth service
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// Send a request and read the body as text, mapping non-2xx to `ApiError::Http`.
    async fn send(&self, rb: RequestBuilder) -> Result<String, ApiError> {
        let resp = self
            .authorize(rb)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            tracing::debug!(status, "api request failed");
            return Err(ApiError::Http { status, body: text });
        }
        Ok(text)
    }

    fn decode<TRes: DeserializeOwned>(text: &str) -> Result<TRes, ApiError> {
        if text.is_empty() {
            serde_json::from_str("null").map_err(|e| ApiError::Deserialize(e.to_string()))
        } else {
            serde_json::from_str(text).map_err(|e| ApiError::Deserialize(e.to_string()))
        }
    }

    /// Make a GET request
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let text = self.send(self.client.get(self.url(path))).await?;
        Self::decode(&text)
    }

    /// Make a POST request with JSON body
    pub async fn post_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let text = self.send(self.client.post(self.url(path)).json(body)).await?;
        Self::decode(&text)
    }

    /// Make a PUT request with JSON body
    pub async fn put_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let text = self.send(self.client.put(self.url(path)).json(body)).await?;
        Self::decode(&text)
    }

    /// Make a PATCH request with JSON body
    pub async fn patch_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let text = self.send(self.client.patch(self.url(path)).json(body)).await?;
        Self::decode(&text)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertApi for ApiClient {
    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, ApiError> {
        let qs = query.to_query_string();
        if qs.is_empty() {
            self.get_json("/alerts").await
        } else {
            self.get_json(&format!("/alerts?{qs}")).await
        }
    }

    async fn get_alert(&self, id: AlertId) -> Result<Alert, ApiError> {
        self.get_json(&format!("/alerts/{id}")).await
    }

    async fn create_alert(&self, alert: &NewAlert) -> Result<Alert, ApiError> {
        self.post_json("/alerts", alert).await
    }

    async fn update_alert(&self, id: AlertId, update: &AlertPatch) -> Result<Alert, ApiError> {
        self.put_json(&format!("/alerts/{id}"), update).await
    }

    async fn update_status(&self, id: AlertId, status: AlertStatus) -> Result<Alert, ApiError> {
        self.patch_json(&format!("/alerts/{id}/status"), &StatusUpdateRequest { status })
            .await
    }

    async fn assign(&self, id: AlertId, request: &AssignRequest) -> Result<Alert, ApiError> {
        self.patch_json(&format!("/alerts/{id}/assign"), request).await
    }

    async fn delete_alert(&self, id: AlertId) -> Result<(), ApiError> {
        self.delete(&format!("/alerts/{id}")).await
    }
}
