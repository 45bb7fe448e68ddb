//! HTTP seam between the transport and the network
//!
//! The transport only needs "POST this JSON, give me status and body".
//! Production uses a shared `reqwest::Client`; tests script replies with
//! [`MockSender`](super::mock::MockSender).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Status, body and rate-limit hint of one HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header, in seconds
    pub retry_after: Option<u64>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }
}

/// Failures below the HTTP status level
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Other(String),
    /// The request itself is unusable; not retryable
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SendError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SendError::InvalidRequest(_))
    }
}

#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, SendError>;
}

/// Production sender backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, SendError> {
        let header_map = build_headers(headers)?;

        debug!("POST {} ({} headers)", url, header_map.len());

        let response = self
            .client
            .post(url)
            .headers(header_map)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout(timeout)
                } else if e.is_connect() {
                    SendError::Connect(e.to_string())
                } else if e.is_builder() {
                    SendError::InvalidRequest(e.to_string())
                } else {
                    SendError::Other(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = response.text().await.map_err(|e| {
            error!("Failed to read response body: {}", e);
            if e.is_timeout() {
                SendError::Timeout(timeout)
            } else {
                SendError::Other(format!("failed to read body: {}", e))
            }
        })?;

        Ok(HttpReply {
            status,
            body,
            retry_after,
        })
    }
}

fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, SendError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SendError::InvalidRequest(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SendError::InvalidRequest(format!("header {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}
