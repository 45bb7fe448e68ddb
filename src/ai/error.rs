//! Error taxonomy for provider invocations
//!
//! [`TransportError`] is what a fatal invocation carries. [`AnalysisError`] is
//! the classification every stage failure is reduced to before the
//! orchestrator absorbs it into fallback data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal transport failures
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum TransportError {
    /// Every attempt failed with a retryable condition
    #[error("request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Status code outside the handled set
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The request could not be built (bad header value, unserializable body)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Reasons a stage could not produce live analysis
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// Missing credential or endpoint; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeouts and 5xx responses that outlived the retry policy
    #[error("Transient transport error: {0}")]
    TransientTransport(String),

    /// HTTP 429 from the provider
    #[error("Rate limit exceeded{}", retry_hint(.retry_after))]
    RateLimit { retry_after: Option<u64> },

    /// HTTP 400 and other client-side rejections
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The reply did not contain a usable analysis object
    #[error("Parse failure: {0}")]
    Parse(String),

    /// Fault inside the pipeline itself
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Whether the error came from the provider rather than from our own pipeline
    pub fn is_provider_failure(&self) -> bool {
        !matches!(self, AnalysisError::Internal(_))
    }
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {} seconds", secs))
        .unwrap_or_default()
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Internal(format!("serialization failed: {}", e))
    }
}
