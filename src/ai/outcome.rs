//! Classified result of one provider invocation

use super::error::{AnalysisError, TransportError};
use std::fmt;

/// Raw reply body of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

/// Outcome of invoking a provider.
///
/// Transport exceptions never escape as anything other than one of these
/// variants. `Retryable` only appears as the classification of a single
/// attempt; the retry loop turns a final `Retryable` into `Fatal`.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success(RawReply),
    /// Credential or endpoint missing; no network I/O was attempted
    Unconfigured(String),
    Retryable(String),
    RateLimited { retry_after: Option<u64> },
    ClientError { status: u16, detail: String },
    Fatal(TransportError),
}

impl InvocationOutcome {
    /// Classifies one HTTP response
    pub fn from_status(status: u16, body: String, retry_after: Option<u64>) -> Self {
        match status {
            200..=299 => InvocationOutcome::Success(RawReply { status, body }),
            429 => InvocationOutcome::RateLimited { retry_after },
            500 | 502 | 503 | 504 => InvocationOutcome::Retryable(format!("HTTP {}", status)),
            400..=499 => InvocationOutcome::ClientError {
                status,
                detail: client_error_detail(&body),
            },
            _ => InvocationOutcome::Fatal(TransportError::UnexpectedStatus { status, body }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }

    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationOutcome::Success(_) => "success",
            InvocationOutcome::Unconfigured(_) => "unconfigured",
            InvocationOutcome::Retryable(_) => "retryable",
            InvocationOutcome::RateLimited { .. } => "rate-limited",
            InvocationOutcome::ClientError { .. } => "client-error",
            InvocationOutcome::Fatal(_) => "fatal",
        }
    }

    /// Reduces the outcome to the reply body or an [`AnalysisError`]
    pub fn into_body(self) -> Result<String, AnalysisError> {
        match self {
            InvocationOutcome::Success(reply) => Ok(reply.body),
            InvocationOutcome::Unconfigured(reason) => Err(AnalysisError::Configuration(reason)),
            InvocationOutcome::Retryable(reason) => Err(AnalysisError::TransientTransport(reason)),
            InvocationOutcome::RateLimited { retry_after } => {
                Err(AnalysisError::RateLimit { retry_after })
            }
            InvocationOutcome::ClientError { status, detail } => Err(
                AnalysisError::MalformedRequest(format!("HTTP {}: {}", status, detail)),
            ),
            InvocationOutcome::Fatal(e) => Err(AnalysisError::TransientTransport(e.to_string())),
        }
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationOutcome::Success(reply) => {
                write!(f, "success ({} bytes)", reply.body.len())
            }
            InvocationOutcome::Unconfigured(reason) => write!(f, "unconfigured: {}", reason),
            InvocationOutcome::Retryable(reason) => write!(f, "retryable: {}", reason),
            InvocationOutcome::RateLimited { retry_after } => match retry_after {
                Some(secs) => write!(f, "rate limited (retry after {}s)", secs),
                None => write!(f, "rate limited"),
            },
            InvocationOutcome::ClientError { status, detail } => {
                write!(f, "client error {}: {}", status, detail)
            }
            InvocationOutcome::Fatal(e) => write!(f, "fatal: {}", e),
        }
    }
}

/// Pulls `error.message` (and `error.code`) out of a JSON error body when present
fn client_error_detail(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    match error {
        Some(serde_json::Value::Object(obj)) => {
            let message = obj
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            match obj.get("code").and_then(|c| c.as_str()) {
                Some(code) => format!("{} ({})", message, code),
                None => message.to_string(),
            }
        }
        Some(serde_json::Value::String(message)) => message.clone(),
        _ => body.chars().take(200).collect(),
    }
}
