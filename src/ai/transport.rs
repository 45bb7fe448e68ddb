//! Resilient provider invocation
//!
//! [`InferenceTransport::invoke`] performs up to `policy.max_attempts()` POSTs
//! against a provider, each bounded by the provider timeout, and classifies
//! the result:
//!
//! | response                  | outcome                          |
//! |---------------------------|----------------------------------|
//! | 2xx                       | `Success`                        |
//! | 429                       | `RateLimited`, no retry          |
//! | 400 / other 4xx           | `ClientError`, no retry          |
//! | 500/502/503/504, timeout, | retried with backoff, `Fatal`    |
//! | connection failure        | once attempts are exhausted      |
//!
//! A provider without endpoint or credential yields `Unconfigured` without
//! touching the network.

use super::outcome::InvocationOutcome;
use super::provider::ProviderConfig;
use super::retry::RetryPolicy;
use super::error::TransportError;
use super::sender::{HttpSender, ReqwestSender, SendError};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shared, stateless invoker. Cloning is cheap.
#[derive(Clone)]
pub struct InferenceTransport {
    sender: Arc<dyn HttpSender>,
}

impl InferenceTransport {
    pub fn new(sender: Arc<dyn HttpSender>) -> Self {
        Self { sender }
    }

    /// Transport over a fresh `reqwest` client
    pub fn reqwest() -> Self {
        Self::new(Arc::new(ReqwestSender::new()))
    }

    /// Invokes `provider` with `payload`, retrying per `policy`
    pub async fn invoke(
        &self,
        provider: &ProviderConfig,
        payload: &Value,
        policy: &RetryPolicy,
    ) -> InvocationOutcome {
        if let Some(reason) = provider.unconfigured_reason() {
            warn!("Skipping {} call: {}", provider.name, reason);
            return InvocationOutcome::Unconfigured(reason);
        }

        let name = provider.name.as_str();
        let headers = provider.headers();
        let max_attempts = policy.max_attempts();
        let start = Instant::now();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            info!(
                "Calling {} (attempt {}/{})",
                name, attempt, max_attempts
            );

            let attempt_outcome = self
                .attempt(&provider.endpoint, &headers, payload, provider.timeout)
                .await;

            match attempt_outcome {
                InvocationOutcome::Retryable(reason) => {
                    last_error = reason;
                    match policy.delay_after(attempt) {
                        Some(delay) => {
                            warn!(
                                "{} attempt {}/{} failed ({}), retrying in {:?}",
                                name, attempt, max_attempts, last_error, delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            error!(
                                "{} failed after {} attempts: {}",
                                name, max_attempts, last_error
                            );
                        }
                    }
                }
                outcome => {
                    debug!(
                        "{} attempt {} finished as {} after {:.2}s",
                        name,
                        attempt,
                        outcome.kind(),
                        start.elapsed().as_secs_f64()
                    );
                    if let InvocationOutcome::RateLimited { retry_after } = &outcome {
                        warn!(
                            "{} rate limited (retry-after: {:?}); not retrying",
                            name, retry_after
                        );
                    }
                    return outcome;
                }
            }
        }

        InvocationOutcome::Fatal(TransportError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    /// One bounded-timeout POST, classified
    async fn attempt(
        &self,
        endpoint: &str,
        headers: &[(String, String)],
        payload: &Value,
        timeout: Duration,
    ) -> InvocationOutcome {
        let call = self.sender.post(endpoint, headers, payload, timeout);

        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(timeout)),
        };

        match result {
            Ok(reply) => InvocationOutcome::from_status(reply.status, reply.body, reply.retry_after),
            Err(e) if e.is_retryable() => InvocationOutcome::Retryable(e.to_string()),
            Err(e) => InvocationOutcome::Fatal(TransportError::InvalidRequest(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::{MockReply, MockSender};
    use serde_json::json;

    fn configured() -> ProviderConfig {
        ProviderConfig::new("test-provider", "https://provider.test/chat").with_credential("key")
    }

    fn policy(attempts: u32, initial_ms: u64, multiplier: f64) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(initial_ms), multiplier).unwrap()
    }

    fn transport(sender: &Arc<MockSender>) -> InferenceTransport {
        InferenceTransport::new(sender.clone())
    }

    #[tokio::test]
    async fn test_missing_credential_skips_network() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(200, "{}")]));
        let provider = ProviderConfig::new("p", "https://provider.test");

        let outcome = transport(&sender)
            .invoke(&provider, &json!({}), &RetryPolicy::default())
            .await;

        assert!(matches!(outcome, InvocationOutcome::Unconfigured(_)));
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_endpoint_skips_network() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(200, "{}")]));
        let provider = ProviderConfig::new("p", "  ").with_credential("key");

        let outcome = transport(&sender)
            .invoke(&provider, &json!({}), &RetryPolicy::default())
            .await;

        assert!(matches!(outcome, InvocationOutcome::Unconfigured(_)));
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(200, "hello")]));

        let outcome = transport(&sender)
            .invoke(&configured(), &json!({"messages": []}), &RetryPolicy::default())
            .await;

        match outcome {
            InvocationOutcome::Success(reply) => assert_eq!(reply.body, "hello"),
            other => panic!("Expected success, got {}", other),
        }
        assert_eq!(sender.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_503_exhausts_attempts_with_geometric_backoff() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(503, "")]));
        let start = tokio::time::Instant::now();

        let outcome = transport(&sender)
            .invoke(&configured(), &json!({}), &policy(4, 100, 2.0))
            .await;

        assert_eq!(sender.call_count(), 4);
        assert!(matches!(
            outcome,
            InvocationOutcome::Fatal(TransportError::RetriesExhausted { attempts: 4, .. })
        ));
        // 100 + 200 + 400, nothing after the last attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(800), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let sender = Arc::new(MockSender::with_replies([
            MockReply::status(502, ""),
            MockReply::error(SendError::Connect("refused".into())),
            MockReply::status(200, "ok"),
        ]));

        let outcome = transport(&sender)
            .invoke(&configured(), &json!({}), &policy(3, 10, 2.0))
            .await;

        assert!(outcome.is_success());
        assert_eq!(sender.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_not_retried() {
        let sender = Arc::new(MockSender::with_replies([MockReply::rate_limited(Some(30))]));

        let outcome = transport(&sender)
            .invoke(&configured(), &json!({}), &policy(5, 10, 2.0))
            .await;

        assert_eq!(
            outcome,
            InvocationOutcome::RateLimited {
                retry_after: Some(30)
            }
        );
        assert_eq!(sender.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_request_is_not_retried() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(
            400,
            r#"{"error": {"message": "bad field"}}"#,
        )]));

        let outcome = transport(&sender)
            .invoke(&configured(), &json!({}), &policy(5, 10, 2.0))
            .await;

        assert!(matches!(
            outcome,
            InvocationOutcome::ClientError { status: 400, .. }
        ));
        assert_eq!(sender.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_is_cut_by_timeout() {
        let sender = Arc::new(MockSender::with_replies([MockReply::Hang]));
        let provider = configured().with_timeout(Duration::from_secs(30));
        let start = tokio::time::Instant::now();

        let outcome = transport(&sender)
            .invoke(&provider, &json!({}), &policy(2, 1000, 2.0))
            .await;

        assert!(matches!(outcome, InvocationOutcome::Fatal(_)));
        assert_eq!(sender.call_count(), 2);
        // two 30s timeouts plus one 1s backoff
        assert!(start.elapsed() >= Duration::from_secs(61));
        assert!(start.elapsed() < Duration::from_secs(62));
    }

    #[tokio::test]
    async fn test_credential_header_is_sent() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(200, "{}")]));

        transport(&sender)
            .invoke(&configured(), &json!({"x": 1}), &RetryPolicy::default())
            .await;

        let request = &sender.requests()[0];
        assert_eq!(request.url, "https://provider.test/chat");
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Bearer key".to_string())));
        assert_eq!(request.body, json!({"x": 1}));
        assert_eq!(request.timeout, Duration::from_secs(30));
    }
}
