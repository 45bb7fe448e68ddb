//! Conversational assistant
//!
//! Each turn goes through the same transport as analysis. Failures never
//! surface as errors to the user: every outcome maps to some reply text,
//! with rate limits answered by a keyword-driven range diagnostic.

pub mod diagnostics;

use crate::ai::{InferenceTransport, InvocationOutcome, ProviderConfig, RetryPolicy};
use crate::analysis::normalizer;
use crate::store::{ChatTurn, SessionStore, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Chat retries start at one second
pub const CHAT_INITIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: String,
    pub message: ChatTurn,
    pub history: Vec<ChatTurn>,
}

pub struct ChatService {
    transport: InferenceTransport,
    provider: ProviderConfig,
    policy: RetryPolicy,
    sessions: Arc<dyn SessionStore>,
}

impl ChatService {
    pub fn new(
        transport: InferenceTransport,
        provider: ProviderConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            transport,
            provider,
            policy: RetryPolicy::default().with_initial_delay(CHAT_INITIAL_DELAY),
            sessions,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs one turn, creating a session when `session_id` is absent
    pub async fn send(
        &self,
        session_id: Option<String>,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.sessions
            .append(&session_id, ChatTurn::user(message))
            .await?;

        let reply = ChatTurn::assistant(self.respond(message).await);
        self.sessions.append(&session_id, reply.clone()).await?;

        let history = self
            .sessions
            .history(&session_id)
            .await?
            .unwrap_or_default();

        Ok(ChatReply {
            session_id,
            message: reply,
            history,
        })
    }

    pub async fn history(&self, session_id: &str) -> Result<Option<Vec<ChatTurn>>, ChatError> {
        Ok(self.sessions.history(session_id).await?)
    }

    /// Reply text for `message`; never fails
    pub async fn respond(&self, message: &str) -> String {
        let payload = self.provider.payload(message).to_json();

        match self
            .transport
            .invoke(&self.provider, &payload, &self.policy)
            .await
        {
            InvocationOutcome::Success(reply) => interpret_reply(&reply.body, message),
            InvocationOutcome::Unconfigured(reason) => {
                warn!("Chat provider unavailable: {}", reason);
                diagnostics::UNCONFIGURED_REPLY.to_string()
            }
            InvocationOutcome::RateLimited { .. } => {
                match diagnostics::rate_limit_diagnostic(message) {
                    Some(diagnostic) => {
                        info!("Chat rate limited; answering with range diagnostic");
                        diagnostic
                    }
                    None => diagnostics::CONNECTION_REPLY.to_string(),
                }
            }
            InvocationOutcome::ClientError { status: 400, detail } => {
                warn!("Chat provider rejected request: {}", detail);
                diagnostics::CONFIGURATION_ISSUE_REPLY.to_string()
            }
            other => {
                warn!("Chat call failed: {}", other);
                diagnostics::CONNECTION_REPLY.to_string()
            }
        }
    }
}

fn interpret_reply(body: &str, message: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body.trim()) else {
        warn!("Chat reply is not JSON");
        return diagnostics::INVALID_RESPONSE_REPLY.to_string();
    };

    if let Some(error) = normalizer::api_error(body) {
        warn!("Chat provider returned an error: {}", error);
        return diagnostics::api_error_reply(&error);
    }

    if let Some(text) = normalizer::reply_text(body) {
        debug!("Chat reply: {} chars", text.len());
        return text;
    }

    if value.get("choices").is_some() {
        warn!("Chat reply had no content");
        diagnostics::empty_content_reply(message).to_string()
    } else {
        warn!("Unrecognized chat reply shape");
        diagnostics::UNEXPECTED_FORMAT_REPLY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockReply, MockSender, PromptPlacement};
    use crate::analysis::prompt::CHAT_INSTRUCTIONS;
    use crate::store::InMemorySessionStore;
    use serde_json::json;

    fn provider() -> ProviderConfig {
        let mut provider = ProviderConfig::new("chat", "https://chat.test")
            .with_credential("key")
            .with_system_prompt(CHAT_INSTRUCTIONS);
        provider.prompt_placement = PromptPlacement::LeadingUserMessage;
        provider
    }

    fn service(sender: &Arc<MockSender>, provider: ProviderConfig) -> ChatService {
        ChatService::new(
            InferenceTransport::new(sender.clone()),
            provider,
            Arc::new(InMemorySessionStore::new()),
        )
    }

    fn content(text: &str) -> MockReply {
        MockReply::json(200, &json!({"choices": [{"message": {"content": text}}]}))
    }

    #[tokio::test]
    async fn test_rate_limit_gives_ammonia_diagnostic() {
        let sender = Arc::new(MockSender::with_replies([MockReply::rate_limited(None)]));
        let reply = service(&sender, provider())
            .respond("Is my ammonia too high?")
            .await;

        assert_eq!(sender.call_count(), 1);
        assert!(reply.contains("<0.5ppm"));
        assert!(!reply.contains("6.5-7.5"));
        assert!(!reply.contains("mS/cm"));
        assert!(!reply.contains("18-24"));
    }

    #[tokio::test]
    async fn test_rate_limit_without_keyword() {
        let sender = Arc::new(MockSender::with_replies([MockReply::rate_limited(Some(5))]));
        let reply = service(&sender, provider()).respond("hello there").await;
        assert_eq!(reply, diagnostics::CONNECTION_REPLY);
    }

    #[tokio::test]
    async fn test_unconfigured_makes_no_call() {
        let sender = Arc::new(MockSender::new());
        let reply = service(&sender, ProviderConfig::new("chat", "https://chat.test"))
            .respond("hi")
            .await;

        assert_eq!(reply, diagnostics::UNCONFIGURED_REPLY);
        assert_eq!(sender.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_and_payload_shape() {
        let sender = Arc::new(MockSender::with_replies([content("  Keep pH stable.  ")]));
        let reply = service(&sender, provider()).respond("advice?").await;

        assert_eq!(reply, "Keep pH stable.");
        let body = &sender.requests()[0].body;
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .starts_with("Instructions for you"));
        assert_eq!(body["messages"][1]["content"], "advice?");
    }

    #[tokio::test]
    async fn test_empty_content_mentions_ph() {
        let sender = Arc::new(MockSender::with_replies([content("   ")]));
        let reply = service(&sender, provider()).respond("my pH is 6.1").await;
        assert_eq!(reply, diagnostics::LOW_PH_PROTOCOL);
    }

    #[tokio::test]
    async fn test_empty_content_otherwise() {
        let sender = Arc::new(MockSender::with_replies([content("")]));
        let reply = service(&sender, provider()).respond("hello").await;
        assert_eq!(reply, diagnostics::EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_api_error_object() {
        let sender = Arc::new(MockSender::with_replies([MockReply::json(
            200,
            &json!({"error": {"message": "quota exceeded"}}),
        )]));
        let reply = service(&sender, provider()).respond("hello").await;
        assert_eq!(reply, "I apologize, but I encountered an error: quota exceeded");
    }

    #[tokio::test]
    async fn test_bad_request_reply() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(
            400,
            r#"{"error": {"code": "unsupported_parameter", "message": "max_tokens"}}"#,
        )]));
        let reply = service(&sender, provider()).respond("hello").await;
        assert_eq!(reply, diagnostics::CONFIGURATION_ISSUE_REPLY);
        assert_eq!(sender.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_reply() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(504, "")]));
        let reply = service(&sender, provider()).respond("hello").await;
        assert_eq!(reply, diagnostics::CONNECTION_REPLY);
        assert_eq!(sender.call_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_json_reply() {
        let sender = Arc::new(MockSender::with_replies([MockReply::status(200, "<html>")]));
        let reply = service(&sender, provider()).respond("hello").await;
        assert_eq!(reply, diagnostics::INVALID_RESPONSE_REPLY);
    }

    #[tokio::test]
    async fn test_session_history_accumulates() {
        let sender = Arc::new(MockSender::with_replies([content("one"), content("two")]));
        let service = service(&sender, provider());

        let first = service.send(None, "first").await.unwrap();
        let second = service
            .send(Some(first.session_id.clone()), "second")
            .await
            .unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(second.message.content, "two");
        let contents: Vec<&str> = second.history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "one", "second", "two"]);
        assert_eq!(
            service.history(&first.session_id).await.unwrap().unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let sender = Arc::new(MockSender::new());
        let err = service(&sender, provider()).send(None, "  ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }
}
