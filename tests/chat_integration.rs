//! Chat tests against a mock HTTP provider

use aquasense::chat::diagnostics;
use aquasense::store::InMemorySessionStore;
use aquasense::{ChatService, InferenceTransport, ProviderConfig, RetryPolicy};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer) -> ChatService {
    let provider = ProviderConfig::new("chat", format!("{}/v1/chat/completions", server.uri()))
        .with_credential("sk-chat")
        .with_system_prompt("You are an aquaponics assistant.");

    ChatService::new(
        InferenceTransport::reqwest(),
        provider,
        Arc::new(InMemorySessionStore::new()),
    )
    .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(10), 2.0).unwrap())
}

#[tokio::test]
async fn test_rate_limit_answers_with_ammonia_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let reply = service(&server)
        .send(None, "Is 0.7ppm ammonia dangerous?")
        .await
        .unwrap();

    let content = &reply.message.content;
    assert!(content.starts_with("ERROR: Parameter outside optimal range:"));
    assert!(content.contains("Ammonia"));
    assert!(content.contains("<0.5ppm"));
    assert!(!content.contains("pH"));
}

#[tokio::test]
async fn test_reply_text_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{"role": "system", "content": "You are an aquaponics assistant."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Keep pH between 6.5 and 7.5."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = service(&server).send(None, "What pH?").await.unwrap();
    assert_eq!(reply.message.content, "Keep pH between 6.5 and 7.5.");
    assert_eq!(reply.message.role, "assistant");
}

#[tokio::test]
async fn test_session_continues_across_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Noted."}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let chat = service(&server);
    let first = chat.send(None, "My EC is 1.8").await.unwrap();
    let second = chat
        .send(Some(first.session_id.clone()), "And temperature is 23")
        .await
        .unwrap();

    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.history.len(), 4);
    assert_eq!(second.history[0].content, "My EC is 1.8");
}

#[tokio::test]
async fn test_server_errors_exhaust_into_connection_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let reply = service(&server).send(None, "hello").await.unwrap();
    assert_eq!(reply.message.content, diagnostics::CONNECTION_REPLY);
}
