//! End-to-end analysis scenarios
//!
//! Telemetry is read from disk, both stages talk to a mock HTTP server and
//! results are persisted to a JSON file store.

use aquasense::analysis::schema::leaf_str;
use aquasense::analysis::{FallbackCatalog, FallbackScenario, ModelSelector};
use aquasense::store::{AnalysisStore, JsonFileAnalysisStore};
use aquasense::telemetry::{JsonTelemetrySource, TelemetrySource};
use aquasense::{AnalysisOrchestrator, InferenceTransport, ProviderConfig, RetryPolicy};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const PRIMARY_PATH: &str = "/primary/chat/completions";
const VALIDATOR_PATH: &str = "/validator/chat/completions";

struct Harness {
    _dir: TempDir,
    source: JsonTelemetrySource,
    store: Arc<JsonFileAnalysisStore>,
    orchestrator: AnalysisOrchestrator,
}

fn write_telemetry(dir: &std::path::Path) {
    let telemetry = dir.join("telemetry");
    fs::create_dir_all(&telemetry).expect("Failed to create telemetry dir");

    let initial = json!({
        "fish": [
            {"timestamp": "2024-03-01", "pH": 7.2, "temperature": 21.5, "ammonia": 0.1},
            {"timestamp": "2024-03-02", "pH": 7.0, "temperature": 21.8, "ammonia": 0.2}
        ],
        "plant": [
            {"timestamp": "2024-03-01", "height": 24.0, "growth_rate": 1.1, "ec": 1.5}
        ]
    });
    let validation = json!({
        "fish": [
            {"date": "2024-03-15", "pH": 6.8, "temperature": 22.4, "ammonia": 0.3}
        ],
        "plant": [
            {"date": "2024-03-15", "height": 31.5, "growth_rate": 1.2, "EC": 1.7}
        ]
    });

    fs::write(telemetry.join("initial.json"), initial.to_string())
        .expect("Failed to write initial.json");
    fs::write(telemetry.join("validation.json"), validation.to_string())
        .expect("Failed to write validation.json");
}

fn harness(server: &MockServer, validator_key: Option<&str>) -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_telemetry(dir.path());

    let primary = ProviderConfig::new("primary", format!("{}{}", server.uri(), PRIMARY_PATH))
        .with_credential("sk-primary")
        .with_system_prompt("forecast");
    let mut validator =
        ProviderConfig::new("validator", format!("{}{}", server.uri(), VALIDATOR_PATH))
            .with_system_prompt("validate");
    validator.credential = validator_key.map(str::to_string);

    let store = Arc::new(JsonFileAnalysisStore::new(dir.path().join("analysis")));
    let orchestrator = AnalysisOrchestrator::new(
        InferenceTransport::reqwest(),
        primary,
        validator,
        store.clone(),
    )
    .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(10), 2.0).unwrap());

    Harness {
        source: JsonTelemetrySource::new(dir.path().join("telemetry")),
        _dir: dir,
        store,
        orchestrator,
    }
}

fn completion(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]})
}

fn primary_analysis() -> Value {
    json!({
        "Goldfish_Health": {
            "pH_Trend": {"next_30d": "6.9 \u{2192} 6.7", "action": "Add crushed coral"},
            "Ammonia_Risk": {"probability": "22%", "peak_day": "2024-04-02"}
        },
        "urgent": {"title": "pH drifting down", "action": "Buffer within a week"}
    })
}

fn validated_analysis() -> Value {
    json!({
        "Goldfish_Health": {
            "pH_Trend": {"next_30d": "6.9 \u{2192} 6.6", "action": "Add crushed coral"}
        },
        "System_Risk": {"pH-EC_Imbalance": {"severity": "medium", "impact": "Slower growth"}},
        "watch": {"title": "EC creeping up", "action": "Dilute by 10%"}
    })
}

#[tokio::test]
async fn test_ensemble_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRIMARY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&format!(
            "Here is the forecast:\n```json\n{}\n```",
            primary_analysis()
        ))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VALIDATOR_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(&validated_analysis().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some("sk-validator"));
    let request = h
        .source
        .request(ModelSelector::Ensemble)
        .await
        .expect("telemetry should load");
    let result = h.orchestrator.run(request).await;

    assert_eq!(result.model_used(), "Deepseek R1 + O1 Mini");
    assert_eq!(result.confidence_score(), 0.87);
    assert!(!result.is_degraded());
    assert_eq!(
        result.results().watch.as_ref().and_then(|w| leaf_str(&w.title)),
        Some("EC creeping up")
    );
    assert!(result.prompt_template().contains("forecast"));
    assert!(result.prompt_template().contains("validate"));

    // The validator sees the primary forecast
    let requests: Vec<Request> = server.received_requests().await.unwrap_or_default();
    let validator_request = requests
        .iter()
        .find(|r| r.url.path() == VALIDATOR_PATH)
        .expect("validator was called");
    let body = String::from_utf8_lossy(&validator_request.body);
    assert!(body.contains("pH drifting down"));

    let stored = h.store.get(result.id()).await.unwrap();
    assert_eq!(stored, Some(result));
}

#[tokio::test]
async fn test_primary_outage_degrades_to_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRIMARY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&server, None);
    let request = h.source.request(ModelSelector::PrimaryOnly).await.unwrap();
    let result = h.orchestrator.run(request).await;

    assert_eq!(result.model_used(), "Deepseek R1");
    assert_eq!(result.confidence_score(), 0.78);
    assert_eq!(
        result.results(),
        &FallbackCatalog::get(&FallbackScenario::Primary)
    );
    assert_eq!(h.store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unconfigured_validator_uses_validator_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRIMARY_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(&primary_analysis().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VALIDATOR_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, None);
    let request = h.source.request(ModelSelector::ValidatorOnly).await.unwrap();
    let result = h.orchestrator.run(request).await;

    assert_eq!(result.confidence_score(), 0.82);
    assert_eq!(
        result.results(),
        &FallbackCatalog::get(&FallbackScenario::Validator)
    );
}

#[tokio::test]
async fn test_rate_limited_validator_is_called_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRIMARY_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(&primary_analysis().to_string())),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VALIDATOR_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some("sk-validator"));
    let request = h.source.request(ModelSelector::Ensemble).await.unwrap();
    let result = h.orchestrator.run(request).await;

    assert_eq!(
        result.results(),
        &FallbackCatalog::get(&FallbackScenario::Validator)
    );
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let h = harness(&server, None);
    let mut ids = Vec::new();
    for _ in 0..3 {
        let request = h.source.request(ModelSelector::PrimaryOnly).await.unwrap();
        ids.push(h.orchestrator.run(request).await.id());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let listed: Vec<_> = h.store.list().await.unwrap().into_iter().map(|s| s.id).collect();
    ids.reverse();
    assert_eq!(listed, ids);
}
