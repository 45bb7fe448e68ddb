//! Command handlers
//!
//! Each handler prints its output to stdout and returns the process exit
//! code. Failures are reported on stderr with exit code 1.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::commands::{
    AlertsArgs, ChatArgs, ConfigArgs, HealthArgs, HistoryArgs, PredictArgs, ShowArgs,
};
use super::output::{HealthStatus, OutputFormatter};
use crate::ai::{InferenceTransport, ProviderConfig};
use crate::analysis::AnalysisOrchestrator;
use crate::chat::ChatService;
use crate::config::AquasenseConfig;
use crate::store::{
    AnalysisStore, InMemoryAnalysisStore, InMemorySessionStore, JsonFileAnalysisStore,
};
use crate::telemetry::{alerts, JsonTelemetrySource, Period, TelemetrySource};

fn finish(result: Result<String>) -> i32 {
    match result {
        Ok(output) => {
            if output.ends_with('\n') {
                print!("{}", output);
            } else {
                println!("{}", output);
            }
            0
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn telemetry_source(dir: &Option<PathBuf>, config: &AquasenseConfig) -> JsonTelemetrySource {
    JsonTelemetrySource::new(dir.clone().unwrap_or_else(|| config.telemetry_dir()))
}

pub async fn handle_predict(args: &PredictArgs, config: &AquasenseConfig) -> i32 {
    finish(predict(args, config).await)
}

async fn predict(args: &PredictArgs, config: &AquasenseConfig) -> Result<String> {
    let source = telemetry_source(&args.telemetry_dir, config);
    info!("Loading telemetry from {}", source.dir().display());

    let mut request = source
        .request(args.model.into())
        .await
        .context("Failed to load telemetry")?;

    if let Some(raw) = &args.system_config {
        request.system_config = serde_json::from_str::<Value>(raw)
            .context("--system-config is not valid JSON")?;
    }
    request.validate().context("Invalid analysis request")?;

    let store: Arc<dyn AnalysisStore> = if args.no_save {
        Arc::new(InMemoryAnalysisStore::new())
    } else {
        Arc::new(JsonFileAnalysisStore::new(config.analysis_dir()))
    };
    debug!("Using {} analysis store", store.name());

    let orchestrator = AnalysisOrchestrator::new(
        InferenceTransport::reqwest(),
        config.primary_provider(),
        config.validator_provider(),
        store,
    )
    .with_retry_policy(config.retry_policy()?)
    .with_confidence(config.confidence);

    let result = orchestrator.run(request).await;
    if result.is_degraded() {
        info!("Analysis {} completed with fallback data", result.id());
    }

    OutputFormatter::new(args.format.into()).format_result(&result)
}

pub async fn handle_history(args: &HistoryArgs, config: &AquasenseConfig) -> i32 {
    finish(history(args, config).await)
}

async fn history(args: &HistoryArgs, config: &AquasenseConfig) -> Result<String> {
    let store = JsonFileAnalysisStore::new(config.analysis_dir());
    let mut entries = store.list().await.context("Failed to list analyses")?;
    if let Some(limit) = args.limit {
        entries.truncate(limit);
    }
    OutputFormatter::new(args.format.into()).format_history(&entries)
}

pub async fn handle_show(args: &ShowArgs, config: &AquasenseConfig) -> i32 {
    finish(show(args, config).await)
}

async fn show(args: &ShowArgs, config: &AquasenseConfig) -> Result<String> {
    let store = JsonFileAnalysisStore::new(config.analysis_dir());
    let result = store
        .get(args.id)
        .await
        .context("Failed to read analysis")?
        .with_context(|| format!("Analysis not found: {}", args.id))?;
    OutputFormatter::new(args.format.into()).format_result(&result)
}

pub async fn handle_chat(args: &ChatArgs, config: &AquasenseConfig) -> i32 {
    finish(chat(args, config).await)
}

async fn chat(args: &ChatArgs, config: &AquasenseConfig) -> Result<String> {
    let service = ChatService::new(
        InferenceTransport::reqwest(),
        config.chat_provider(),
        Arc::new(InMemorySessionStore::new()),
    )
    .with_retry_policy(config.chat_retry_policy()?);

    let reply = service.send(args.session.clone(), &args.message).await?;
    OutputFormatter::new(args.format.into()).format_chat(&reply)
}

pub async fn handle_alerts(args: &AlertsArgs, config: &AquasenseConfig) -> i32 {
    finish(check_alerts(args, config).await)
}

async fn check_alerts(args: &AlertsArgs, config: &AquasenseConfig) -> Result<String> {
    let source = telemetry_source(&args.telemetry_dir, config);
    let period: Period = args.period.into();
    let window = source
        .window(period)
        .await
        .with_context(|| format!("Failed to load {} telemetry", period))?;

    OutputFormatter::new(args.format.into()).format_alerts(&alerts(&window))
}

pub async fn handle_health(args: &HealthArgs, config: &AquasenseConfig) -> i32 {
    let health = provider_health(config);
    finish(OutputFormatter::new(args.format.into()).format_health(&health))
}

/// Configuration status per provider. Makes no network calls.
pub fn provider_health(config: &AquasenseConfig) -> BTreeMap<String, HealthStatus> {
    [
        ("primary", config.primary_provider(), "AQUASENSE_PRIMARY_API_KEY"),
        ("validator", config.validator_provider(), "AQUASENSE_VALIDATOR_API_KEY"),
    ]
    .into_iter()
    .map(|(role, provider, key_var)| (role.to_string(), status_for(&provider, key_var)))
    .collect()
}

fn status_for(provider: &ProviderConfig, key_var: &str) -> HealthStatus {
    match provider.unconfigured_reason() {
        None => HealthStatus::available(format!(
            "{} ({})",
            provider.endpoint,
            provider.model.as_deref().unwrap_or("provider default model")
        )),
        Some(reason) => {
            HealthStatus::unavailable(reason).with_details(format!("set {}", key_var))
        }
    }
}

pub async fn handle_config(args: &ConfigArgs, config: &AquasenseConfig) -> i32 {
    finish(OutputFormatter::new(args.format.into()).format_config(config))
}
