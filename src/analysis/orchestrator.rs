use super::fallback::{FallbackCatalog, FallbackScenario};
use super::normalizer;
use super::prompt::{ensemble_template, PromptBuilder};
use super::result::FinalResult;
use super::schema::StructuredAnalysis;
use super::types::{AnalysisRequest, ModelSelector};
use crate::ai::{AnalysisError, InferenceTransport, ProviderConfig, RetryPolicy};
use crate::store::AnalysisStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Fixed confidence attached to each mode's result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    pub primary_only: f64,
    pub validator_only: f64,
    pub ensemble: f64,
}

impl ConfidencePolicy {
    pub fn for_selector(&self, selector: ModelSelector) -> f64 {
        match selector {
            ModelSelector::PrimaryOnly => self.primary_only,
            ModelSelector::ValidatorOnly => self.validator_only,
            ModelSelector::Ensemble => self.ensemble,
        }
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            primary_only: 0.78,
            validator_only: 0.82,
            ensemble: 0.87,
        }
    }
}

/// Two-stage analysis pipeline: forecast, then validation.
///
/// [`run`](Self::run) never fails. Every stage failure is absorbed here and
/// replaced by catalog data, so callers always get a well-formed
/// [`FinalResult`].
pub struct AnalysisOrchestrator {
    transport: InferenceTransport,
    primary: ProviderConfig,
    validator: ProviderConfig,
    policy: RetryPolicy,
    confidence: ConfidencePolicy,
    store: Arc<dyn AnalysisStore>,
}

impl AnalysisOrchestrator {
    pub fn new(
        transport: InferenceTransport,
        primary: ProviderConfig,
        validator: ProviderConfig,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            transport,
            primary,
            validator,
            policy: RetryPolicy::default(),
            confidence: ConfidencePolicy::default(),
            store,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_confidence(mut self, confidence: ConfidencePolicy) -> Self {
        self.confidence = confidence;
        self
    }

    pub async fn run(&self, request: AnalysisRequest) -> FinalResult {
        let start = Instant::now();
        let selector = request.model_selector;
        info!("Starting {} analysis", selector);

        let primary = self.primary_stage(&request).await;

        let (results, template) = match selector {
            ModelSelector::PrimaryOnly => (primary, self.primary.system_prompt.clone()),
            ModelSelector::ValidatorOnly => (
                self.validator_stage(&request, primary).await,
                self.validator.system_prompt.clone(),
            ),
            ModelSelector::Ensemble => (
                self.validator_stage(&request, primary).await,
                ensemble_template(&self.primary.system_prompt, &self.validator.system_prompt),
            ),
        };

        let result = FinalResult::new(
            selector.model_label(),
            request.system_config,
            results,
            self.confidence.for_selector(selector),
            template,
        );

        if let Err(e) = self.store.save(&result).await {
            warn!(
                "Failed to persist analysis {} to {} store: {}",
                result.id(),
                self.store.name(),
                e
            );
        }

        info!(
            "Analysis {} complete in {:.2}s (degraded: {})",
            result.id(),
            start.elapsed().as_secs_f64(),
            result.is_degraded()
        );
        result
    }

    async fn primary_stage(&self, request: &AnalysisRequest) -> StructuredAnalysis {
        let message =
            PromptBuilder::primary_message(&request.initial_data, &request.validation_data);

        match self.call(&self.primary, message).await {
            Ok(analysis) => analysis,
            Err(e) if e.is_provider_failure() => {
                warn!("Primary stage fell back to catalog data: {}", e);
                FallbackCatalog::get(&FallbackScenario::Primary)
            }
            Err(e) => {
                error!("Primary stage failed: {}", e);
                FallbackCatalog::get(&FallbackScenario::Error(e.to_string()))
            }
        }
    }

    /// Reviews `primary`; an internal fault here keeps `primary` and records
    /// the fault in `validation_error`
    async fn validator_stage(
        &self,
        request: &AnalysisRequest,
        primary: StructuredAnalysis,
    ) -> StructuredAnalysis {
        let message = PromptBuilder::validator_message(
            &request.initial_data,
            &request.validation_data,
            &primary,
        );

        match self.call(&self.validator, message).await {
            Ok(analysis) => analysis,
            Err(e) if e.is_provider_failure() => {
                warn!("Validator stage fell back to catalog data: {}", e);
                FallbackCatalog::get(&FallbackScenario::Validator)
            }
            Err(e) => {
                error!("Validator stage failed, keeping primary result: {}", e);
                let mut kept = primary;
                kept.validation_error = Some(e.to_string());
                kept
            }
        }
    }

    async fn call(
        &self,
        provider: &ProviderConfig,
        message: Result<String, serde_json::Error>,
    ) -> Result<StructuredAnalysis, AnalysisError> {
        let payload = provider.payload(message?).to_json();
        let body = self
            .transport
            .invoke(provider, &payload, &self.policy)
            .await
            .into_body()?;

        let analysis =
            normalizer::normalize(&body).map_err(|f| AnalysisError::Parse(f.to_string()))?;
        debug!("{} returned a structured analysis", provider.name);
        Ok(analysis)
    }
}
