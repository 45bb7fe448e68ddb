//! Final analysis records

use super::schema::StructuredAnalysis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The orchestrator's answer to one request.
///
/// Identity, timestamp and confidence are assigned once at construction and
/// only exposed through getters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    id: Uuid,
    timestamp: DateTime<Utc>,
    #[serde(rename = "modelUsed")]
    model_used: String,
    #[serde(rename = "systemConfig", default)]
    system_config: Value,
    results: StructuredAnalysis,
    confidence_score: f64,
    prompt_template: String,
}

impl FinalResult {
    pub fn new(
        model_used: impl Into<String>,
        system_config: Value,
        results: StructuredAnalysis,
        confidence_score: f64,
        prompt_template: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            model_used: model_used.into(),
            system_config,
            results,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            prompt_template: prompt_template.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn model_used(&self) -> &str {
        &self.model_used
    }

    pub fn system_config(&self) -> &Value {
        &self.system_config
    }

    pub fn results(&self) -> &StructuredAnalysis {
        &self.results
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn prompt_template(&self) -> &str {
        &self.prompt_template
    }

    pub fn is_degraded(&self) -> bool {
        self.results.is_degraded()
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id,
            timestamp: self.timestamp,
            model_used: self.model_used.clone(),
            confidence_score: self.confidence_score,
        }
    }
}

/// History listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "modelUsed")]
    pub model_used: String,
    pub confidence_score: f64,
}
