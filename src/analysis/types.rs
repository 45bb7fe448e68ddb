//! Telemetry and request types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One fish-tank sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishReading {
    #[serde(alias = "date")]
    pub timestamp: String,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub temperature: f64,
    pub ammonia: f64,
}

/// One grow-bed sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantReading {
    #[serde(alias = "date")]
    pub timestamp: String,
    pub height: f64,
    pub growth_rate: f64,
    #[serde(alias = "EC")]
    pub ec: f64,
}

/// Fish and plant series for one period. Read-only after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryWindow {
    #[serde(default)]
    fish: Vec<FishReading>,
    #[serde(default)]
    plant: Vec<PlantReading>,
}

impl TelemetryWindow {
    pub fn new(fish: Vec<FishReading>, plant: Vec<PlantReading>) -> Self {
        Self { fish, plant }
    }

    pub fn fish(&self) -> &[FishReading] {
        &self.fish
    }

    pub fn plant(&self) -> &[PlantReading] {
        &self.plant
    }

    pub fn is_empty(&self) -> bool {
        self.fish.is_empty() && self.plant.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fish.len() + self.plant.len()
    }

    fn first_non_finite(&self) -> Option<String> {
        for r in &self.fish {
            for (name, v) in [("pH", r.ph), ("temperature", r.temperature), ("ammonia", r.ammonia)] {
                if !v.is_finite() {
                    return Some(format!("fish {} at {}", name, r.timestamp));
                }
            }
        }
        for r in &self.plant {
            for (name, v) in [("height", r.height), ("growth_rate", r.growth_rate), ("ec", r.ec)] {
                if !v.is_finite() {
                    return Some(format!("plant {} at {}", name, r.timestamp));
                }
            }
        }
        None
    }
}

/// Which providers take part in an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelSelector {
    #[serde(rename = "deepseek-r1", alias = "primary")]
    PrimaryOnly,
    #[serde(rename = "o1-mini", alias = "validator")]
    ValidatorOnly,
    #[default]
    #[serde(rename = "ensemble", other)]
    Ensemble,
}

impl ModelSelector {
    /// Human-readable label stored with each result
    pub fn model_label(&self) -> &'static str {
        match self {
            ModelSelector::PrimaryOnly => "Deepseek R1",
            ModelSelector::ValidatorOnly => "O1 Mini",
            ModelSelector::Ensemble => "Deepseek R1 + O1 Mini",
        }
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelSelector::PrimaryOnly => "primary-only",
            ModelSelector::ValidatorOnly => "validator-only",
            ModelSelector::Ensemble => "ensemble",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("request contains no telemetry")]
    NoTelemetry,
    #[error("non-finite reading: {0}")]
    NonFiniteReading(String),
}

/// One inbound analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub initial_data: TelemetryWindow,
    #[serde(default)]
    pub validation_data: TelemetryWindow,
    #[serde(default, rename = "modelType")]
    pub model_selector: ModelSelector,
    /// Passed through to the stored result
    #[serde(default)]
    pub system_config: Value,
}

impl AnalysisRequest {
    pub fn new(initial: TelemetryWindow, validation: TelemetryWindow, selector: ModelSelector) -> Self {
        Self {
            initial_data: initial,
            validation_data: validation,
            model_selector: selector,
            system_config: Value::Object(Default::default()),
        }
    }

    /// Rejects requests that no provider could usefully analyze
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.initial_data.is_empty() && self.validation_data.is_empty() {
            return Err(RequestError::NoTelemetry);
        }
        if let Some(field) = self
            .initial_data
            .first_non_finite()
            .or_else(|| self.validation_data.first_non_finite())
        {
            return Err(RequestError::NonFiniteReading(field));
        }
        Ok(())
    }
}
