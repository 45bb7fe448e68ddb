//! Telemetry analysis pipeline
//!
//! Request and result types, reply normalization, the fallback catalog and
//! the two-stage orchestrator built on top of [`crate::ai`].

pub mod fallback;
pub mod normalizer;
pub mod orchestrator;
pub mod prompt;
pub mod result;
pub mod schema;
pub mod types;

pub use fallback::{FallbackCatalog, FallbackScenario};
pub use normalizer::{normalize, ParseFailure};
pub use orchestrator::{AnalysisOrchestrator, ConfidencePolicy};
pub use prompt::PromptBuilder;
pub use result::{AnalysisSummary, FinalResult};
pub use schema::StructuredAnalysis;
pub use types::{
    AnalysisRequest, FishReading, ModelSelector, PlantReading, RequestError, TelemetryWindow,
};
