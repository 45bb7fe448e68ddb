//! aquasense - resilient AI analysis for aquaponics telemetry
//!
//! Forecasts goldfish health and spearmint growth by sending telemetry to a
//! forecasting provider and, optionally, a validation provider. Provider
//! outages, rate limits and malformed replies never surface as errors: the
//! orchestrator substitutes catalogued fallback data and still returns a
//! well-formed [`FinalResult`].
//!
//! # Core Concepts
//!
//! - **Transport**: [`InferenceTransport`] calls one provider under a
//!   [`RetryPolicy`] and classifies the reply as an [`InvocationOutcome`]
//! - **Normalization**: [`analysis::normalize`] turns free-form model text
//!   into a [`StructuredAnalysis`]
//! - **Orchestration**: [`AnalysisOrchestrator`] runs the forecast and
//!   validation stages and records the result
//! - **Chat**: [`ChatService`] answers questions, with keyword diagnostics
//!   when the provider is rate limited
//!
//! # Example Usage
//!
//! ```no_run
//! use aquasense::{AnalysisOrchestrator, AquasenseConfig, InferenceTransport};
//! use aquasense::analysis::ModelSelector;
//! use aquasense::store::InMemoryAnalysisStore;
//! use aquasense::telemetry::{JsonTelemetrySource, TelemetrySource};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AquasenseConfig::default();
//! let request = JsonTelemetrySource::new(config.telemetry_dir())
//!     .request(ModelSelector::Ensemble)
//!     .await?;
//!
//! let orchestrator = AnalysisOrchestrator::new(
//!     InferenceTransport::reqwest(),
//!     config.primary_provider(),
//!     config.validator_provider(),
//!     Arc::new(InMemoryAnalysisStore::new()),
//! );
//!
//! let result = orchestrator.run(request).await;
//! println!("{} ({:.2})", result.model_used(), result.confidence_score());
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod analysis;
pub mod chat;
pub mod cli;
pub mod config;
pub mod store;
pub mod telemetry;
pub mod util;

pub use ai::{AnalysisError, InferenceTransport, InvocationOutcome, ProviderConfig, RetryPolicy};
pub use analysis::{AnalysisOrchestrator, AnalysisRequest, FinalResult, StructuredAnalysis};
pub use chat::{ChatReply, ChatService};
pub use config::{AquasenseConfig, ConfigError};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
