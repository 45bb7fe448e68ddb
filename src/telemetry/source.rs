use crate::analysis::{AnalysisRequest, ModelSelector, TelemetryWindow};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Telemetry dataset not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid telemetry in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The two datasets every analysis compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Initial,
    Validation,
}

impl Period {
    pub fn file_stem(&self) -> &'static str {
        match self {
            Period::Initial => "initial",
            Period::Validation => "validation",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Supplies telemetry windows from some external dataset
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn window(&self, period: Period) -> Result<TelemetryWindow, TelemetryError>;

    /// Builds a request from both periods
    async fn request(&self, selector: ModelSelector) -> Result<AnalysisRequest, TelemetryError> {
        let initial = self.window(Period::Initial).await?;
        let validation = self.window(Period::Validation).await?;
        Ok(AnalysisRequest::new(initial, validation, selector))
    }
}

/// Reads `<dir>/initial.json` and `<dir>/validation.json`, each shaped
/// `{"fish": [...], "plant": [...]}`
#[derive(Debug, Clone)]
pub struct JsonTelemetrySource {
    dir: PathBuf,
}

impl JsonTelemetrySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, period: Period) -> PathBuf {
        self.dir.join(format!("{}.json", period.file_stem()))
    }
}

#[async_trait]
impl TelemetrySource for JsonTelemetrySource {
    async fn window(&self, period: Period) -> Result<TelemetryWindow, TelemetryError> {
        let path = self.path_for(period);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TelemetryError::NotFound(path))
            }
            Err(source) => return Err(TelemetryError::Io { path, source }),
        };

        let window: TelemetryWindow = serde_json::from_str(&contents)
            .map_err(|source| TelemetryError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!(
            "Loaded {} telemetry: {} fish, {} plant readings",
            period,
            window.fish().len(),
            window.plant().len()
        );
        Ok(window)
    }
}
