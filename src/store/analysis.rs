use super::StoreError;
use crate::analysis::result::{AnalysisSummary, FinalResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Persistence for finished analyses, keyed by result id
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn save(&self, result: &FinalResult) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<FinalResult>, StoreError>;

    /// Metadata for every stored analysis, newest first
    async fn list(&self) -> Result<Vec<AnalysisSummary>, StoreError>;

    fn name(&self) -> &str;
}

fn newest_first(mut summaries: Vec<AnalysisSummary>) -> Vec<AnalysisSummary> {
    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    summaries
}

#[derive(Debug, Default)]
pub struct InMemoryAnalysisStore {
    results: RwLock<HashMap<Uuid, FinalResult>>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn save(&self, result: &FinalResult) -> Result<(), StoreError> {
        self.results
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(result.id(), result.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FinalResult>, StoreError> {
        Ok(self
            .results
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(&id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<AnalysisSummary>, StoreError> {
        let summaries = self
            .results
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .map(FinalResult::summary)
            .collect();
        Ok(newest_first(summaries))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// One pretty-printed JSON file per analysis: `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileAnalysisStore {
    dir: PathBuf,
}

impl JsonFileAnalysisStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl AnalysisStore for JsonFileAnalysisStore {
    async fn save(&self, result: &FinalResult) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path_for(result.id());
        let json = serde_json::to_string_pretty(result)?;

        // Write-then-rename so readers never observe a partial file
        let tmp = path.with_extension("json.tmp");
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| StoreError::io(&path, e)),
            Err(e) => Err(StoreError::io(&tmp, e)),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                debug!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e);
        }

        debug!("Saved analysis {} to {}", result.id(), path.display());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FinalResult>, StoreError> {
        let path = self.path_for(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<AnalysisSummary>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            match serde_json::from_str::<FinalResult>(&contents) {
                Ok(result) => summaries.push(result.summary()),
                Err(e) => warn!("Skipping unreadable analysis {}: {}", path.display(), e),
            }
        }

        Ok(newest_first(summaries))
    }

    fn name(&self) -> &str {
        "json-file"
    }
}
