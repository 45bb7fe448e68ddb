//! Storage collaborators
//!
//! The orchestrator and chat service depend only on the traits here; which
//! concrete store backs them is the caller's choice.

mod analysis;
mod session;

pub use analysis::{AnalysisStore, InMemoryAnalysisStore, JsonFileAnalysisStore};
pub use session::{ChatTurn, InMemorySessionStore, SessionStore};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stored JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
