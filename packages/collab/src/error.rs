//! Error types for collaboration

use outliner_editor::EditorError;
use outliner_model::ModelError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a readiness wait did not resolve
///
/// Each variant maps to a distinct UI state, so callers match on it rather
/// than on the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("collaboration-server-error: {0}")]
    ConnectionError(String),

    #[error("Timed out after {0:?} waiting for replication")]
    Timeout(Duration),

    #[error("Readiness wait was cancelled")]
    Cancelled,

    #[error("Replication provider closed")]
    Closed,
}

impl ReadinessError {
    /// Stable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ReadinessError::ConnectionError(_) => "collaboration-server-error",
            ReadinessError::Timeout(_) => "timeout",
            ReadinessError::Cancelled => "cancelled",
            ReadinessError::Closed => "closed",
        }
    }
}

#[derive(Error, Debug)]
pub enum PersistenceProbeError {
    #[error("Probe failed in {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe read back different bytes in {}", .0.display())]
    Mismatch(PathBuf),

    #[error("Probe was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("Failed to decode update: {0}")]
    Decode(String),

    #[error("Failed to apply update: {0}")]
    Apply(String),

    #[error("Invalid document: {0}")]
    Model(#[from] ModelError),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
