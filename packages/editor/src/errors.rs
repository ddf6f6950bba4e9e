//! Error types for the editor

use outliner_model::ModelError;
use outliner_schema::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("A transaction cannot start while commit listeners are running")]
    NestedTransaction,

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Node is not attached to the document")]
    Detached,

    #[error("Invalid key chord: {0}")]
    KeyChord(String),

    #[error("Outline invariant violated: {0}")]
    Invariant(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl EditorError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }
}
