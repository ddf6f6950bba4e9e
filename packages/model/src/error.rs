use crate::node::NodePath;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Document has no root node")]
    MissingRoot,

    #[error("Root node has type `{found}`, expected `root`")]
    InvalidRoot { found: String },

    #[error("Invalid node at {path}: {reason}")]
    InvalidNode { path: String, reason: &'static str },

    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write document JSON: {0}")]
    Write(#[from] std::io::Error),
}

impl ModelError {
    pub fn invalid_node(path: &NodePath, reason: &'static str) -> Self {
        Self::InvalidNode {
            path: path.to_string(),
            reason,
        }
    }

    pub fn invalid_root(found: impl Into<String>) -> Self {
        Self::InvalidRoot {
            found: found.into(),
        }
    }
}
