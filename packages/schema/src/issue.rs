use outliner_model::NodePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable issue codes consumed by diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    MissingNoteId,
    DuplicateNoteId,
    WrapperWithoutSibling,
    ListWrapperNoListitem,
    IndentJump,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingNoteId => "missing-note-id",
            IssueCode::DuplicateNoteId => "duplicate-note-id",
            IssueCode::WrapperWithoutSibling => "wrapper-without-sibling",
            IssueCode::ListWrapperNoListitem => "list-wrapper-no-listitem",
            IssueCode::IndentJump => "indent-jump",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a wrapper has no owning content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapperReason {
    ListStart,
    FollowsWrapper,
}

/// A structural violation found by the validator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaIssue {
    pub code: IssueCode,

    /// Where the offending node sits
    pub path: NodePath,

    pub node_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,

    /// First occurrence of a duplicated note id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_path: Option<NodePath>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<WrapperReason>,

    /// Nesting levels between a list and its owning item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

impl SchemaIssue {
    fn new(code: IssueCode, path: NodePath, node_type: impl Into<String>) -> Self {
        Self {
            code,
            path,
            node_type: node_type.into(),
            note_id: None,
            first_path: None,
            reason: None,
            depth: None,
        }
    }

    pub fn missing_note_id(path: NodePath, node_type: &str) -> Self {
        Self::new(IssueCode::MissingNoteId, path, node_type)
    }

    pub fn duplicate_note_id(path: NodePath, node_type: &str, note_id: &str, first: NodePath) -> Self {
        Self {
            note_id: Some(note_id.to_string()),
            first_path: Some(first),
            ..Self::new(IssueCode::DuplicateNoteId, path, node_type)
        }
    }

    pub fn wrapper_without_sibling(path: NodePath, node_type: &str, reason: WrapperReason) -> Self {
        Self {
            reason: Some(reason),
            ..Self::new(IssueCode::WrapperWithoutSibling, path, node_type)
        }
    }

    pub fn list_wrapper_no_listitem(path: NodePath, node_type: &str) -> Self {
        Self::new(IssueCode::ListWrapperNoListitem, path, node_type)
    }

    pub fn indent_jump(path: NodePath, node_type: &str, depth: usize) -> Self {
        Self {
            depth: Some(depth),
            ..Self::new(IssueCode::IndentJump, path, node_type)
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        match self.code {
            IssueCode::MissingNoteId => "list item has no note id".to_string(),
            IssueCode::DuplicateNoteId => format!(
                "note id {:?} already used at {}",
                self.note_id.as_deref().unwrap_or_default(),
                self.first_path
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            ),
            IssueCode::WrapperWithoutSibling => match self.reason {
                Some(WrapperReason::FollowsWrapper) => {
                    "nested list directly follows another nested list".to_string()
                }
                _ => "nested list at the start of its list has no owning item".to_string(),
            },
            IssueCode::ListWrapperNoListitem => "nested list contains no list item".to_string(),
            IssueCode::IndentJump => format!(
                "list nested {} levels below its owning item",
                self.depth.unwrap_or_default()
            ),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message())
    }
}
