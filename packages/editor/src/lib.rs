//! # Outliner Editor
//!
//! Live editing engine for outline documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: validate + normalize on load        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document lifecycle + mutations      │
//! │  - Arena outline with stable node keys      │
//! │  - Transactions with rollback               │
//! │  - Structural selection state machine       │
//! │  - Per-session keymap and zoom              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ collab: replication + readiness             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Serialized JSON is the exchange format**: the live outline is a view
//!    that exports back to it losslessly
//! 2. **Repair before edit**: a loaded document is normalized before any
//!    mutation runs against it
//! 3. **Note-level operations**: mutations address notes by id, never by
//!    position
//! 4. **Sessions own their state**: selection, keymap and zoom live on the
//!    session
//!
//! ## Usage
//!
//! ```rust,ignore
//! use outliner_editor::{Document, DocumentOptions, EditSession, Key, KeyChord, SessionConfig};
//!
//! let document = Document::load_str(&json, "doc-1", DocumentOptions::default())?;
//! let mut session = EditSession::new("client-1", document, &SessionConfig::default())?;
//!
//! session.set_caret("note2", 0)?;
//! session.handle_key(KeyChord::shift(Key::ArrowDown))?;
//! session.handle_key(KeyChord::shift(Key::ArrowDown))?;
//! let heads = session.selection().head_note_ids(session.outline());
//!
//! let persisted = session.document().to_persisted_json()?;
//! ```

mod document;
mod errors;
mod keymap;
mod mutations;
mod outline;
mod selection;
mod session;

pub use document::{CommitEvent, Document, DocumentOptions, Transaction};
pub use errors::EditorError;
pub use keymap::{Command, Key, KeyChord, Keymap, Modifiers};
pub use mutations::{Mutation, MutationResult, NoteIdPool};
pub use outline::{Descendants, LiveNode, NodeKey, NodeKind, Outline};
pub use selection::{
    resolve_heads, CollapseEdge, Direction, Point, RangeSelection, SelectionStage,
    StructuralSelection,
};
pub use session::{EditSession, SessionConfig};
