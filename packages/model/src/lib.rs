//! # Outliner Model
//!
//! Serialized form of an outline document and the pure operations over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: serialized JSON tree                 │
//! │  - node types + extension attributes        │
//! │  - note id allocation                       │
//! │  - stack-based tree transform               │
//! │  - link persistence/runtime forms           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ schema: validator + repair engine           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: live outline, selection, sessions   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod attributes;
mod error;
pub mod ids;
pub mod links;
pub mod node;
pub mod transform;

pub use attributes::{
    AttributeKey, AttributeRegistry, AttributeType, Attributes, CheckState, CHECKED, FOLDED,
    NOTE_ID,
};
pub use error::{ModelError, ModelResult};
pub use ids::{
    create_note_id, is_valid_note_id, NoteIdGenerator, NOTE_ID_ALPHABET, NOTE_ID_LENGTH,
};
pub use links::{collect_links, transform_for_persistence, transform_for_runtime};
pub use node::{count_nodes, NodePath, SerializedDocument, SerializedNode};
pub use transform::{transform, transform_document, transform_with, TreeVisitor};
