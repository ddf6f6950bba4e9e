//! Cross-note link forms.
//!
//! At runtime every `note-link` carries the `docId` it points into. Persisted
//! documents omit `docId` for links into the same document, so a document can
//! be copied or renamed without rewriting its internal links.

use crate::node::{SerializedDocument, SerializedNode, DOC_ID_FIELD};
use crate::transform::transform;
use serde_json::Value;

/// Fill in `docId` on every link that lacks one
pub fn transform_for_runtime(document: &SerializedDocument, doc_id: &str) -> SerializedDocument {
    let root = transform(&document.root, |mut node| {
        if node.is_note_link() && node.field_str(DOC_ID_FIELD).is_none() {
            node.fields
                .insert(DOC_ID_FIELD.to_string(), Value::from(doc_id));
        }
        node
    });
    SerializedDocument::new(root)
}

/// Drop `docId` from links that point into `doc_id`
pub fn transform_for_persistence(
    document: &SerializedDocument,
    doc_id: &str,
) -> SerializedDocument {
    let root = transform(&document.root, |mut node| {
        if node.is_note_link() && node.field_str(DOC_ID_FIELD) == Some(doc_id) {
            node.fields.remove(DOC_ID_FIELD);
        }
        node
    });
    SerializedDocument::new(root)
}

/// Links found in a subtree, as `(docId, noteId)` pairs
pub fn collect_links(node: &SerializedNode) -> Vec<(Option<String>, String)> {
    let mut links = Vec::new();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node.is_note_link() {
            if let Some(target) = node.note_id() {
                let doc = node.field_str(DOC_ID_FIELD).map(str::to_string);
                links.push((doc, target.to_string()));
            }
        }
        stack.extend(node.children().iter().rev());
    }
    links
}
