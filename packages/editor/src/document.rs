//! # Document Handle
//!
//! A loaded outline document and its editing state.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Hydrate links → Normalize → Edit (transactions) → Persist
//!   ↓          ↓              ↓               ↓               ↓
//! JSON    runtime form   valid tree      live outline       JSON
//! ```
//!
//! Edits happen inside [`Document::update`]. A transaction either commits as
//! a whole or leaves the document untouched. Commit listeners run after the
//! commit and may not start another transaction.

use crate::errors::EditorError;
use crate::mutations::{Mutation, MutationResult, NoteIdPool};
use crate::outline::Outline;
use outliner_model::{
    transform_for_persistence, transform_for_runtime, AttributeRegistry, NoteIdGenerator,
    SerializedDocument,
};
use outliner_schema::{validate, Normalizer, Repair, SchemaIssue};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    /// Re-validate after every commit and log any issue
    pub validate_on_commit: bool,
}

/// Passed to commit listeners
#[derive(Debug, Clone)]
pub struct CommitEvent {
    pub version: u64,
    pub mutations: Vec<Mutation>,
}

type CommitListener = Box<dyn FnMut(&mut Document, &CommitEvent) -> Result<(), EditorError> + Send>;

/// Editable outline document
pub struct Document {
    doc_id: String,

    /// Increments on every commit that changed something
    version: u64,

    outline: Outline,
    ids: NoteIdPool,
    options: DocumentOptions,

    /// Repairs made while loading
    repairs: Vec<Repair>,

    listeners: Vec<CommitListener>,
    notifying: bool,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("doc_id", &self.doc_id)
            .field("version", &self.version)
            .field("notes", &self.outline.content_items().count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Edit access inside [`Document::update`]
pub struct Transaction<'a> {
    outline: &'a mut Outline,
    ids: &'a mut NoteIdPool,
    applied: Vec<Mutation>,
}

impl Transaction<'_> {
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, EditorError> {
        let result = mutation.apply(self.outline, self.ids)?;
        tracing::debug!(?mutation, "applied mutation");
        self.applied.push(mutation);
        Ok(result)
    }

    pub fn outline(&self) -> &Outline {
        self.outline
    }
}

impl Document {
    /// Load persisted JSON with a random id generator
    pub fn load(value: &Value, doc_id: &str, options: DocumentOptions) -> Result<Self, EditorError> {
        Self::load_with(value, doc_id, options, NoteIdGenerator::new())
    }

    /// Load persisted JSON text; unlike a [`Value`] this has no depth limit
    pub fn load_str(source: &str, doc_id: &str, options: DocumentOptions) -> Result<Self, EditorError> {
        let persisted = SerializedDocument::from_json_str(source)?;
        Self::from_persisted(&persisted, doc_id, options, NoteIdGenerator::new())
    }

    pub fn load_with(
        value: &Value,
        doc_id: &str,
        options: DocumentOptions,
        generator: NoteIdGenerator,
    ) -> Result<Self, EditorError> {
        let persisted = SerializedDocument::from_value(value)?;
        Self::from_persisted(&persisted, doc_id, options, generator)
    }

    /// Open a persisted document
    ///
    /// Links are rehydrated to their runtime form and the tree is repaired
    /// before it becomes editable; the repairs are kept in
    /// [`Document::load_repairs`].
    pub fn from_persisted(
        persisted: &SerializedDocument,
        doc_id: &str,
        options: DocumentOptions,
        mut generator: NoteIdGenerator,
    ) -> Result<Self, EditorError> {
        let runtime = transform_for_runtime(persisted, doc_id);
        let outcome = Normalizer::new(&mut generator)
            .exclude(doc_id)
            .run(&runtime)?;
        if outcome.changed() {
            tracing::info!(doc_id, repairs = outcome.repairs.len(), "repaired document on load");
        }

        let outline = Outline::from_serialized(&outcome.document.root, AttributeRegistry::outline());
        let mut reserved = outline.note_ids();
        reserved.insert(doc_id.to_string());
        tracing::info!(doc_id, notes = reserved.len() - 1, "loaded document");

        Ok(Self {
            doc_id: doc_id.to_string(),
            version: 0,
            outline,
            ids: NoteIdPool::new(generator, reserved),
            options,
            repairs: outcome.repairs,
            listeners: Vec::new(),
            notifying: false,
        })
    }

    /// Empty document
    pub fn new(doc_id: &str, options: DocumentOptions) -> Self {
        let reserved = std::iter::once(doc_id.to_string()).collect();
        Self {
            doc_id: doc_id.to_string(),
            version: 0,
            outline: Outline::empty(),
            ids: NoteIdPool::new(NoteIdGenerator::new(), reserved),
            options,
            repairs: Vec::new(),
            listeners: Vec::new(),
            notifying: false,
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn load_repairs(&self) -> &[Repair] {
        &self.repairs
    }

    /// Register a listener called after every commit
    pub fn on_commit(
        &mut self,
        listener: impl FnMut(&mut Document, &CommitEvent) -> Result<(), EditorError> + Send + 'static,
    ) {
        self.listeners.push(Box::new(listener));
    }

    /// Run a transaction
    ///
    /// If `edit` fails, every mutation it applied is rolled back. A listener
    /// error is returned after the commit; the commit itself stands.
    pub fn update<R>(
        &mut self,
        edit: impl FnOnce(&mut Transaction<'_>) -> Result<R, EditorError>,
    ) -> Result<R, EditorError> {
        if self.notifying {
            tracing::error!(doc_id = %self.doc_id, "transaction started from a commit listener");
            return Err(EditorError::NestedTransaction);
        }

        let snapshot = self.outline.clone();
        self.ids.mark();
        let mut txn = Transaction {
            outline: &mut self.outline,
            ids: &mut self.ids,
            applied: Vec::new(),
        };
        let result = edit(&mut txn);
        let applied = txn.applied;

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(doc_id = %self.doc_id, error = %err, "transaction rolled back");
                self.outline = snapshot;
                self.ids.release_issued();
                return Err(err);
            }
        };
        if applied.is_empty() {
            return Ok(value);
        }

        self.version += 1;
        tracing::debug!(
            doc_id = %self.doc_id,
            version = self.version,
            mutations = applied.len(),
            "committed transaction"
        );
        if self.options.validate_on_commit {
            for issue in self.validate() {
                tracing::warn!(doc_id = %self.doc_id, "commit left an invalid outline: {}", issue);
            }
        }

        let event = CommitEvent {
            version: self.version,
            mutations: applied,
        };
        self.notify(&event)?;
        Ok(value)
    }

    /// Shorthand for a transaction with a single mutation
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, EditorError> {
        self.update(|txn| txn.apply(mutation))
    }

    fn notify(&mut self, event: &CommitEvent) -> Result<(), EditorError> {
        let mut listeners = std::mem::take(&mut self.listeners);
        self.notifying = true;

        let mut first_error = None;
        for listener in listeners.iter_mut() {
            if let Err(err) = listener(self, event) {
                tracing::warn!(doc_id = %self.doc_id, error = %err, "commit listener failed");
                first_error.get_or_insert(err);
            }
        }

        self.notifying = false;
        // Keep listeners registered while notifying.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Validate the current tree
    pub fn validate(&self) -> Vec<SchemaIssue> {
        validate(&self.outline.to_document())
    }

    /// Runtime serialized form (every link carries its `docId`)
    pub fn to_serialized(&self) -> SerializedDocument {
        self.outline.to_document()
    }

    /// Persisted form: same-document links lose their `docId`
    pub fn to_persisted_document(&self) -> SerializedDocument {
        transform_for_persistence(&self.to_serialized(), &self.doc_id)
    }

    pub fn to_persisted(&self) -> Value {
        self.to_persisted_document().to_value()
    }

    /// Persisted JSON text, safe for any nesting depth
    pub fn to_persisted_json(&self) -> Result<String, EditorError> {
        Ok(self.to_persisted_document().to_json_string()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn sample() -> Value {
        json!({
            "root": {
                "type": "root",
                "version": 1,
                "children": [{
                    "type": "list",
                    "version": 1,
                    "listType": "bullet",
                    "children": [
                        {
                            "type": "listitem",
                            "version": 1,
                            "noteId": "a",
                            "children": [
                                { "type": "text", "version": 1, "text": "see " },
                                { "type": "note-link", "version": 1, "noteId": "b" }
                            ]
                        },
                        {
                            "type": "listitem",
                            "version": 1,
                            "noteId": "b",
                            "children": [{ "type": "text", "version": 1, "text": "B" }]
                        }
                    ]
                }]
            }
        })
    }

    fn load(value: &Value) -> Document {
        Document::load_with(value, "doc-1", DocumentOptions::default(), NoteIdGenerator::seeded(2))
            .unwrap()
    }

    #[test]
    fn test_load_and_persist_round_trip() {
        let document = load(&sample());
        assert!(document.load_repairs().is_empty());
        assert_eq!(document.to_persisted(), sample());

        let runtime = document.to_serialized().to_value();
        let link = &runtime["root"]["children"][0]["children"][0]["children"][1];
        assert_eq!(link["docId"], json!("doc-1"));
    }

    #[test]
    fn test_load_repairs_invalid_tree() {
        let mut value = sample();
        value["root"]["children"][0]["children"][1]["noteId"] = json!("a");

        let document = load(&value);
        assert_eq!(document.load_repairs().len(), 1);
        assert!(document.validate().is_empty());
        assert_eq!(document.outline().note_ids().len(), 2);
    }

    #[test]
    fn test_load_without_root_fails() {
        let result = Document::load(&json!({}), "doc-1", DocumentOptions::default());
        assert!(matches!(result, Err(EditorError::Model(_))));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut document = load(&sample());
        let before = document.to_serialized();

        let result = document.update(|txn| {
            txn.apply(Mutation::SetText {
                note_id: "a".into(),
                text: "changed".into(),
            })?;
            txn.apply(Mutation::RemoveNote {
                note_id: "missing".into(),
            })
        });

        assert!(matches!(result, Err(EditorError::NoteNotFound(_))));
        assert_eq!(document.to_serialized(), before);
        assert_eq!(document.version(), 0);
    }

    #[test]
    fn test_commit_bumps_version_and_notifies() {
        let mut document = load(&sample());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        document.on_commit(move |_, event| {
            sink.lock().unwrap().push(event.version);
            Ok(())
        });

        let inserted = document
            .apply(Mutation::InsertNoteAfter {
                after: "b".into(),
                text: "C".into(),
            })
            .unwrap();
        let new_id = inserted.note_id.unwrap();
        assert_ne!(new_id, "doc-1");
        assert!(document.outline().find_by_note_id(&new_id).is_some());
        assert_eq!(document.version(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_listener_cannot_start_transaction() {
        let mut document = load(&sample());
        let nested = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&nested);
        document.on_commit(move |doc, _| {
            let result = doc.apply(Mutation::AppendTopLevel { text: "loop".into() });
            *sink.lock().unwrap() = Some(matches!(result, Err(EditorError::NestedTransaction)));
            Ok(())
        });

        document
            .apply(Mutation::SetFolded {
                note_id: "a".into(),
                folded: true,
            })
            .unwrap();
        assert_eq!(*nested.lock().unwrap(), Some(true));
        assert_eq!(document.version(), 1);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut candidates = vec!["b", "c"].into_iter();
        let generator =
            NoteIdGenerator::with_source(move || candidates.next().unwrap_or("z").to_string());
        let mut document =
            Document::load_with(&sample(), "doc-1", DocumentOptions::default(), generator).unwrap();

        document
            .apply(Mutation::RemoveNote { note_id: "b".into() })
            .unwrap();
        let inserted = document
            .apply(Mutation::AppendTopLevel { text: String::new() })
            .unwrap();
        assert_eq!(inserted.note_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_rolled_back_ids_are_released() {
        let mut candidates = vec!["x", "x", "y"].into_iter();
        let generator =
            NoteIdGenerator::with_source(move || candidates.next().unwrap_or("z").to_string());
        let mut document =
            Document::load_with(&sample(), "doc-1", DocumentOptions::default(), generator).unwrap();

        let result = document.update(|txn| {
            let draft = txn.apply(Mutation::AppendTopLevel { text: "draft".into() })?;
            assert_eq!(draft.note_id.as_deref(), Some("x"));
            txn.apply(Mutation::RemoveNote {
                note_id: "missing".into(),
            })
        });
        assert!(result.is_err());
        assert!(document.outline().find_by_note_id("x").is_none());

        let inserted = document
            .apply(Mutation::AppendTopLevel { text: "kept".into() })
            .unwrap();
        assert_eq!(inserted.note_id.as_deref(), Some("x"));
    }

    #[test]
    fn test_deep_outline_saves_and_reloads() {
        const DEPTH: usize = 1_000;
        let mut document = Document::new("doc-1", DocumentOptions::default());
        let deepest = document
            .update(|txn| {
                let top = txn.apply(Mutation::AppendTopLevel { text: "0".into() })?;
                let mut parent = top.note_id.unwrap_or_default();
                for level in 1..=DEPTH {
                    let child = txn.apply(Mutation::InsertFirstChild {
                        parent,
                        text: level.to_string(),
                    })?;
                    parent = child.note_id.unwrap_or_default();
                }
                Ok(parent)
            })
            .unwrap();

        let json = document.to_persisted_json().unwrap();
        let reloaded = Document::load_str(&json, "doc-1", DocumentOptions::default()).unwrap();
        assert!(reloaded.load_repairs().is_empty());
        assert_eq!(reloaded.outline().note_ids().len(), DEPTH + 1);

        let leaf = reloaded.outline().find_by_note_id(&deepest).unwrap();
        assert_eq!(reloaded.outline().text_of(leaf), DEPTH.to_string());
        assert_eq!(reloaded.to_persisted_json().unwrap(), json);
    }
}
