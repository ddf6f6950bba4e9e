//! # Outline Mutations
//!
//! Note-level operations applied inside a [`Transaction`](crate::Transaction).
//!
//! ## Mutation Semantics
//!
//! ### Insert
//! - New notes get a fresh note id immediately
//! - Ids are never reused, even after the note holding one is removed
//!
//! ### Remove
//! - Removes the note and all of its descendants
//! - A wrapper left without notes is removed too
//!
//! ### Indent / Outdent
//! - Indent makes the note the last child of its previous sibling
//! - Outdent places the note right after its parent; the siblings that
//!   followed it become its children, so document order is unchanged

use crate::errors::EditorError;
use crate::outline::{NodeKey, Outline};
use outliner_model::{CheckState, NoteIdGenerator, CHECKED, FOLDED};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Note-level operations, addressed by note id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    /// Insert a new note as the next sibling of `after`
    InsertNoteAfter { after: String, text: String },

    /// Insert a new note as the first child of `parent`
    InsertFirstChild { parent: String, text: String },

    /// Append a new note at the end of the top level
    AppendTopLevel { text: String },

    /// Replace the inline content of a note with plain text
    SetText { note_id: String, text: String },

    SetFolded { note_id: String, folded: bool },

    /// `None` clears the checkbox
    SetChecked {
        note_id: String,
        checked: Option<bool>,
    },

    /// Remove a note and its subtree
    RemoveNote { note_id: String },

    IndentNote { note_id: String },

    OutdentNote { note_id: String },
}

/// What a mutation did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationResult {
    /// Id of an inserted note
    pub note_id: Option<String>,

    /// Ids of removed notes, the target first
    pub removed: Vec<String>,
}

impl MutationResult {
    fn inserted(note_id: String) -> Self {
        Self {
            note_id: Some(note_id),
            removed: Vec::new(),
        }
    }
}

/// Note ids handed out by one document
///
/// Every id the document has ever held stays reserved, so a removed note's id
/// is never given to a new note. Ids handed out by a rolled-back transaction
/// were never held and are released again.
#[derive(Debug)]
pub struct NoteIdPool {
    generator: NoteIdGenerator,
    reserved: HashSet<String>,

    /// Ids allocated since the last [`NoteIdPool::mark`]
    issued: Vec<String>,
}

impl NoteIdPool {
    pub fn new(generator: NoteIdGenerator, reserved: HashSet<String>) -> Self {
        Self {
            generator,
            reserved,
            issued: Vec::new(),
        }
    }

    pub fn allocate(&mut self) -> String {
        let id = self.generator.create_note_id(&self.reserved);
        self.reserved.insert(id.clone());
        self.issued.push(id.clone());
        id
    }

    /// Start tracking allocations for a new transaction
    pub(crate) fn mark(&mut self) {
        self.issued.clear();
    }

    /// Release every id allocated since the last mark
    pub(crate) fn release_issued(&mut self) {
        for id in self.issued.drain(..) {
            self.reserved.remove(&id);
        }
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        self.reserved.contains(id)
    }
}

fn find(outline: &Outline, note_id: &str) -> Result<NodeKey, EditorError> {
    outline
        .find_by_note_id(note_id)
        .ok_or_else(|| EditorError::NoteNotFound(note_id.to_string()))
}

/// Index right after `item` and its wrapper
fn position_after(outline: &Outline, item: NodeKey) -> Result<(NodeKey, usize), EditorError> {
    let last = outline.wrapper_of(item).unwrap_or(item);
    let (list, index) = outline
        .index_in_parent(last)
        .ok_or(EditorError::Detached)?;
    Ok((list, index + 1))
}

impl Mutation {
    /// Note the mutation targets, if it targets an existing one
    pub fn target(&self) -> Option<&str> {
        match self {
            Mutation::InsertNoteAfter { after, .. } => Some(after),
            Mutation::InsertFirstChild { parent, .. } => Some(parent),
            Mutation::AppendTopLevel { .. } => None,
            Mutation::SetText { note_id, .. }
            | Mutation::SetFolded { note_id, .. }
            | Mutation::SetChecked { note_id, .. }
            | Mutation::RemoveNote { note_id }
            | Mutation::IndentNote { note_id }
            | Mutation::OutdentNote { note_id } => Some(note_id),
        }
    }

    pub(crate) fn apply(
        &self,
        outline: &mut Outline,
        ids: &mut NoteIdPool,
    ) -> Result<MutationResult, EditorError> {
        match self {
            Mutation::InsertNoteAfter { after, text } => {
                let anchor = find(outline, after)?;
                let (list, index) = position_after(outline, anchor)?;
                Self::insert_new(outline, ids, list, index, text)
            }

            Mutation::InsertFirstChild { parent, text } => {
                let owner = find(outline, parent)?;
                let list = outline.ensure_nested_list(owner)?;
                Self::insert_new(outline, ids, list, 0, text)
            }

            Mutation::AppendTopLevel { text } => {
                let list = outline.ensure_top_level_list()?;
                let end = outline.children(list).len();
                Self::insert_new(outline, ids, list, end, text)
            }

            Mutation::SetText { note_id, text } => {
                let item = find(outline, note_id)?;
                outline.set_text(item, text)?;
                Ok(MutationResult::default())
            }

            Mutation::SetFolded { note_id, folded } => {
                let item = find(outline, note_id)?;
                outline.attributes_mut(item)?.set(FOLDED, *folded);
                Ok(MutationResult::default())
            }

            Mutation::SetChecked { note_id, checked } => {
                let item = find(outline, note_id)?;
                outline
                    .attributes_mut(item)?
                    .set(CHECKED, CheckState::from_flag(*checked));
                Ok(MutationResult::default())
            }

            Mutation::RemoveNote { note_id } => {
                let item = find(outline, note_id)?;
                Self::apply_remove(outline, item)
            }

            Mutation::IndentNote { note_id } => {
                let item = find(outline, note_id)?;
                Self::apply_indent(outline, item, note_id)?;
                Ok(MutationResult::default())
            }

            Mutation::OutdentNote { note_id } => {
                let item = find(outline, note_id)?;
                Self::apply_outdent(outline, item, note_id)?;
                Ok(MutationResult::default())
            }
        }
    }

    fn insert_new(
        outline: &mut Outline,
        ids: &mut NoteIdPool,
        list: NodeKey,
        index: usize,
        text: &str,
    ) -> Result<MutationResult, EditorError> {
        let note_id = ids.allocate();
        let item = outline.new_content_item(&note_id, text);
        outline.insert_child(list, index, item)?;
        Ok(MutationResult::inserted(note_id))
    }

    fn apply_remove(outline: &mut Outline, item: NodeKey) -> Result<MutationResult, EditorError> {
        let mut removed: Vec<String> = Vec::new();
        let mut stack = vec![item];
        while let Some(key) = stack.pop() {
            if let Some(id) = outline.note_id(key) {
                removed.push(id.to_string());
            }
            stack.extend(outline.logical_children(key).into_iter().rev());
        }

        let list = outline.parent(item).ok_or(EditorError::Detached)?;
        if let Some(wrapper) = outline.wrapper_of(item) {
            outline.remove(wrapper)?;
        }
        outline.remove(item)?;
        outline.prune_empty_wrapper(list)?;

        Ok(MutationResult {
            note_id: None,
            removed,
        })
    }

    fn apply_indent(outline: &mut Outline, item: NodeKey, note_id: &str) -> Result<(), EditorError> {
        let previous = outline.previous_sibling_item(item).ok_or_else(|| {
            EditorError::InvalidMove(format!("{note_id} has no previous sibling to indent under"))
        })?;

        let wrapper = outline.wrapper_of(item);
        outline.detach(item)?;
        if let Some(wrapper) = wrapper {
            outline.detach(wrapper)?;
        }

        let list = outline.ensure_nested_list(previous)?;
        let end = outline.children(list).len();
        outline.insert_child(list, end, item)?;
        if let Some(wrapper) = wrapper {
            outline.insert_child(list, end + 1, wrapper)?;
        }
        Ok(())
    }

    fn apply_outdent(outline: &mut Outline, item: NodeKey, note_id: &str) -> Result<(), EditorError> {
        let parent = outline.logical_parent(item).ok_or_else(|| {
            EditorError::InvalidMove(format!("{note_id} is already at the top level"))
        })?;
        let wrapper = outline.wrapper_of(item);

        // Later siblings move under the outdented note.
        let (list, tail_start) = position_after(outline, item)?;
        let tail: Vec<NodeKey> = outline.children(list)[tail_start..].to_vec();

        outline.detach(item)?;
        if let Some(wrapper) = wrapper {
            outline.detach(wrapper)?;
        }
        for &sibling in &tail {
            outline.detach(sibling)?;
        }
        outline.prune_empty_wrapper(list)?;

        let (target, index) = position_after(outline, parent)?;
        outline.insert_child(target, index, item)?;
        if let Some(wrapper) = wrapper {
            outline.insert_child(target, index + 1, wrapper)?;
        }

        if !tail.is_empty() {
            let nested = outline.ensure_nested_list(item)?;
            for sibling in tail {
                let end = outline.children(nested).len();
                outline.insert_child(nested, end, sibling)?;
            }
        }
        Ok(())
    }
}
