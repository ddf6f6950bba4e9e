//! # Normalizer
//!
//! Repairs everything the validator reports, in a single pass over the
//! serialized tree built on [`transform_document`]. Running the normalizer on
//! its own output records no repairs and returns an equal document.
//!
//! ```text
//! enter (pre-order)    content items: missing / duplicate note ids
//! leave (post-order)   lists: indent jumps, orphan / empty wrappers
//! ```
//!
//! Note ids are fixed on the way down so the first occurrence of a duplicated
//! id, in document order, is the one that keeps it. List structure is fixed
//! on the way up: when a list is finished, every list below it already holds.

use crate::error::SchemaError;
use crate::issue::{IssueCode, SchemaIssue};
use crate::validator::{validate, wrapper_has_content};
use outliner_model::{
    transform_document, NodePath, NoteIdGenerator, SerializedDocument, SerializedNode,
    TreeVisitor,
};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// One change made by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repair {
    pub code: IssueCode,

    /// Input location of the repaired item, or of the list whose items moved
    pub path: NodePath,

    /// Id assigned to the item, for note id repairs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
}

#[derive(Debug)]
pub struct NormalizeOutcome {
    pub document: SerializedDocument,
    pub repairs: Vec<Repair>,

    /// Issues the repair pass failed to fix
    pub residual: Vec<SchemaIssue>,
}

impl NormalizeOutcome {
    pub fn changed(&self) -> bool {
        !self.repairs.is_empty()
    }
}

/// Configurable repair run
///
/// ```ignore
/// let outcome = Normalizer::new(&mut generator).exclude(doc_id).run(&document)?;
/// ```
pub struct Normalizer<'g> {
    generator: &'g mut NoteIdGenerator,
    exclude: HashSet<String>,
}

impl<'g> Normalizer<'g> {
    pub fn new(generator: &'g mut NoteIdGenerator) -> Self {
        Self {
            generator,
            exclude: HashSet::new(),
        }
    }

    /// Never hand out `id` as a fresh note id
    pub fn exclude(mut self, id: impl Into<String>) -> Self {
        self.exclude.insert(id.into());
        self
    }

    pub fn run(self, document: &SerializedDocument) -> Result<NormalizeOutcome, SchemaError> {
        let mut taken = document.root.note_ids();
        taken.extend(self.exclude);

        let mut pass = RepairPass {
            generator: self.generator,
            taken,
            assigned: HashSet::new(),
            repairs: Vec::new(),
        };
        let document = transform_document(document, &mut pass)?;

        let residual = validate(&document);
        for issue in &residual {
            tracing::warn!("normalizer left an issue behind: {}", issue);
        }
        if !pass.repairs.is_empty() {
            tracing::debug!(repairs = pass.repairs.len(), "normalized document");
        }

        Ok(NormalizeOutcome {
            document,
            repairs: pass.repairs,
            residual,
        })
    }
}

/// Repair `document` with a fresh random generator
pub fn normalize(document: &SerializedDocument) -> Result<SerializedDocument, SchemaError> {
    let mut generator = NoteIdGenerator::new();
    Ok(Normalizer::new(&mut generator).run(document)?.document)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Content,
    Wrapper,
}

struct RepairPass<'g> {
    generator: &'g mut NoteIdGenerator,
    /// Every id in the input, every exclusion and every id handed out
    taken: HashSet<String>,
    /// Ids already kept or assigned in the output
    assigned: HashSet<String>,
    repairs: Vec<Repair>,
}

impl TreeVisitor for RepairPass<'_> {
    fn enter(&mut self, shell: &mut SerializedNode, original: &SerializedNode, path: &NodePath) {
        // The shell has no children yet, so classify by the original.
        if original.is_content_item() {
            self.fix_note_id(shell, path);
        }
    }

    fn leave(&mut self, mut node: SerializedNode, path: &NodePath) -> SerializedNode {
        if node.is_list() && node.children.is_some() {
            let items = node.take_children();
            node.children = Some(self.repair_items(items, path));
        }
        node
    }
}

impl RepairPass<'_> {
    fn record(&mut self, code: IssueCode, path: &NodePath, note_id: Option<String>) {
        tracing::debug!(%code, %path, "repaired");
        self.repairs.push(Repair {
            code,
            path: path.clone(),
            note_id,
        });
    }

    fn fix_note_id(&mut self, item: &mut SerializedNode, path: &NodePath) {
        let code = match item.note_id().filter(|id| !id.is_empty()) {
            Some(id) => {
                if self.assigned.insert(id.to_string()) {
                    return;
                }
                IssueCode::DuplicateNoteId
            }
            None => IssueCode::MissingNoteId,
        };

        let fresh = self.generator.create_note_id(&self.taken);
        self.taken.insert(fresh.clone());
        self.assigned.insert(fresh.clone());
        item.set_note_id(&fresh);
        self.record(code, path, Some(fresh));
    }

    /// Rebuild the direct items of one list
    ///
    /// Items moved out of a nested list go back on the front of the queue, so
    /// they are checked against their new neighbours like any other item.
    fn repair_items(&mut self, items: Vec<SerializedNode>, path: &NodePath) -> Vec<SerializedNode> {
        let mut queue: VecDeque<SerializedNode> = items.into();
        let mut out: Vec<SerializedNode> = Vec::with_capacity(queue.len());
        let mut previous: Option<ItemKind> = None;

        while let Some(mut item) = queue.pop_front() {
            if item.is_list() {
                self.record(IssueCode::IndentJump, path, None);
                prepend(&mut queue, item.take_children());
                continue;
            }
            if !item.is_list_item() {
                out.push(item);
                continue;
            }
            if !item.is_wrapper() {
                previous = Some(ItemKind::Content);
                out.push(item);
                continue;
            }

            merge_lists(&mut item);
            if !wrapper_has_content(&item) {
                self.record(IssueCode::ListWrapperNoListitem, path, None);
                prepend(&mut queue, take_wrapped_items(&mut item));
                continue;
            }

            match previous {
                Some(ItemKind::Content) => {
                    previous = Some(ItemKind::Wrapper);
                    out.push(item);
                }
                None => {
                    self.record(IssueCode::WrapperWithoutSibling, path, None);
                    prepend(&mut queue, take_wrapped_items(&mut item));
                }
                Some(ItemKind::Wrapper) => {
                    self.record(IssueCode::WrapperWithoutSibling, path, None);
                    let moved = take_wrapped_items(&mut item);
                    match out.iter_mut().rev().find(|node| node.is_list_item()) {
                        Some(owner) => append_wrapped(owner, moved),
                        None => prepend(&mut queue, moved),
                    }
                }
            }
        }

        out
    }
}

fn prepend(queue: &mut VecDeque<SerializedNode>, items: Vec<SerializedNode>) {
    for item in items.into_iter().rev() {
        queue.push_front(item);
    }
}

/// Fold every list of a wrapper into its first one
fn merge_lists(wrapper: &mut SerializedNode) {
    let Some(lists) = wrapper.children.as_mut() else {
        return;
    };
    if lists.len() < 2 {
        return;
    }
    let rest = lists.split_off(1);
    let first = &mut lists[0];
    for mut list in rest {
        let items = list.take_children();
        first.children.get_or_insert_with(Vec::new).extend(items);
    }
}

fn take_wrapped_items(wrapper: &mut SerializedNode) -> Vec<SerializedNode> {
    wrapper
        .take_children()
        .into_iter()
        .flat_map(|mut list: SerializedNode| list.take_children())
        .collect()
}

fn append_wrapped(wrapper: &mut SerializedNode, items: Vec<SerializedNode>) {
    if let Some(list) = wrapper.children.as_mut().and_then(|lists| lists.first_mut()) {
        list.children.get_or_insert_with(Vec::new).extend(items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outliner_model::SerializedNode as N;
    use pretty_assertions::assert_eq;

    fn run(document: &SerializedDocument) -> NormalizeOutcome {
        let mut generator = NoteIdGenerator::seeded(1);
        Normalizer::new(&mut generator).run(document).unwrap()
    }

    fn codes(outcome: &NormalizeOutcome) -> Vec<IssueCode> {
        outcome.repairs.iter().map(|repair| repair.code).collect()
    }

    #[test]
    fn test_wrapper_at_list_start_is_hoisted() {
        let input = SerializedDocument::from_items(vec![
            N::wrapper(vec![N::note(Some("a"), "A"), N::note(Some("b"), "B")]),
            N::note(Some("c"), "C"),
        ]);

        let outcome = run(&input);
        assert_eq!(
            outcome.document,
            SerializedDocument::from_items(vec![
                N::note(Some("a"), "A"),
                N::note(Some("b"), "B"),
                N::note(Some("c"), "C"),
            ])
        );
        assert_eq!(codes(&outcome), vec![IssueCode::WrapperWithoutSibling]);
        assert!(outcome.residual.is_empty());
    }

    #[test]
    fn test_duplicate_id_keeps_first_occurrence() {
        let input = SerializedDocument::from_items(vec![
            N::note(Some("dup"), "first"),
            N::note(Some("dup"), "second"),
        ]);

        let outcome = run(&input);
        let items = outcome.document.root.children()[0].children();
        assert_eq!(items[0].note_id(), Some("dup"));
        let fresh = items[1].note_id().unwrap();
        assert_ne!(fresh, "dup");
        assert!(!fresh.is_empty());
        assert_eq!(items[1].text_content(), "second");

        assert_eq!(outcome.repairs.len(), 1);
        assert_eq!(outcome.repairs[0].code, IssueCode::DuplicateNoteId);
        assert_eq!(outcome.repairs[0].path.to_string(), "root/0/1");
        assert_eq!(outcome.repairs[0].note_id.as_deref(), Some(fresh));
    }

    #[test]
    fn test_fresh_ids_avoid_ids_that_appear_later() {
        let mut candidates = vec!["later", "fresh"].into_iter();
        let mut generator =
            NoteIdGenerator::with_source(move || candidates.next().unwrap_or("z").to_string());

        let input =
            SerializedDocument::from_items(vec![N::note(None, "A"), N::note(Some("later"), "B")]);
        let outcome = Normalizer::new(&mut generator).run(&input).unwrap();

        let items = outcome.document.root.children()[0].children();
        assert_eq!(items[0].note_id(), Some("fresh"));
        assert_eq!(items[1].note_id(), Some("later"));
        assert_eq!(codes(&outcome), vec![IssueCode::MissingNoteId]);
    }

    #[test]
    fn test_excluded_ids_are_never_assigned() {
        let mut candidates = vec!["doc-1", "note-1"].into_iter();
        let mut generator =
            NoteIdGenerator::with_source(move || candidates.next().unwrap_or("z").to_string());

        let input = SerializedDocument::from_items(vec![N::note(Some(""), "A")]);
        let outcome = Normalizer::new(&mut generator)
            .exclude("doc-1")
            .run(&input)
            .unwrap();

        let items = outcome.document.root.children()[0].children();
        assert_eq!(items[0].note_id(), Some("note-1"));
    }

    #[test]
    fn test_wrapper_after_wrapper_joins_previous_children() {
        let input = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A"),
            N::wrapper(vec![N::note(Some("b"), "B")]),
            N::wrapper(vec![N::note(Some("c"), "C")]),
            N::note(Some("d"), "D"),
        ]);

        let outcome = run(&input);
        assert_eq!(
            outcome.document,
            SerializedDocument::from_items(vec![
                N::note(Some("a"), "A"),
                N::wrapper(vec![N::note(Some("b"), "B"), N::note(Some("c"), "C")]),
                N::note(Some("d"), "D"),
            ])
        );
        assert_eq!(codes(&outcome), vec![IssueCode::WrapperWithoutSibling]);
    }

    #[test]
    fn test_indent_jump_is_spliced_into_parent_list() {
        let input = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A"),
            N::list(vec![N::note(Some("b"), "B"), N::note(Some("c"), "C")]),
            N::note(Some("d"), "D"),
        ]);

        let outcome = run(&input);
        assert_eq!(
            outcome.document,
            SerializedDocument::from_items(vec![
                N::note(Some("a"), "A"),
                N::note(Some("b"), "B"),
                N::note(Some("c"), "C"),
                N::note(Some("d"), "D"),
            ])
        );
        assert_eq!(codes(&outcome), vec![IssueCode::IndentJump]);
        assert_eq!(outcome.repairs[0].path.to_string(), "root/0");
    }

    #[test]
    fn test_empty_wrapper_is_pruned() {
        let input = SerializedDocument::from_items(vec![N::note(Some("a"), "A"), N::wrapper(vec![])]);

        let outcome = run(&input);
        assert_eq!(
            outcome.document,
            SerializedDocument::from_items(vec![N::note(Some("a"), "A")])
        );
        assert_eq!(codes(&outcome), vec![IssueCode::ListWrapperNoListitem]);
    }

    #[test]
    fn test_wrapper_lists_are_merged() {
        let wrapper = N::new("listitem").with_children(vec![
            N::list(vec![N::note(Some("b"), "B")]),
            N::list(vec![N::note(Some("c"), "C")]),
        ]);
        let input = SerializedDocument::from_items(vec![N::note(Some("a"), "A"), wrapper]);

        let outcome = run(&input);
        assert_eq!(
            outcome.document,
            SerializedDocument::from_items(vec![
                N::note(Some("a"), "A"),
                N::wrapper(vec![N::note(Some("b"), "B"), N::note(Some("c"), "C")]),
            ])
        );
        assert!(!outcome.changed());
    }

    #[test]
    fn test_valid_document_is_untouched() {
        let input = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A").with_field("folded", true),
            N::wrapper(vec![N::note(Some("b"), "")]),
        ]);

        let outcome = run(&input);
        assert_eq!(outcome.document, input);
        assert!(!outcome.changed());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = SerializedDocument::from_items(vec![
            N::wrapper(vec![N::note(None, "orphan")]),
            N::note(Some("x"), "A"),
            N::wrapper(vec![N::list(vec![N::note(Some("x"), "deep")])]),
            N::wrapper(vec![]),
            N::wrapper(vec![N::note(Some(""), "B")]),
        ]);

        let once = run(&input);
        assert!(once.changed());
        assert!(once.residual.is_empty());

        let twice = run(&once.document);
        assert!(!twice.changed());
        assert_eq!(twice.document, once.document);
    }

    #[test]
    fn test_normalize_rejects_non_root_document() {
        let document = SerializedDocument::new(N::list(vec![]));
        assert!(matches!(normalize(&document), Err(SchemaError::Model(_))));
    }
}
