//! # Schema Validator
//!
//! One depth-first pass over a serialized outline, reporting structural
//! violations as [`SchemaIssue`] values. Validation never mutates the tree and
//! never fails for data problems; only a malformed document shape (no root)
//! is an error, and that is caught when the JSON is parsed.
//!
//! The walk keeps its own stack so arbitrarily deep documents are safe.

use crate::error::SchemaError;
use crate::issue::{SchemaIssue, WrapperReason};
use outliner_model::{NodePath, SerializedDocument, SerializedNode};
use serde_json::Value;
use std::collections::HashMap;

/// Validate a parsed document
pub fn validate(document: &SerializedDocument) -> Vec<SchemaIssue> {
    Validator::new(&document.root).run()
}

/// Parse and validate a JSON document
pub fn validate_json(value: &Value) -> Result<Vec<SchemaIssue>, SchemaError> {
    let document = SerializedDocument::from_value(value)?;
    Ok(validate(&document))
}

enum Step<'a> {
    Enter {
        node: &'a SerializedNode,
        index: Option<usize>,
        /// Directly nested lists ending at the parent
        lists: usize,
    },
    Exit,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Content,
    Wrapper,
}

struct Validator<'a> {
    root: &'a SerializedNode,
    issues: Vec<SchemaIssue>,
    seen: HashMap<&'a str, &'a SerializedNode>,
}

impl<'a> Validator<'a> {
    fn new(root: &'a SerializedNode) -> Self {
        Self {
            root,
            issues: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn run(mut self) -> Vec<SchemaIssue> {
        // Paths are maintained incrementally; cloning one per node would be
        // quadratic on deep chains.
        let mut path = NodePath::root();
        let mut stack = vec![Step::Enter {
            node: self.root,
            index: None,
            lists: 0,
        }];

        while let Some(step) = stack.pop() {
            let (node, index, lists) = match step {
                Step::Enter { node, index, lists } => (node, index, lists),
                Step::Exit => {
                    path.pop();
                    continue;
                }
            };
            if let Some(index) = index {
                path.push(index);
                stack.push(Step::Exit);
            }

            let child_lists = if node.is_list() {
                let depth = lists + 1;
                if depth > 1 {
                    self.issues
                        .push(SchemaIssue::indent_jump(path.clone(), &node.node_type, depth));
                }
                self.check_list_items(node, &path);
                depth
            } else {
                if node.is_content_item() {
                    self.check_note_id(node, &path);
                }
                0
            };

            for (index, child) in node.children().iter().enumerate().rev() {
                stack.push(Step::Enter {
                    node: child,
                    index: Some(index),
                    lists: child_lists,
                });
            }
        }

        self.issues
    }

    fn check_note_id(&mut self, item: &'a SerializedNode, path: &NodePath) {
        match item.note_id().filter(|id| !id.is_empty()) {
            None => self
                .issues
                .push(SchemaIssue::missing_note_id(path.clone(), &item.node_type)),
            Some(id) => match self.seen.get(id) {
                Some(first) => {
                    let first_path = path_of(self.root, first).unwrap_or_default();
                    self.issues.push(SchemaIssue::duplicate_note_id(
                        path.clone(),
                        &item.node_type,
                        id,
                        first_path,
                    ));
                }
                None => {
                    self.seen.insert(id, item);
                }
            },
        }
    }

    /// Wrapper ownership rules for the direct items of one list
    fn check_list_items(&mut self, list: &SerializedNode, path: &NodePath) {
        let mut previous: Option<ItemKind> = None;

        for (index, item) in list.children().iter().enumerate() {
            if !item.is_list_item() {
                continue;
            }
            if !item.is_wrapper() {
                previous = Some(ItemKind::Content);
                continue;
            }

            let item_path = path.child(index);
            let reason = match previous {
                None => Some(WrapperReason::ListStart),
                Some(ItemKind::Wrapper) => Some(WrapperReason::FollowsWrapper),
                Some(ItemKind::Content) => None,
            };
            if let Some(reason) = reason {
                self.issues.push(SchemaIssue::wrapper_without_sibling(
                    item_path.clone(),
                    &item.node_type,
                    reason,
                ));
            }
            if !wrapper_has_content(item) {
                self.issues.push(SchemaIssue::list_wrapper_no_listitem(
                    item_path,
                    &item.node_type,
                ));
            }
            previous = Some(ItemKind::Wrapper);
        }
    }
}

/// Path of `target` (by identity) below `root`
fn path_of(root: &SerializedNode, target: &SerializedNode) -> Option<NodePath> {
    let mut path = NodePath::root();
    let mut stack: Vec<Option<(usize, &SerializedNode)>> = root
        .children()
        .iter()
        .enumerate()
        .rev()
        .map(Some)
        .collect();
    if std::ptr::eq(root, target) {
        return Some(path);
    }

    while let Some(step) = stack.pop() {
        let Some((index, node)) = step else {
            path.pop();
            continue;
        };
        path.push(index);
        if std::ptr::eq(node, target) {
            return Some(path);
        }
        stack.push(None);
        stack.extend(node.children().iter().enumerate().rev().map(Some));
    }
    None
}

pub(crate) fn wrapper_has_content(wrapper: &SerializedNode) -> bool {
    wrapper
        .children()
        .iter()
        .any(|list| list.children().iter().any(SerializedNode::is_content_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueCode;
    use outliner_model::SerializedNode as N;

    fn codes(issues: &[SchemaIssue]) -> Vec<IssueCode> {
        issues.iter().map(|issue| issue.code).collect()
    }

    #[test]
    fn test_valid_document_has_no_issues() {
        let doc = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A"),
            N::wrapper(vec![N::note(Some("b"), "B"), N::note(Some("c"), "")]),
            N::note(Some("d"), "D"),
        ]);
        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn test_missing_and_duplicate_ids() {
        let doc = SerializedDocument::from_items(vec![
            N::note(Some("dup"), "A"),
            N::note(None, "B"),
            N::note(Some(""), "C"),
            N::note(Some("dup"), "D"),
        ]);
        let issues = validate(&doc);
        assert_eq!(
            codes(&issues),
            vec![
                IssueCode::MissingNoteId,
                IssueCode::MissingNoteId,
                IssueCode::DuplicateNoteId
            ]
        );
        let duplicate = &issues[2];
        assert_eq!(duplicate.path.to_string(), "root/0/3");
        assert_eq!(duplicate.first_path.as_ref().unwrap().to_string(), "root/0/0");
        assert_eq!(duplicate.note_id.as_deref(), Some("dup"));
    }

    #[test]
    fn test_wrapper_at_list_start() {
        let doc = SerializedDocument::from_items(vec![
            N::wrapper(vec![N::note(Some("a"), "A")]),
            N::note(Some("b"), "B"),
        ]);
        let issues = validate(&doc);
        assert_eq!(codes(&issues), vec![IssueCode::WrapperWithoutSibling]);
        assert_eq!(issues[0].reason, Some(WrapperReason::ListStart));
        assert_eq!(issues[0].path.to_string(), "root/0/0");
    }

    #[test]
    fn test_wrapper_after_wrapper() {
        let doc = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A"),
            N::wrapper(vec![N::note(Some("b"), "B")]),
            N::wrapper(vec![N::note(Some("c"), "C")]),
        ]);
        let issues = validate(&doc);
        assert_eq!(codes(&issues), vec![IssueCode::WrapperWithoutSibling]);
        assert_eq!(issues[0].reason, Some(WrapperReason::FollowsWrapper));
    }

    #[test]
    fn test_wrapper_without_list_items() {
        let doc = SerializedDocument::from_items(vec![N::note(Some("a"), "A"), N::wrapper(vec![])]);
        assert_eq!(codes(&validate(&doc)), vec![IssueCode::ListWrapperNoListitem]);
    }

    #[test]
    fn test_list_directly_inside_list_is_an_indent_jump() {
        let doc = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A"),
            N::list(vec![N::note(Some("b"), "B")]),
        ]);
        let issues = validate(&doc);
        assert_eq!(codes(&issues), vec![IssueCode::IndentJump]);
        assert_eq!(issues[0].depth, Some(2));
        assert_eq!(issues[0].path.to_string(), "root/0/1");
    }

    #[test]
    fn test_empty_items_are_tolerated() {
        let doc = SerializedDocument::from_items(vec![
            N::note(Some("a"), ""),
            N::wrapper(vec![N::note(Some("b"), "")]),
        ]);
        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn test_validate_json_rejects_missing_root() {
        let result = validate_json(&serde_json::json!({ "children": [] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_deep_chain_is_validated_without_recursion() {
        let mut list = N::list(vec![N::note(Some("leaf"), "leaf")]);
        for level in 0..12_000 {
            let owner = N::note(Some(&format!("n{level}")), "");
            let wrapper = N::new("listitem").with_children(vec![list]);
            list = N::list(vec![owner, wrapper]);
        }
        let doc = SerializedDocument::new(N::root(vec![list]));
        assert!(validate(&doc).is_empty());
    }
}
