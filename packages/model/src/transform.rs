//! # Serialized Tree Transform
//!
//! Rewrites a serialized tree into a new one, node by node, without native
//! recursion. Production documents contain chains that are thousands of
//! single-child levels deep, so the walk keeps its own work stack.
//!
//! Each frame holds the node being rebuilt (a shallow copy), an iterator over
//! its untransformed children, and the children already finished. A frame is
//! popped once its children are exhausted and the finished node is pushed into
//! the parent frame.

use crate::error::{ModelError, ModelResult};
use crate::node::{NodePath, SerializedDocument, SerializedNode};
use std::slice;

/// Hooks called while a tree is rebuilt
pub trait TreeVisitor {
    /// Called in document order when a node is opened, before its children.
    /// `shell` is the copy being built (without children), `original` the
    /// untouched input node.
    fn enter(&mut self, _shell: &mut SerializedNode, _original: &SerializedNode, _path: &NodePath) {
    }

    /// Called once all children are finished; returns the final node
    fn leave(&mut self, node: SerializedNode, _path: &NodePath) -> SerializedNode {
        node
    }
}

struct LeaveFn<F>(F);

impl<F> TreeVisitor for LeaveFn<F>
where
    F: FnMut(SerializedNode) -> SerializedNode,
{
    fn leave(&mut self, node: SerializedNode, _path: &NodePath) -> SerializedNode {
        (self.0)(node)
    }
}

struct Frame<'a> {
    shell: SerializedNode,
    raw: slice::Iter<'a, SerializedNode>,
    done: Vec<SerializedNode>,
    next_index: usize,
}

impl<'a> Frame<'a> {
    fn open<V: TreeVisitor>(node: &'a SerializedNode, path: &NodePath, visitor: &mut V) -> Self {
        let mut shell = node.shallow_clone();
        visitor.enter(&mut shell, node, path);
        Self {
            shell,
            raw: node.children().iter(),
            done: Vec::with_capacity(node.children().len()),
            next_index: 0,
        }
    }

    fn finish(mut self) -> SerializedNode {
        if self.shell.children.is_some() {
            self.shell.children = Some(std::mem::take(&mut self.done));
        }
        self.shell
    }
}

/// Apply `visitor` to every node, post-order, producing a new tree
pub fn transform<F>(node: &SerializedNode, visitor: F) -> SerializedNode
where
    F: FnMut(SerializedNode) -> SerializedNode,
{
    transform_with(node, &mut LeaveFn(visitor))
}

/// Rebuild `node` through a [`TreeVisitor`]; the input is never mutated
pub fn transform_with<V: TreeVisitor>(node: &SerializedNode, visitor: &mut V) -> SerializedNode {
    let mut path = NodePath::root();
    let mut stack = vec![Frame::open(node, &path, visitor)];

    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.raw.next() {
            path.push(frame.next_index);
            frame.next_index += 1;
            let child_frame = Frame::open(child, &path, visitor);
            stack.push(child_frame);
            continue;
        }

        let Some(frame) = stack.pop() else { break };
        let finished = visitor.leave(frame.finish(), &path);
        match stack.last_mut() {
            Some(parent) => {
                parent.done.push(finished);
                path.pop();
            }
            None => return finished,
        }
    }

    unreachable!("transform stack always finishes with the root frame")
}

/// Transform a whole document, checking the root first
pub fn transform_document<V: TreeVisitor>(
    document: &SerializedDocument,
    visitor: &mut V,
) -> ModelResult<SerializedDocument> {
    if !document.root.is_root() {
        return Err(ModelError::invalid_root(document.root.node_type.clone()));
    }
    Ok(SerializedDocument::new(transform_with(&document.root, visitor)))
}
