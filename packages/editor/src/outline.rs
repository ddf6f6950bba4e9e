//! # Live Outline
//!
//! The editable form of a document: an arena of [`LiveNode`]s addressed by
//! [`NodeKey`]. Keys stay valid across moves. A removed node's slot goes on a
//! free list for reuse; its generation is bumped first, so stale keys
//! resolve to `None` instead of the slot's next occupant.
//!
//! ## Content items and wrappers
//!
//! ```text
//! list
//!  ├─ listitem  "A"          content item
//!  ├─ listitem               wrapper: children of "A"
//!  │   └─ list
//!  │       └─ listitem "B"   content item, logical child of "A"
//!  └─ listitem  "C"          content item, logical sibling of "A"
//! ```
//!
//! Queries come in two flavours: structural (parent, children) and logical
//! (the note tree, which skips lists and wrappers). Every walk is iterative.

use crate::errors::EditorError;
use outliner_model::node::{
    LIST_ITEM_TYPE, LIST_TYPE, NOTE_LINK_TYPE, ROOT_TYPE, TEXT_FIELD, TEXT_TYPE,
};
use outliner_model::{
    AttributeRegistry, Attributes, CheckState, SerializedDocument, SerializedNode, CHECKED,
    FOLDED, NOTE_ID,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    List,
    ListItem,
    Text,
    NoteLink,
    Other(String),
}

impl NodeKind {
    pub fn from_type(node_type: &str) -> Self {
        match node_type {
            ROOT_TYPE => NodeKind::Root,
            LIST_TYPE => NodeKind::List,
            LIST_ITEM_TYPE => NodeKind::ListItem,
            TEXT_TYPE => NodeKind::Text,
            NOTE_LINK_TYPE => NodeKind::NoteLink,
            other => NodeKind::Other(other.to_string()),
        }
    }

    pub fn as_type(&self) -> &str {
        match self {
            NodeKind::Root => ROOT_TYPE,
            NodeKind::List => LIST_TYPE,
            NodeKind::ListItem => LIST_ITEM_TYPE,
            NodeKind::Text => TEXT_TYPE,
            NodeKind::NoteLink => NOTE_LINK_TYPE,
            NodeKind::Other(node_type) => node_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveNode {
    pub kind: NodeKind,
    pub version: u32,

    /// Declared extension attributes (`noteId`, `folded`, `checked`)
    pub attributes: Attributes,

    /// Everything else, kept verbatim
    pub fields: Map<String, Value>,

    parent: Option<NodeKey>,
    children: Option<Vec<NodeKey>>,
}

impl LiveNode {
    fn new(kind: NodeKind) -> Self {
        let children = match kind {
            NodeKind::Text => None,
            _ => Some(Vec::new()),
        };
        Self {
            kind,
            version: 1,
            attributes: Attributes::default(),
            fields: Map::new(),
            parent: None,
            children,
        }
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Text of a `text` node
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Text => self.fields.get(TEXT_FIELD).and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Pre-order walk over a subtree
pub struct Descendants<'a> {
    outline: &'a Outline,
    stack: Vec<NodeKey>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.stack.pop()?;
        self.stack
            .extend(self.outline.children(key).iter().rev().copied());
        Some(key)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<LiveNode>,
}

#[derive(Debug, Clone)]
pub struct Outline {
    slots: Vec<Slot>,
    /// Indices of empty slots
    free: Vec<usize>,
    root: NodeKey,
    registry: AttributeRegistry,
}

const NO_ROOT: NodeKey = NodeKey {
    index: 0,
    generation: 0,
};

impl Outline {
    /// Outline holding an empty root
    pub fn empty() -> Self {
        let mut outline = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NO_ROOT,
            registry: AttributeRegistry::outline(),
        };
        outline.root = outline.alloc(LiveNode::new(NodeKind::Root));
        outline
    }

    /// Import a serialized tree
    pub fn from_serialized(root: &SerializedNode, registry: AttributeRegistry) -> Self {
        let mut outline = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NO_ROOT,
            registry,
        };

        let mut stack: Vec<(&SerializedNode, Option<NodeKey>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let live = outline.import(node);
            let key = outline.alloc(live);
            match parent {
                Some(parent) => outline.attach_last(parent, key),
                None => outline.root = key,
            }
            stack.extend(node.children().iter().rev().map(|child| (child, Some(key))));
        }
        outline
    }

    fn import(&self, node: &SerializedNode) -> LiveNode {
        let (attributes, fields) = self
            .registry
            .split_fields(&node.node_type, node.fields.clone());
        LiveNode {
            kind: NodeKind::from_type(&node.node_type),
            version: node.version,
            attributes,
            fields,
            parent: None,
            children: node
                .children
                .as_ref()
                .map(|children| Vec::with_capacity(children.len())),
        }
    }

    /// Export to the serialized tree
    pub fn to_serialized(&self) -> SerializedNode {
        struct Frame<'a> {
            node: &'a LiveNode,
            next: usize,
            done: Vec<SerializedNode>,
        }

        let Some(root) = self.get(self.root) else {
            return SerializedNode::root(Vec::new());
        };
        let mut stack = vec![Frame {
            node: root,
            next: 0,
            done: Vec::new(),
        }];

        while let Some(frame) = stack.last_mut() {
            if let Some(&child) = frame.node.children().get(frame.next) {
                frame.next += 1;
                if let Some(node) = self.get(child) {
                    stack.push(Frame {
                        node,
                        next: 0,
                        done: Vec::new(),
                    });
                }
                continue;
            }

            let Some(frame) = stack.pop() else { break };
            let finished = export(frame.node, frame.done);
            match stack.last_mut() {
                Some(parent) => parent.done.push(finished),
                None => return finished,
            }
        }

        SerializedNode::root(Vec::new())
    }

    pub fn to_document(&self) -> SerializedDocument {
        SerializedDocument::new(self.to_serialized())
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn get(&self, key: NodeKey) -> Option<&LiveNode> {
        self.slots
            .get(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, key: NodeKey) -> Option<&mut LiveNode> {
        self.slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key)?.parent
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.get(key).map(LiveNode::children).unwrap_or(&[])
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Allocated slots, live or free
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top_level_items().is_empty()
    }

    pub fn descendants(&self, key: NodeKey) -> Descendants<'_> {
        let stack = if self.get(key).is_some() { vec![key] } else { Vec::new() };
        Descendants {
            outline: self,
            stack,
        }
    }

    fn kind_is(&self, key: NodeKey, kind: NodeKind) -> bool {
        self.get(key).map_or(false, |node| node.kind == kind)
    }

    pub fn is_list(&self, key: NodeKey) -> bool {
        self.kind_is(key, NodeKind::List)
    }

    pub fn is_list_item(&self, key: NodeKey) -> bool {
        self.kind_is(key, NodeKind::ListItem)
    }

    pub fn is_wrapper(&self, key: NodeKey) -> bool {
        let children = self.children(key);
        self.is_list_item(key)
            && !children.is_empty()
            && children.iter().all(|&child| self.is_list(child))
    }

    pub fn is_content_item(&self, key: NodeKey) -> bool {
        self.is_list_item(key) && !self.is_wrapper(key)
    }

    /// Whether `key` is still reachable from the root
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut current = key;
        loop {
            if self.get(current).is_none() {
                return false;
            }
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub(crate) fn index_in_parent(&self, key: NodeKey) -> Option<(NodeKey, usize)> {
        let parent = self.parent(key)?;
        let index = self.children(parent).iter().position(|&child| child == key)?;
        Some((parent, index))
    }

    /// Content items in document order
    pub fn content_items(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.descendants(self.root)
            .filter(move |&key| self.is_content_item(key))
    }

    pub fn find_by_note_id(&self, note_id: &str) -> Option<NodeKey> {
        self.content_items()
            .find(|&key| self.note_id(key) == Some(note_id))
    }

    pub fn note_id(&self, key: NodeKey) -> Option<&str> {
        self.get(key)?
            .attributes
            .raw(NOTE_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn note_ids(&self) -> HashSet<String> {
        self.content_items()
            .filter_map(|key| self.note_id(key))
            .map(str::to_string)
            .collect()
    }

    pub fn is_folded(&self, item: NodeKey) -> bool {
        self.get(item)
            .map_or(false, |node| node.attributes.get(FOLDED))
    }

    pub fn check_state(&self, item: NodeKey) -> CheckState {
        self.get(item)
            .map(|node| node.attributes.get(CHECKED))
            .unwrap_or_default()
    }

    /// Concatenated text of a content item, nested notes excluded
    pub fn text_of(&self, item: NodeKey) -> String {
        let mut text = String::new();
        let mut stack: Vec<NodeKey> = self.children(item).iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let Some(node) = self.get(key) else { continue };
            if node.kind == NodeKind::List {
                continue;
            }
            if let Some(part) = node.text() {
                text.push_str(part);
            }
            stack.extend(node.children().iter().rev().copied());
        }
        text
    }

    /// Length of [`Outline::text_of`] in characters
    pub fn text_len(&self, item: NodeKey) -> usize {
        self.text_of(item).chars().count()
    }

    /// Whether any note has non-blank text
    pub fn has_content(&self) -> bool {
        self.content_items()
            .any(|key| !self.text_of(key).trim().is_empty())
    }

    /// Content item owning `key`
    ///
    /// Inline nodes belong to their list item; a wrapper and everything in
    /// its list belong to the content item right before the wrapper.
    pub fn content_owner(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = key;
        loop {
            if self.is_content_item(current) {
                return Some(current);
            }
            if self.is_wrapper(current) {
                return self.preceding_content_sibling(current);
            }
            current = self.parent(current)?;
        }
    }

    /// Nearest list item before `key` in its list, if it is a content item
    pub fn preceding_content_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let (parent, index) = self.index_in_parent(key)?;
        self.children(parent)[..index]
            .iter()
            .rev()
            .copied()
            .find(|&sibling| self.is_list_item(sibling))
            .filter(|&sibling| self.is_content_item(sibling))
    }

    /// Previous content item in the same list, skipping wrappers
    pub fn previous_sibling_item(&self, item: NodeKey) -> Option<NodeKey> {
        let (parent, index) = self.index_in_parent(item)?;
        self.children(parent)[..index]
            .iter()
            .rev()
            .copied()
            .find(|&sibling| self.is_content_item(sibling))
    }

    /// Wrapper holding the children of `item`
    pub fn wrapper_of(&self, item: NodeKey) -> Option<NodeKey> {
        let (parent, index) = self.index_in_parent(item)?;
        self.children(parent)[index + 1..]
            .iter()
            .copied()
            .find(|&sibling| self.is_list_item(sibling))
            .filter(|&sibling| self.is_wrapper(sibling))
    }

    /// List holding the children of `item`
    pub fn nested_list(&self, item: NodeKey) -> Option<NodeKey> {
        self.wrapper_of(item)
            .and_then(|wrapper| self.children(wrapper).first().copied())
    }

    /// Content items directly inside `list`
    pub fn content_children(&self, list: NodeKey) -> Vec<NodeKey> {
        self.children(list)
            .iter()
            .copied()
            .filter(|&child| self.is_content_item(child))
            .collect()
    }

    pub fn top_level_items(&self) -> Vec<NodeKey> {
        self.children(self.root)
            .iter()
            .filter(|&&child| self.is_list(child))
            .flat_map(|&list| self.content_children(list))
            .collect()
    }

    /// Child notes of `item`; the root's children are the top-level notes
    pub fn logical_children(&self, item: NodeKey) -> Vec<NodeKey> {
        if item == self.root {
            return self.top_level_items();
        }
        // Lists held directly by the item are tolerated alongside its wrapper.
        let own_lists = self
            .children(item)
            .iter()
            .copied()
            .filter(|&child| self.is_list(child));
        let wrapped_lists = self
            .wrapper_of(item)
            .map(|wrapper| self.children(wrapper).to_vec())
            .unwrap_or_default();
        own_lists
            .chain(wrapped_lists)
            .flat_map(|list| self.content_children(list))
            .collect()
    }

    /// Parent note of `item`, `None` at the top level
    pub fn logical_parent(&self, item: NodeKey) -> Option<NodeKey> {
        let list = self.parent(item)?;
        let owner = self.parent(list)?;
        if owner == self.root {
            return None;
        }
        self.content_owner(owner)
    }

    /// Notes from the top level down to `item`, inclusive
    pub fn content_path(&self, item: NodeKey) -> Vec<NodeKey> {
        let mut path = vec![item];
        let mut current = item;
        while let Some(parent) = self.logical_parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Whether `ancestor` is `item` or one of its logical ancestors
    pub fn is_within(&self, item: NodeKey, ancestor: NodeKey) -> bool {
        let mut current = Some(item);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.logical_parent(key);
        }
        false
    }

    /// Whether a logical ancestor of `item` is folded
    pub fn is_hidden(&self, item: NodeKey) -> bool {
        let mut current = self.logical_parent(item);
        while let Some(key) = current {
            if self.is_folded(key) {
                return true;
            }
            current = self.logical_parent(key);
        }
        false
    }

    /// Child indices from the root
    fn position(&self, key: NodeKey) -> Vec<usize> {
        let mut indices = Vec::new();
        let mut current = key;
        while let Some((parent, index)) = self.index_in_parent(current) {
            indices.push(index);
            current = parent;
        }
        indices.reverse();
        indices
    }

    /// Document order of two nodes
    pub fn compare_order(&self, a: NodeKey, b: NodeKey) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.position(a).cmp(&self.position(b))
    }

    fn next_preorder(&self, key: NodeKey) -> Option<NodeKey> {
        if let Some(&first) = self.children(key).first() {
            return Some(first);
        }
        let mut current = key;
        loop {
            let (parent, index) = self.index_in_parent(current)?;
            if let Some(&sibling) = self.children(parent).get(index + 1) {
                return Some(sibling);
            }
            current = parent;
        }
    }

    fn previous_preorder(&self, key: NodeKey) -> Option<NodeKey> {
        let (parent, index) = self.index_in_parent(key)?;
        if index == 0 {
            return Some(parent);
        }
        let mut current = self.children(parent)[index - 1];
        while let Some(&last) = self.children(current).last() {
            current = last;
        }
        Some(current)
    }

    pub fn next_content_item(&self, item: NodeKey) -> Option<NodeKey> {
        let mut current = item;
        loop {
            current = self.next_preorder(current)?;
            if self.is_content_item(current) {
                return Some(current);
            }
        }
    }

    pub fn previous_content_item(&self, item: NodeKey) -> Option<NodeKey> {
        let mut current = item;
        loop {
            current = self.previous_preorder(current)?;
            if self.is_content_item(current) {
                return Some(current);
            }
        }
    }

    /// Last note in document order within the subtree of `item`
    pub fn last_descendant(&self, item: NodeKey) -> NodeKey {
        let mut current = item;
        while let Some(&last) = self.logical_children(current).last() {
            current = last;
        }
        current
    }

    // Structural edits. Callers keep the outline valid; these only keep the
    // arena consistent.

    fn alloc(&mut self, node: LiveNode) -> NodeKey {
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index) {
                slot.node = Some(node);
                return NodeKey {
                    index,
                    generation: slot.generation,
                };
            }
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeKey {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn attach_last(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.get_or_insert_with(Vec::new).push(child);
        }
    }

    pub(crate) fn attributes_mut(&mut self, key: NodeKey) -> Result<&mut Attributes, EditorError> {
        self.get_mut(key)
            .map(|node| &mut node.attributes)
            .ok_or(EditorError::Detached)
    }

    fn new_list(&mut self) -> NodeKey {
        let mut list = LiveNode::new(NodeKind::List);
        list.fields
            .insert("listType".to_string(), Value::from("bullet"));
        self.alloc(list)
    }

    fn new_text(&mut self, text: &str) -> NodeKey {
        let mut node = LiveNode::new(NodeKind::Text);
        node.fields
            .insert(TEXT_FIELD.to_string(), Value::from(text));
        self.alloc(node)
    }

    /// Detached content item with a single text child
    pub(crate) fn new_content_item(&mut self, note_id: &str, text: &str) -> NodeKey {
        let mut item = LiveNode::new(NodeKind::ListItem);
        item.attributes.set(NOTE_ID, note_id.to_string());
        let item = self.alloc(item);
        if !text.is_empty() {
            let text = self.new_text(text);
            self.attach_last(item, text);
        }
        item
    }

    pub(crate) fn insert_child(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    ) -> Result<(), EditorError> {
        if self.parent(child).is_some() {
            return Err(EditorError::invariant("inserted node is still attached"));
        }
        let node = self.get_mut(parent).ok_or(EditorError::Detached)?;
        let children = node.children.get_or_insert_with(Vec::new);
        let index = index.min(children.len());
        children.insert(index, child);
        let child = self.get_mut(child).ok_or(EditorError::Detached)?;
        child.parent = Some(parent);
        Ok(())
    }

    pub(crate) fn detach(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let (parent, index) = self.index_in_parent(key).ok_or(EditorError::Detached)?;
        if let Some(children) = self.get_mut(parent).and_then(|node| node.children.as_mut()) {
            children.remove(index);
        }
        if let Some(node) = self.get_mut(key) {
            node.parent = None;
        }
        Ok(())
    }

    /// Release the slots of a detached subtree
    pub(crate) fn free(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(key.index)
                .filter(|slot| slot.generation == key.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(key.index);
                stack.extend(node.children());
            }
        }
    }

    pub(crate) fn remove(&mut self, key: NodeKey) -> Result<(), EditorError> {
        self.detach(key)?;
        self.free(key);
        Ok(())
    }

    /// Top-level list, created if the document has none
    pub(crate) fn ensure_top_level_list(&mut self) -> Result<NodeKey, EditorError> {
        let existing = self
            .children(self.root)
            .iter()
            .copied()
            .find(|&child| self.is_list(child));
        if let Some(list) = existing {
            return Ok(list);
        }
        let list = self.new_list();
        let end = self.children(self.root).len();
        self.insert_child(self.root, end, list)?;
        Ok(list)
    }

    /// List holding the children of `item`, created after it if missing
    pub(crate) fn ensure_nested_list(&mut self, item: NodeKey) -> Result<NodeKey, EditorError> {
        if let Some(list) = self.nested_list(item) {
            return Ok(list);
        }
        let (parent, index) = self.index_in_parent(item).ok_or(EditorError::Detached)?;
        let wrapper = self.alloc(LiveNode::new(NodeKind::ListItem));
        let list = self.new_list();
        self.attach_last(wrapper, list);
        self.insert_child(parent, index + 1, wrapper)?;
        Ok(list)
    }

    /// Remove the wrapper around `list` once it holds no notes
    pub(crate) fn prune_empty_wrapper(&mut self, list: NodeKey) -> Result<(), EditorError> {
        let Some(wrapper) = self.parent(list) else {
            return Ok(());
        };
        if !self.is_wrapper(wrapper) {
            return Ok(());
        }
        let has_notes = self
            .children(wrapper)
            .iter()
            .any(|&list| !self.content_children(list).is_empty());
        if has_notes {
            return Ok(());
        }
        self.remove(wrapper)
    }

    /// Replace the inline content of `item` with plain text
    pub(crate) fn set_text(&mut self, item: NodeKey, text: &str) -> Result<(), EditorError> {
        let inline: Vec<NodeKey> = self
            .children(item)
            .iter()
            .copied()
            .filter(|&child| !self.is_list(child))
            .collect();
        for child in inline {
            self.remove(child)?;
        }
        if !text.is_empty() {
            let node = self.new_text(text);
            self.insert_child(item, 0, node)?;
        }
        Ok(())
    }
}

impl Default for Outline {
    fn default() -> Self {
        Self::empty()
    }
}

fn export(node: &LiveNode, children: Vec<SerializedNode>) -> SerializedNode {
    let mut out = SerializedNode::new(node.kind.as_type());
    out.version = node.version;
    out.fields = node.fields.clone();
    node.attributes.write_into(&mut out.fields);
    out.children = node.children.as_ref().map(|_| children);
    out
}
