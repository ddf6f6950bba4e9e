//! # Serialized Outline Tree
//!
//! The persisted form of an outline document: a JSON tree of typed nodes.
//!
//! ```text
//! root
//!  └─ list
//!      ├─ listitem (content: noteId + inline children)
//!      └─ listitem (wrapper: a single nested list)
//!          └─ list
//!              └─ listitem ...
//! ```
//!
//! Every node keeps the fields it does not know about, so documents written
//! by newer clients survive a load/save cycle untouched.
//!
//! Outlines nest without limit, so every conversion here (JSON text, JSON
//! values, drop) runs on an explicit stack instead of recursing per level.

use crate::error::{ModelError, ModelResult};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::{fmt, io, slice};

pub const ROOT_TYPE: &str = "root";
pub const LIST_TYPE: &str = "list";
pub const LIST_ITEM_TYPE: &str = "listitem";
pub const TEXT_TYPE: &str = "text";
pub const NOTE_LINK_TYPE: &str = "note-link";

const TYPE_KEY: &str = "type";
const VERSION_KEY: &str = "version";
const CHILDREN_KEY: &str = "children";

pub const NOTE_ID_FIELD: &str = "noteId";
pub const DOC_ID_FIELD: &str = "docId";
pub const TEXT_FIELD: &str = "text";

fn default_version() -> u32 {
    1
}

/// A node of the serialized outline tree
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedNode {
    /// `type` in JSON
    pub node_type: String,

    /// Defaults to 1 when absent
    pub version: u32,

    /// Absent and empty children are kept apart
    pub children: Option<Vec<SerializedNode>>,

    /// Type-specific fields (`noteId`, `text`, `folded`, ...)
    pub fields: Map<String, Value>,
}

impl SerializedNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            version: default_version(),
            children: None,
            fields: Map::new(),
        }
    }

    pub fn root(children: Vec<SerializedNode>) -> Self {
        Self::new(ROOT_TYPE).with_children(children)
    }

    pub fn list(items: Vec<SerializedNode>) -> Self {
        Self::new(LIST_TYPE)
            .with_field("listType", "bullet")
            .with_children(items)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TEXT_TYPE).with_field(TEXT_FIELD, text.into())
    }

    /// Content item with an optional note id and a single text child
    pub fn note(note_id: Option<&str>, text: &str) -> Self {
        let mut item = Self::new(LIST_ITEM_TYPE).with_children(vec![Self::text(text)]);
        if let Some(id) = note_id {
            item.set_note_id(id);
        }
        item
    }

    /// Wrapper item holding the nested list of the preceding content item
    pub fn wrapper(items: Vec<SerializedNode>) -> Self {
        Self::new(LIST_ITEM_TYPE).with_children(vec![Self::list(items)])
    }

    pub fn note_link(note_id: &str, doc_id: Option<&str>) -> Self {
        let mut link = Self::new(NOTE_LINK_TYPE).with_field(NOTE_ID_FIELD, note_id);
        if let Some(doc_id) = doc_id {
            link.fields.insert(DOC_ID_FIELD.to_string(), Value::from(doc_id));
        }
        link
    }

    pub fn with_children(mut self, children: Vec<SerializedNode>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Copy of this node without its descendants
    ///
    /// Keeps the distinction between "no children" and "empty children".
    pub fn shallow_clone(&self) -> Self {
        Self {
            node_type: self.node_type.clone(),
            version: self.version,
            children: self.children.as_ref().map(|_| Vec::new()),
            fields: self.fields.clone(),
        }
    }

    pub fn children(&self) -> &[SerializedNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn take_children(&mut self) -> Vec<SerializedNode> {
        self.children.take().unwrap_or_default()
    }

    pub fn push_child(&mut self, child: SerializedNode) {
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn note_id(&self) -> Option<&str> {
        self.field_str(NOTE_ID_FIELD)
    }

    pub fn set_note_id(&mut self, note_id: &str) {
        self.fields
            .insert(NOTE_ID_FIELD.to_string(), Value::from(note_id));
    }

    pub fn is_root(&self) -> bool {
        self.node_type == ROOT_TYPE
    }

    pub fn is_list(&self) -> bool {
        self.node_type == LIST_TYPE
    }

    pub fn is_list_item(&self) -> bool {
        self.node_type == LIST_ITEM_TYPE
    }

    pub fn is_note_link(&self) -> bool {
        self.node_type == NOTE_LINK_TYPE
    }

    /// A list item whose only children are nested lists
    pub fn is_wrapper(&self) -> bool {
        self.is_list_item()
            && !self.children().is_empty()
            && self.children().iter().all(SerializedNode::is_list)
    }

    /// A list item that owns inline content (possibly empty)
    pub fn is_content_item(&self) -> bool {
        self.is_list_item() && !self.is_wrapper()
    }

    /// Concatenated text of every `text` node below this one (lists excluded)
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<&SerializedNode> = self.children().iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.is_list() {
                continue;
            }
            if node.node_type == TEXT_TYPE {
                if let Some(text) = node.field_str(TEXT_FIELD) {
                    out.push_str(text);
                }
            }
            stack.extend(node.children().iter().rev());
        }
        out
    }

    /// Note ids of every content item in this subtree
    pub fn note_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_content_item() {
                if let Some(id) = node.note_id().filter(|id| !id.is_empty()) {
                    ids.insert(id.to_string());
                }
            }
            stack.extend(node.children());
        }
        ids
    }

    /// Build a node tree from a JSON value
    pub fn from_value(value: &Value) -> ModelResult<Self> {
        let mut path = NodePath::root();
        let mut current = ValueFrame::new(value, &path)?;
        let mut stack = Vec::new();
        loop {
            if let Some((index, child)) = current.pending.next() {
                path.push(index);
                let child = ValueFrame::new(child, &path)?;
                stack.push(std::mem::replace(&mut current, child));
                continue;
            }
            path.pop();
            match stack.pop() {
                Some(mut parent) => {
                    parent.node.push_child(current.node);
                    current = parent;
                }
                None => return Ok(current.node),
            }
        }
    }

    pub fn to_value(&self) -> Value {
        let mut current = NodeFrame::new(self);
        let mut stack = Vec::new();
        loop {
            if let Some(child) = current.node.children().get(current.next) {
                current.next += 1;
                stack.push(std::mem::replace(&mut current, NodeFrame::new(child)));
                continue;
            }
            let value = current.node.shallow_value(current.done);
            match stack.pop() {
                Some(mut parent) => {
                    parent.done.push(value);
                    current = parent;
                }
                None => return value,
            }
        }
    }

    fn shallow_value(&self, children: Vec<Value>) -> Value {
        let mut object = self.fields.clone();
        object.insert(TYPE_KEY.to_string(), Value::from(self.node_type.as_str()));
        object.insert(VERSION_KEY.to_string(), Value::from(self.version));
        if self.children.is_some() {
            object.insert(CHILDREN_KEY.to_string(), Value::Array(children));
        } else {
            object.remove(CHILDREN_KEY);
        }
        Value::Object(object)
    }

    /// Write this subtree as a JSON object
    pub fn write_json<W, F>(&self, writer: &mut W, formatter: &mut F) -> io::Result<()>
    where
        W: io::Write,
        F: Formatter,
    {
        let mut steps = vec![WriteStep::Open(self)];
        while let Some(step) = steps.pop() {
            match step {
                WriteStep::Open(node) => {
                    formatter.begin_object(writer)?;
                    write_entry(writer, formatter, true, TYPE_KEY, node.node_type.as_str())?;
                    write_entry(writer, formatter, false, VERSION_KEY, &node.version)?;
                    for (key, value) in &node.fields {
                        if !is_reserved_key(key) {
                            write_entry(writer, formatter, false, key, value)?;
                        }
                    }
                    let Some(children) = &node.children else {
                        formatter.end_object(writer)?;
                        continue;
                    };
                    write_key(writer, formatter, false, CHILDREN_KEY)?;
                    formatter.begin_array(writer)?;
                    steps.push(WriteStep::Close);
                    for (index, child) in children.iter().enumerate().rev() {
                        steps.push(WriteStep::EndElement);
                        steps.push(WriteStep::Open(child));
                        steps.push(WriteStep::BeginElement(index == 0));
                    }
                }
                WriteStep::BeginElement(first) => formatter.begin_array_value(writer, first)?,
                WriteStep::EndElement => formatter.end_array_value(writer)?,
                WriteStep::Close => {
                    formatter.end_array(writer)?;
                    formatter.end_object_value(writer)?;
                    formatter.end_object(writer)?;
                }
            }
        }
        Ok(())
    }
}

impl Drop for SerializedNode {
    // Degenerate documents nest thousands of levels deep; the derived drop
    // would recurse once per level.
    fn drop(&mut self) {
        let Some(mut pending) = self.children.take() else {
            return;
        };
        while let Some(mut node) = pending.pop() {
            if let Some(children) = node.children.take() {
                pending.extend(children);
            }
        }
    }
}

struct ValueFrame<'a> {
    node: SerializedNode,
    pending: std::iter::Enumerate<slice::Iter<'a, Value>>,
}

impl<'a> ValueFrame<'a> {
    /// The node without children, plus the child values still to convert
    fn new(value: &'a Value, path: &NodePath) -> ModelResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ModelError::invalid_node(path, "not an object"))?;
        let node_type = object
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::invalid_node(path, "missing string `type`"))?;
        let version = match object.get(VERSION_KEY) {
            None => default_version(),
            Some(version) => version
                .as_u64()
                .and_then(|version| u32::try_from(version).ok())
                .ok_or_else(|| ModelError::invalid_node(path, "`version` is not a u32"))?,
        };
        let (children, pending) = match object.get(CHILDREN_KEY) {
            None | Some(Value::Null) => (None, slice::Iter::default()),
            Some(Value::Array(items)) => (Some(Vec::with_capacity(items.len())), items.iter()),
            Some(_) => return Err(ModelError::invalid_node(path, "`children` is not an array")),
        };
        let fields = object
            .iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            node: SerializedNode {
                node_type: node_type.to_string(),
                version,
                children,
                fields,
            },
            pending: pending.enumerate(),
        })
    }
}

struct NodeFrame<'a> {
    node: &'a SerializedNode,
    next: usize,
    done: Vec<Value>,
}

impl<'a> NodeFrame<'a> {
    fn new(node: &'a SerializedNode) -> Self {
        Self {
            node,
            next: 0,
            done: Vec::with_capacity(node.children().len()),
        }
    }
}

enum WriteStep<'a> {
    Open(&'a SerializedNode),
    BeginElement(bool),
    EndElement,
    /// Closes the children array and the object holding it
    Close,
}

fn is_reserved_key(key: &str) -> bool {
    matches!(key, TYPE_KEY | VERSION_KEY | CHILDREN_KEY)
}

fn write_key<W, F>(writer: &mut W, formatter: &mut F, first: bool, key: &str) -> io::Result<()>
where
    W: io::Write,
    F: Formatter,
{
    formatter.begin_object_key(writer, first)?;
    serde_json::to_writer(&mut *writer, key)?;
    formatter.end_object_key(writer)?;
    formatter.begin_object_value(writer)
}

fn write_entry<W, F, T>(
    writer: &mut W,
    formatter: &mut F,
    first: bool,
    key: &str,
    value: &T,
) -> io::Result<()>
where
    W: io::Write,
    F: Formatter,
    T: Serialize + ?Sized,
{
    write_key(writer, formatter, first, key)?;
    serde_json::to_writer(&mut *writer, value)?;
    formatter.end_object_value(writer)
}

impl<'de> Deserialize<'de> for SerializedNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = SerializedNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an outline node object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SerializedNode, A::Error> {
        let mut node_type = None;
        let mut version = None;
        let mut children = None;
        let mut fields = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                TYPE_KEY => node_type = Some(map.next_value::<String>()?),
                VERSION_KEY => version = Some(map.next_value::<u32>()?),
                CHILDREN_KEY => children = map.next_value::<Option<Vec<SerializedNode>>>()?,
                _ => {
                    let value = map.next_value::<Value>()?;
                    fields.insert(key, value);
                }
            }
        }

        Ok(SerializedNode {
            node_type: node_type.ok_or_else(|| <A::Error as de::Error>::missing_field(TYPE_KEY))?,
            version: version.unwrap_or_else(default_version),
            children,
            fields,
        })
    }
}

/// Number of nodes in a subtree, counted without recursion
pub fn count_nodes(node: &SerializedNode) -> usize {
    let mut count = 0;
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.children());
    }
    count
}

/// Serialized document: `{ "root": { "type": "root", ... } }`
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedDocument {
    pub root: SerializedNode,
}

#[derive(Deserialize)]
struct RawDocument {
    root: Option<SerializedNode>,
}

impl SerializedDocument {
    pub fn new(root: SerializedNode) -> Self {
        Self { root }
    }

    /// Document with a single top-level list
    pub fn from_items(items: Vec<SerializedNode>) -> Self {
        Self::new(SerializedNode::root(vec![SerializedNode::list(items)]))
    }

    fn from_root(root: SerializedNode) -> ModelResult<Self> {
        if !root.is_root() {
            return Err(ModelError::invalid_root(root.node_type.clone()));
        }
        Ok(Self { root })
    }

    /// Parse a JSON value, failing when the root node is missing
    pub fn from_value(value: &Value) -> ModelResult<Self> {
        let root = value
            .as_object()
            .and_then(|object| object.get("root"))
            .filter(|root| !root.is_null())
            .ok_or(ModelError::MissingRoot)?;
        Self::from_root(SerializedNode::from_value(root)?)
    }

    /// Parse JSON text of any nesting depth
    pub fn from_json_str(source: &str) -> ModelResult<Self> {
        let mut json = serde_json::Deserializer::from_str(source);
        json.disable_recursion_limit();
        let raw = RawDocument::deserialize(serde_stacker::Deserializer::new(&mut json))?;
        json.end()?;
        Self::from_root(raw.root.ok_or(ModelError::MissingRoot)?)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "root": self.root.to_value() })
    }

    pub fn write_json<W, F>(&self, writer: &mut W, formatter: &mut F) -> io::Result<()>
    where
        W: io::Write,
        F: Formatter,
    {
        formatter.begin_object(writer)?;
        write_key(writer, formatter, true, "root")?;
        self.root.write_json(writer, formatter)?;
        formatter.end_object_value(writer)?;
        formatter.end_object(writer)
    }

    pub fn to_json_string(&self) -> ModelResult<String> {
        self.json_string(&mut CompactFormatter)
    }

    /// Two-space indented JSON, as written to disk
    pub fn to_json_string_pretty(&self) -> ModelResult<String> {
        self.json_string(&mut PrettyFormatter::new())
    }

    fn json_string<F: Formatter>(&self, formatter: &mut F) -> ModelResult<String> {
        let mut out = Vec::new();
        self.write_json(&mut out, formatter)?;
        String::from_utf8(out)
            .map_err(|err| ModelError::Write(io::Error::new(io::ErrorKind::InvalidData, err)))
    }
}

/// Child-index path from the root, rendered as `root/0/2/1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ROOT_TYPE)?;
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
