//! # Node Extension Attributes
//!
//! Outline nodes carry a few extra attributes (`noteId`, `folded`,
//! `checked`) on top of what the rich-text host knows about. Each node type
//! declares its attributes as typed keys registered once with an
//! [`AttributeRegistry`]; a live node then owns an [`Attributes`] map holding
//! the parsed values.

use crate::node::{LIST_ITEM_TYPE, NOTE_ID_FIELD};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

/// A value type that can be stored as a node attribute
pub trait AttributeType: Sized {
    /// Parse from the serialized field; `None` means "not set"
    fn from_json(value: &Value) -> Option<Self>;

    /// Encode for the serialized field; `None` removes the field
    fn to_json(&self) -> Option<Value>;
}

impl AttributeType for String {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn to_json(&self) -> Option<Value> {
        Some(Value::from(self.as_str()))
    }
}

impl AttributeType for bool {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_json(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }
}

/// Checkbox state of a note, independent of folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Unset,
    Unchecked,
    Checked,
}

impl CheckState {
    /// `None` is unset, otherwise the checkbox value
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => CheckState::Unset,
            Some(false) => CheckState::Unchecked,
            Some(true) => CheckState::Checked,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            CheckState::Checked => CheckState::Unchecked,
            CheckState::Unchecked | CheckState::Unset => CheckState::Checked,
        }
    }
}

impl AttributeType for CheckState {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(CheckState::Checked),
            Value::Bool(false) => Some(CheckState::Unchecked),
            _ => None,
        }
    }

    fn to_json(&self) -> Option<Value> {
        match self {
            CheckState::Unset => None,
            CheckState::Unchecked => Some(Value::Bool(false)),
            CheckState::Checked => Some(Value::Bool(true)),
        }
    }
}

/// Typed, named attribute key with a default
pub struct AttributeKey<T> {
    pub name: &'static str,
    default: fn() -> T,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    pub const fn new(name: &'static str, default: fn() -> T) -> Self {
        Self {
            name,
            default,
            _marker: PhantomData,
        }
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

fn empty_string() -> String {
    String::new()
}

fn unfolded() -> bool {
    false
}

fn unset() -> CheckState {
    CheckState::Unset
}

pub const NOTE_ID: AttributeKey<String> = AttributeKey::new(NOTE_ID_FIELD, empty_string);
pub const FOLDED: AttributeKey<bool> = AttributeKey::new("folded", unfolded);
pub const CHECKED: AttributeKey<CheckState> = AttributeKey::new("checked", unset);

/// Type-erased registry entry
#[derive(Debug, Clone, Copy)]
pub struct AttributeSchema {
    pub name: &'static str,
    normalize: fn(&Value) -> Option<Value>,
}

fn normalize_as<T: AttributeType>(value: &Value) -> Option<Value> {
    T::from_json(value).and_then(|parsed| parsed.to_json())
}

impl AttributeSchema {
    pub fn of<T: AttributeType>(key: AttributeKey<T>) -> Self {
        Self {
            name: key.name,
            normalize: normalize_as::<T>,
        }
    }
}

/// Extension attributes declared per node type
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    by_type: HashMap<String, Vec<AttributeSchema>>,
}

impl AttributeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the outline's list item attributes
    pub fn outline() -> Self {
        let mut registry = Self::empty();
        registry.register(LIST_ITEM_TYPE, NOTE_ID);
        registry.register(LIST_ITEM_TYPE, FOLDED);
        registry.register(LIST_ITEM_TYPE, CHECKED);
        registry
    }

    pub fn register<T: AttributeType>(&mut self, node_type: &str, key: AttributeKey<T>) {
        let schemas = self.by_type.entry(node_type.to_string()).or_default();
        schemas.retain(|schema| schema.name != key.name);
        schemas.push(AttributeSchema::of(key));
    }

    pub fn schemas(&self, node_type: &str) -> &[AttributeSchema] {
        self.by_type
            .get(node_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Split serialized fields into declared attributes and passthrough fields
    ///
    /// A declared field whose value does not parse stays in the passthrough
    /// map so nothing is lost on export.
    pub fn split_fields(
        &self,
        node_type: &str,
        mut fields: Map<String, Value>,
    ) -> (Attributes, Map<String, Value>) {
        let mut attributes = Attributes::default();
        for schema in self.schemas(node_type) {
            let Some(raw) = fields.get(schema.name) else {
                continue;
            };
            if let Some(value) = (schema.normalize)(raw) {
                fields.remove(schema.name);
                attributes.values.insert(schema.name, value);
            }
        }
        (attributes, fields)
    }
}

/// Attribute values owned by one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<&'static str, Value>,
}

impl Attributes {
    pub fn get<T: AttributeType>(&self, key: AttributeKey<T>) -> T {
        self.values
            .get(key.name)
            .and_then(T::from_json)
            .unwrap_or_else(|| key.default_value())
    }

    /// Stored value without parsing, for borrowed access
    pub fn raw<T>(&self, key: AttributeKey<T>) -> Option<&Value> {
        self.values.get(key.name)
    }

    pub fn contains<T>(&self, key: AttributeKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    pub fn set<T: AttributeType>(&mut self, key: AttributeKey<T>, value: T) {
        match value.to_json() {
            Some(encoded) => {
                self.values.insert(key.name, encoded);
            }
            None => {
                self.values.remove(key.name);
            }
        }
    }

    pub fn remove<T>(&mut self, key: AttributeKey<T>) {
        self.values.remove(key.name);
    }

    /// Write the attributes back into a serialized field map
    pub fn write_into(&self, fields: &mut Map<String, Value>) {
        for (name, value) in &self.values {
            fields.insert((*name).to_string(), value.clone());
        }
    }
}
