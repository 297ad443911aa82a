//! Records, keys and property values.
//!
//! The engine never owns the shape of the data it projects. It reads records
//! through the [`Record`] trait: a property getter returning [`PropertyValue`]
//! and an optional identity. Keys used across the API (expanded items, drag
//! keys, marked key, has-more storage) are [`RecordKey`]s.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Numeric key.
    Int(i64),
    /// String key.
    Str(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(n) => write!(f, "{n}"),
            RecordKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        RecordKey::Int(n)
    }
}

impl From<i32> for RecordKey {
    fn from(n: i32) -> Self {
        RecordKey::Int(n as i64)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey::Str(s.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey::Str(s)
    }
}

/// A dynamically typed property value read from a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    /// No value (absent or null).
    #[default]
    None,
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// List of values.
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Returns `true` if the value is [`PropertyValue::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, PropertyValue::None)
    }

    /// Returns `true` if a value is present.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// String view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer view of the value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float view of the value. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(n) => Some(*n),
            PropertyValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interpret the value as a record key. Only strings and integers qualify.
    pub fn to_key(&self) -> Option<RecordKey> {
        match self {
            PropertyValue::Int(n) => Some(RecordKey::Int(*n)),
            PropertyValue::String(s) => Some(RecordKey::Str(s.clone())),
            _ => None,
        }
    }

    /// Tri-state node flag: `Some(true)` node, `Some(false)` hidden node,
    /// `None` leaf.
    pub fn to_node_flag(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Int(n as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Float(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<RecordKey> for PropertyValue {
    fn from(key: RecordKey) -> Self {
        match key {
            RecordKey::Int(n) => PropertyValue::Int(n),
            RecordKey::Str(s) => PropertyValue::String(s),
        }
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(PropertyValue::None, Into::into)
    }
}

/// A record readable by the projection engine.
///
/// Records are shared with the source collection through `Arc` and are never
/// mutated by the engine.
pub trait Record: Send + Sync + 'static {
    /// Intrinsic identity, for records that are models with an id.
    ///
    /// When `None`, the projection falls back to its `key_property`.
    fn id(&self) -> Option<RecordKey> {
        None
    }

    /// Read a property by name.
    fn get(&self, property: &str) -> PropertyValue;

    /// Nested child records stored inline under `property`.
    fn children(&self, _property: &str) -> Option<Vec<Arc<Self>>>
    where
        Self: Sized,
    {
        None
    }
}

/// A general-purpose record backed by a property map.
///
/// Useful for tests, demos and loosely typed data.
///
/// ```
/// use horizon_display::record::{MapRecord, Record};
///
/// let record = MapRecord::new().with("id", 1).with("title", "Inbox");
/// assert_eq!(record.get("title").as_str(), Some("Inbox"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRecord {
    properties: BTreeMap<String, PropertyValue>,
    nested: BTreeMap<String, Vec<Arc<MapRecord>>>,
}

impl MapRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style property setter.
    pub fn with(mut self, property: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(property.to_string(), value.into());
        self
    }

    /// Builder-style nested children setter.
    pub fn with_children(mut self, property: &str, children: Vec<MapRecord>) -> Self {
        self.nested
            .insert(property.to_string(), children.into_iter().map(Arc::new).collect());
        self
    }

    /// Set a property in place.
    pub fn set(&mut self, property: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(property.to_string(), value.into());
    }
}

impl Record for MapRecord {
    fn get(&self, property: &str) -> PropertyValue {
        self.properties.get(property).cloned().unwrap_or_default()
    }

    fn children(&self, property: &str) -> Option<Vec<Arc<Self>>> {
        self.nested.get(property).cloned()
    }
}
