//! # Configuration Values
//!
//! [`Value`] is the tagged union used wherever configuration flows: plain
//! data (null, booleans, numbers, strings, lists, maps) plus the two
//! non-data shapes a configuration may legitimately carry, event handlers
//! and live object instances.
//!
//! [`Config`] is an insertion-ordered key/value map. Insertion order matters:
//! behaviors, components and handlers declared in a configuration are
//! materialized in the order they were written.
//!
//! Any `serde_json::Value` converts into a [`Value`], so `json!` literals
//! make convenient configuration:
//!
//! ```rust,ignore
//! let config = Config::from_json(json!({
//!     "className": "app.components.Mailer",
//!     "transport": { "host": "localhost" },
//! }))?;
//! ```

use crate::{error::ConfigError, event::HandlerSpec};
use indexmap::IndexMap;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use std::{any::Any, fmt, sync::Arc};

/// The reserved configuration key naming the class to construct.
pub const CLASS_NAME_KEY: &str = "className";

/// A configuration value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / undefined.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A list, replaced wholesale by merges.
    List(Vec<Value>),
    /// A nested plain map, merged key-by-key.
    Map(Config),
    /// An event handler, replaced wholesale by merges.
    Handler(HandlerSpec),
    /// A live object, replaced wholesale by merges.
    Object(Instance),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Handler(_) => "handler",
            Value::Object(_) => "object",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read as a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a map.
    pub fn as_map(&self) -> Option<&Config> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as a live instance.
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Borrow as a handler.
    pub fn as_handler(&self) -> Option<&HandlerSpec> {
        match self {
            Value::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    /// Whether this value is falsy in the loose sense used by hooks.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::Int(i) => *i == 0,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Handler(a), Value::Handler(b)) => a.same_as(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => fmt::Debug::fmt(map, f),
            Value::Handler(_) => f.write_str("Handler(..)"),
            Value::Object(instance) => write!(f, "Object({})", instance.type_name()),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_scalar! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    String => String,
    &str => String,
    Config => Map,
    Vec<Value> => List,
    HandlerSpec => Handler,
    Instance => Object,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => map.serialize(serializer),
            Value::Handler(_) => serializer.serialize_str("[handler]"),
            Value::Object(instance) => {
                serializer.serialize_str(&format!("[object {}]", instance.type_name()))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// ============================================================================
// Instance
// ============================================================================

/// A shared, type-erased live object carried inside a [`Value`].
///
/// The pointer is stored as `Arc<P>` for any `P: ?Sized`, so trait objects
/// such as `Arc<dyn Behavior>` round-trip through configuration unchanged.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    address: usize,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap a shared pointer.
    pub fn new<P>(type_name: &'static str, value: Arc<P>) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
    {
        Self {
            type_name,
            address: Arc::as_ptr(&value) as *const () as usize,
            inner: Arc::new(value),
        }
    }

    /// The type name given at construction.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover the shared pointer, if it was stored as `Arc<P>`.
    pub fn get<P>(&self) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<Arc<P>>().cloned()
    }

    /// Whether both instances point at the same object.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.address == other.address
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Config
// ============================================================================

/// An insertion-ordered configuration map.
#[derive(Clone, Default, PartialEq)]
pub struct Config(IndexMap<String, Value>);

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Convert a JSON object into a configuration.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        match Value::from(value) {
            Value::Map(config) => Ok(config),
            Value::Null => Ok(Config::new()),
            other => Err(ConfigError::Malformed(format!(
                "expected an object, found {}",
                other.kind()
            ))),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a key mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Look up a string key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The `className` entry, if it is a string.
    pub fn class_name(&self) -> Option<&str> {
        self.get_str(CLASS_NAME_KEY)
    }

    /// Remove and return the `className` entry.
    pub fn take_class_name(&mut self) -> Result<Option<String>, ConfigError> {
        match self.remove(CLASS_NAME_KEY) {
            None => Ok(None),
            Some(Value::String(name)) => Ok(Some(name)),
            Some(other) => Err(ConfigError::Malformed(format!(
                "`{CLASS_NAME_KEY}` must be a string, found {}",
                other.kind()
            ))),
        }
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl IntoIterator for Config {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Config::from_json(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Merging
// ============================================================================

/// Deep-merge configurations left to right into a new configuration.
///
/// Nested maps merge key by key. Lists, handlers, objects and scalars are
/// replaced wholesale by the right-most occurrence. Inputs are not mutated.
pub fn merge_configs<'a>(configs: impl IntoIterator<Item = &'a Config>) -> Config {
    let mut merged = Config::new();
    for config in configs {
        merge_into(&mut merged, config);
    }
    merged
}

/// Deep-merge `source` into `target` in place.
pub fn merge_into(target: &mut Config, source: &Config) {
    for (key, value) in source.iter() {
        if let Value::Map(incoming) = value {
            if let Some(Value::Map(existing)) = target.get_mut(key) {
                merge_into(existing, incoming);
                continue;
            }
        }
        target.insert(key.clone(), value.clone());
    }
}
