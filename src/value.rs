//! Dynamic argument model.
//!
//! Intercepted calls hand their arguments to the engine as [`Value`]s and
//! describe their parameter list with [`ParamType`]s. Objects expose their
//! fields by name through [`Reflect`]; the engine never needs to know the
//! concrete Rust type behind an argument.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::pageable::Pageable;

/// One argument of an intercepted invocation.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Text
    Text(String),
    /// Generic key/value mapping
    Map(BTreeMap<String, Value>),
    /// Object with named fields
    Object(Arc<dyn Reflect>),
}

impl Value {
    /// Wraps an object.
    pub fn object(object: impl Reflect + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer as a page number or size.
    ///
    /// Anything that is not an integer representable as `u32` is treated as
    /// absent.
    pub fn as_page_number(&self) -> Option<u32> {
        self.as_int().and_then(|n| u32::try_from(n).ok())
    }

    /// Returns the carrier view of an object argument.
    pub fn as_pageable(&self) -> Option<&dyn Pageable> {
        match self {
            Value::Object(object) => object.as_pageable(),
            _ => None,
        }
    }

    /// Reads a named field of an object or a key of a mapping.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.field(name),
            Value::Map(map) => map.get(name).cloned(),
            _ => None,
        }
    }

    /// Returns a short name of the value's runtime type.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Map(_) => "map",
            Value::Object(object) => object.type_name(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Named field access on an argument object.
///
/// Implementors that also carry paging parameters themselves should return
/// `Some(self)` from [`Reflect::as_pageable`].
pub trait Reflect: fmt::Debug + Send + Sync {
    /// Name of the object's type, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Reads the field called `name`.
    fn field(&self, name: &str) -> Option<Value>;

    /// Returns the carrier view of this object.
    fn as_pageable(&self) -> Option<&dyn Pageable> {
        None
    }
}

/// A plain object with named fields.
///
/// # Examples
///
/// ```
/// use paging_core::{Record, Reflect, Value};
///
/// let query = Record::new("UserQuery")
///     .with("offset", 2i64)
///     .with("count", 20i64);
///
/// assert_eq!(query.field("count").and_then(|v| v.as_int()), Some(20));
/// assert!(query.field("missing").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record of the named type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the static shape of this record.
    pub fn shape(&self) -> TypeShape {
        TypeShape::new(self.type_name.clone()).with_fields(self.fields.keys().cloned())
    }
}

impl Reflect for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

/// Static type of a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Boolean parameter
    Bool,
    /// Integer parameter
    Int,
    /// Text parameter
    Text,
    /// Generic key/value mapping
    Map,
    /// Object type with a known shape
    Object(TypeShape),
}

impl ParamType {
    /// Returns `true` when the parameter exposes the paging carrier shape.
    pub fn is_pageable(&self) -> bool {
        matches!(self, ParamType::Object(shape) if shape.is_pageable())
    }

    /// Returns `true` for generic mapping parameters.
    pub fn is_map(&self) -> bool {
        matches!(self, ParamType::Map)
    }

    /// Returns the type's name for diagnostics.
    pub fn name(&self) -> &str {
        match self {
            ParamType::Bool => "bool",
            ParamType::Int => "int",
            ParamType::Text => "text",
            ParamType::Map => "map",
            ParamType::Object(shape) => shape.name(),
        }
    }
}

/// Name, fields and carrier capability of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShape {
    name: String,
    fields: BTreeSet<String>,
    pageable: bool,
}

impl TypeShape {
    /// Creates a shape with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeSet::new(),
            pageable: false,
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into());
        self
    }

    /// Adds several fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Marks the type as a paging carrier.
    pub fn pageable(mut self) -> Self {
        self.pageable = true;
        self
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when the type declares `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Returns `true` when the type is a paging carrier.
    pub fn is_pageable(&self) -> bool {
        self.pageable
    }
}

/// Returns the argument at `index`.
///
/// Out-of-bounds indices and null arguments both read as absent.
pub fn arg_at(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index).filter(|v| !v.is_null())
}

/// Returns `true` when `text` is empty or whitespace only.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_at_treats_null_and_out_of_bounds_as_absent() {
        let args = vec![Value::Int(1), Value::Null];

        assert_eq!(arg_at(&args, 0).and_then(Value::as_int), Some(1));
        assert!(arg_at(&args, 1).is_none());
        assert!(arg_at(&args, 2).is_none());
    }

    #[test]
    fn blank_text() {
        assert!(is_blank(""));
        assert!(is_blank("  \t\n"));
        assert!(!is_blank(" id:asc "));
    }

    #[test]
    fn page_numbers_reject_out_of_range_integers() {
        assert_eq!(Value::Int(3).as_page_number(), Some(3));
        assert_eq!(Value::Int(-1).as_page_number(), None);
        assert_eq!(Value::Int(i64::MAX).as_page_number(), None);
        assert_eq!(Value::from("3").as_page_number(), None);
    }

    #[test]
    fn field_reads_objects_and_maps() {
        let record = Value::object(Record::new("Query").with("count", 5i64));
        assert_eq!(record.field("count").and_then(|v| v.as_int()), Some(5));

        let mut map = BTreeMap::new();
        map.insert("count".to_string(), Value::Int(7));
        let map = Value::Map(map);
        assert_eq!(map.field("count").and_then(|v| v.as_int()), Some(7));

        assert!(Value::Int(1).field("count").is_none());
    }

    #[test]
    fn option_converts_to_null() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some(4i64)).as_int(), Some(4));
    }

    #[test]
    fn record_shape_lists_fields() {
        let shape = Record::new("Query").with("offset", 0i64).shape();

        assert_eq!(shape.name(), "Query");
        assert!(shape.has_field("offset"));
        assert!(!shape.has_field("count"));
        assert!(!ParamType::Object(shape).is_pageable());
    }
}
