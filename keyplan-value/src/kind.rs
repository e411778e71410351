use core::fmt;

use crate::{Number, Object, Value};

/// The declared type a value is read as.
///
/// Decoders use [`ValueKind::coerce`] to decide whether a stored value
/// matches what a field expects; anything it rejects is a type mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    /// Any value at all, including null
    #[default]
    Any,
    /// Boolean
    Bool,
    /// Integer in `i64` range
    Int,
    /// Non-negative integer
    UInt,
    /// Any number; integers are converted to floating point
    Float,
    /// String
    String,
    /// Homogeneous array
    Array(Box<ValueKind>),
    /// Object with homogeneous values
    Map(Box<ValueKind>),
    /// Any object
    Object,
}

impl ValueKind {
    /// Shorthand for `ValueKind::Array(Box::new(inner))`.
    pub fn array_of(inner: ValueKind) -> Self {
        ValueKind::Array(Box::new(inner))
    }

    /// Shorthand for `ValueKind::Map(Box::new(inner))`.
    pub fn map_of(inner: ValueKind) -> Self {
        ValueKind::Map(Box::new(inner))
    }

    /// Whether `value` can be read as this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueKind::Any, _) => true,
            (ValueKind::Bool, Value::Bool(_)) => true,
            (ValueKind::Int, Value::Number(n)) => n.as_i64().is_some(),
            (ValueKind::UInt, Value::Number(n)) => n.as_u64().is_some(),
            (ValueKind::Float, Value::Number(_)) => true,
            (ValueKind::String, Value::String(_)) => true,
            (ValueKind::Array(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (ValueKind::Map(inner), Value::Object(map)) => {
                map.values().all(|item| inner.accepts(item))
            }
            (ValueKind::Object, Value::Object(_)) => true,
            _ => false,
        }
    }

    /// Reads `value` as this kind, normalizing numbers (integers read as
    /// [`ValueKind::Float`] become floats). Returns `None` on mismatch.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueKind::Float, Value::Number(n)) => Some(Value::Number(Number::F64(n.as_f64()))),
            (ValueKind::Array(inner), Value::Array(items)) => items
                .iter()
                .map(|item| inner.coerce(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            (ValueKind::Map(inner), Value::Object(map)) => map
                .iter()
                .map(|(k, item)| inner.coerce(item).map(|v| (k.clone(), v)))
                .collect::<Option<Object>>()
                .map(Value::Object),
            _ if self.accepts(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Any => f.write_str("any"),
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Int => f.write_str("int"),
            ValueKind::UInt => f.write_str("uint"),
            ValueKind::Float => f.write_str("float"),
            ValueKind::String => f.write_str("string"),
            ValueKind::Array(inner) => write!(f, "array<{inner}>"),
            ValueKind::Map(inner) => write!(f, "map<{inner}>"),
            ValueKind::Object => f.write_str("object"),
        }
    }
}

/// A field's declared type: a [`ValueKind`] plus nullability.
///
/// Nullable fields read `null` as [`Value::Null`] and may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldType {
    /// What a present, non-null value must look like.
    pub kind: ValueKind,
    /// Whether `null` / absence is a legal value.
    pub nullable: bool,
}

impl FieldType {
    /// A non-nullable type.
    pub const fn required(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// A nullable type.
    pub const fn optional(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    /// Reads `value` as this type; `null` is accepted only when nullable.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return self.nullable.then_some(Value::Null);
        }
        self.kind.coerce(value)
    }
}

impl From<ValueKind> for FieldType {
    fn from(kind: ValueKind) -> Self {
        FieldType::required(kind)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}
