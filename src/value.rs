//! Field values and their InfluxDB types.

use std::str::FromStr;

use ordered_float::OrderedFloat;

use crate::error::Error;

/// Represents the value of a single field in a row.
///
/// InfluxDB stores four field types. `Null` marks a field that is absent
/// from a row; it is never written to line protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// Signed 64-bit integer (`42i` in line protocol).
    Integer(i64),

    /// 64-bit floating point value.
    Float(OrderedFloat<f64>),

    /// String value.
    String(String),

    /// Boolean value.
    Boolean(bool),

    /// Absent value.
    Null,
}

impl Value {
    /// Returns the value as a string reference if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a f64 if it is a `Float` variant.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f.into_inner()),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it is an `Integer` variant.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a bool if it is a `Boolean` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The InfluxDB field type of this value, `None` for `Null`.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Value::Integer(_) => Some(FieldKind::Integer),
            Value::Float(_) => Some(FieldKind::Float),
            Value::String(_) => Some(FieldKind::String),
            Value::Boolean(_) => Some(FieldKind::Boolean),
            Value::Null => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(OrderedFloat(v.into()))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Field types supported by InfluxDB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    String,
    /// Boolean value.
    Boolean,
}

impl FromStr for FieldKind {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            _ => Err(Error::Parse {
                message: format!("Unknown field type: {}", input),
            }),
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
        };
        write!(f, "{}", s)
    }
}

/// Rust types that can back a field member of a typed row.
///
/// The associated [`FieldKind`] is the decoding hint for that member: JSON
/// has a single number type, so whether `1` is read as an integer or a
/// float is decided by the member, not by the response.
pub trait FieldType: Sized {
    /// InfluxDB type this Rust type is stored as.
    const KIND: FieldKind;

    /// Converts into a field value.
    fn into_value(self) -> Value;

    /// Converts back from a field value of kind [`Self::KIND`]. Returns
    /// `None` if the value does not fit.
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FieldType for i32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self.into())
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_integer().and_then(|v| i32::try_from(v).ok())
    }
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn into_value(self) -> Value {
        Value::Float(OrderedFloat(self))
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_float()
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn into_value(self) -> Value {
        Value::Float(OrderedFloat(self.into()))
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_float().map(|v| v as f32)
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}
