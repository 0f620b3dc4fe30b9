//! Attribute values
//!
//! Typed scalar stored in a row slot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::AttributeType;

/// A single typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Null,
}

impl Value {
    /// Type of this value, `None` for `Null`
    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self {
            Value::Int(_) => Some(AttributeType::Int),
            Value::Long(_) => Some(AttributeType::Long),
            Value::Float(_) => Some(AttributeType::Float),
            Value::Double(_) => Some(AttributeType::Double),
            Value::Bool(_) => Some(AttributeType::Bool),
            Value::String(_) => Some(AttributeType::String),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view (Int and Long only)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Numeric view across all numeric variants
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Widen a numeric value to `target`.
    ///
    /// Values that are already of the target type, `Null`, and non-numeric
    /// values are returned unchanged. Callers only widen along
    /// `Int < Long < Float < Double`, which the compiler enforces.
    pub fn widen(self, target: AttributeType) -> Value {
        match (target, &self) {
            (AttributeType::Long, Value::Int(i)) => Value::Long(i64::from(*i)),
            (AttributeType::Float, Value::Int(i)) => Value::Float(*i as f32),
            (AttributeType::Float, Value::Long(l)) => Value::Float(*l as f32),
            (AttributeType::Double, Value::Int(i)) => Value::Double(f64::from(*i)),
            (AttributeType::Double, Value::Long(l)) => Value::Double(*l as f64),
            (AttributeType::Double, Value::Float(f)) => Value::Double(f64::from(*f)),
            _ => self,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}L", l),
            Value::Float(v) => write!(f, "{}F", v),
            Value::Double(d) => write!(f, "{}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
