use std::fmt;

use serde::Serialize;

/// Scalar value carried by a document field or listed in an equality predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
}

/// Canonical, hashable form of a [`Value`], used for equality sets and index keys.
///
/// Integral floats collapse onto `Int` so that `10` and `10.0` address the same
/// posting list, mirroring how numeric equality behaves during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    /// Raw bits of a non-integral (or out of range) float.
    Float(u64),
    Text(String),
}

// 2^63 as f64; anything at or above it does not fit an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl Value {
    /// Numeric view of this value. Strings and bools are not numbers.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(_) | Value::String(_) => None,
        }
    }

    /// Textual view of this value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The canonical key for equality lookups.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn key_value(&self) -> KeyValue {
        match self {
            Value::Int(v) => KeyValue::Int(*v),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && *f >= -I64_BOUND && *f < I64_BOUND {
                    KeyValue::Int(*f as i64)
                } else if f.is_nan() {
                    KeyValue::Float(f64::NAN.to_bits())
                } else {
                    KeyValue::Float(f.to_bits())
                }
            }
            Value::Bool(b) => KeyValue::Bool(*b),
            Value::String(s) => KeyValue::Text(s.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Value> for KeyValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => KeyValue::Text(s),
            other => other.key_value(),
        }
    }
}

impl From<&KeyValue> for Value {
    fn from(key: &KeyValue) -> Self {
        match key {
            KeyValue::Bool(b) => Value::Bool(*b),
            KeyValue::Int(i) => Value::Int(*i),
            KeyValue::Float(bits) => Value::Float(f64::from_bits(*bits)),
            KeyValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(v) => write!(f, "{v}"),
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyValue::Text(v) => write!(f, "\"{v}\""),
        }
    }
}
