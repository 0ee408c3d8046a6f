//! Runtime value types for topic payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Data types a topic can declare in its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// UTF-8 string.
    Str,
    /// Structured JSON value.
    Json,
    /// Binary data.
    Bin,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
    /// Boolean value.
    Bool,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
}

impl Dtype {
    /// Check if this type is a fixed-width integer.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Dtype::U8
                | Dtype::U16
                | Dtype::U32
                | Dtype::U64
                | Dtype::I8
                | Dtype::I16
                | Dtype::I32
                | Dtype::I64
        )
    }

    /// Check if this type is numeric (integer or float).
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Dtype::F32 | Dtype::F64)
    }
}

/// A runtime value carried by a topic.
///
/// This is the closed union of everything a topic can hold, one variant
/// per declared [`Dtype`]. `Null` is a deliberately published null and is
/// distinct from "no retained value", which the engine models as the
/// absence of any `Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// UTF-8 string.
    Str(String),
    /// Structured JSON value.
    Json(serde_json::Value),
    /// Binary data.
    Bin(Vec<u8>),
    /// Boolean value.
    Bool(bool),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit floating point.
    F32(f32),
    /// 64-bit floating point.
    F64(f64),
}

impl Value {
    /// Check if this value is the explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The declared type this value corresponds to; `None` for `Null`.
    pub fn dtype(&self) -> Option<Dtype> {
        match self {
            Value::Null => None,
            Value::Str(_) => Some(Dtype::Str),
            Value::Json(_) => Some(Dtype::Json),
            Value::Bin(_) => Some(Dtype::Bin),
            Value::Bool(_) => Some(Dtype::Bool),
            Value::U8(_) => Some(Dtype::U8),
            Value::U16(_) => Some(Dtype::U16),
            Value::U32(_) => Some(Dtype::U32),
            Value::U64(_) => Some(Dtype::U64),
            Value::I8(_) => Some(Dtype::I8),
            Value::I16(_) => Some(Dtype::I16),
            Value::I32(_) => Some(Dtype::I32),
            Value::I64(_) => Some(Dtype::I64),
            Value::F32(_) => Some(Dtype::F32),
            Value::F64(_) => Some(Dtype::F64),
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as binary data reference.
    pub fn as_bin(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as JSON reference.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Try to get as u64, widening unsigned variants.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(v) => Some(u64::from(*v)),
            Value::U16(v) => Some(u64::from(*v)),
            Value::U32(v) => Some(u64::from(*v)),
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64, widening every integer variant that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::U8(v) => Some(i64::from(*v)),
            Value::U16(v) => Some(i64::from(*v)),
            Value::U32(v) => Some(i64::from(*v)),
            Value::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get as f64, widening `F32`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce to a boolean using the wire spellings.
    ///
    /// Accepts native booleans, `0`/`1` in any integer width, and the
    /// case-insensitive strings `no`/`yes`, `off`/`on`,
    /// `disable(d)`/`enable(d)`, `false`/`true`, `inactive`/`active`.
    pub fn coerce_bool(&self) -> Result<bool, Error> {
        if let Value::Bool(b) = self {
            return Ok(*b);
        }
        if let Some(n) = self.as_i64() {
            return match n {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(Error::InvalidBool(n.to_string())),
            };
        }
        if let Value::Str(s) = self {
            return match s.to_ascii_lowercase().as_str() {
                "0" | "no" | "off" | "disable" | "disabled" | "false" | "inactive" => Ok(false),
                "1" | "yes" | "on" | "enable" | "enabled" | "true" | "active" => Ok(true),
                _ => Err(Error::InvalidBool(s.clone())),
            };
        }
        Err(Error::InvalidBool(format!("{self:?}")))
    }

    /// Map a JSON value to a `Value` by shape.
    ///
    /// Integers land in `I64` (or `U64` past `i64::MAX`), floats in
    /// `F64`, arrays and objects in `Json`. Binary data never arrives via
    /// JSON; it comes from the native API or a byte transport.
    pub fn from_json(raw: serde_json::Value) -> Value {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            other => Value::Json(other),
        }
    }

    /// Render as the natural JSON form.
    ///
    /// Non-finite floats become JSON null, matching serde_json.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Number};
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Str(s) => json!(s),
            Value::Json(j) => j.clone(),
            Value::Bin(b) => json!(b),
            Value::Bool(b) => json!(b),
            Value::U8(v) => json!(v),
            Value::U16(v) => json!(v),
            Value::U32(v) => json!(v),
            Value::U64(v) => json!(v),
            Value::I8(v) => json!(v),
            Value::I16(v) => json!(v),
            Value::I32(v) => json!(v),
            Value::I64(v) => json!(v),
            Value::F32(v) => Number::from_f64(f64::from(*v))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::F64(v) => Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(raw))
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bin(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::I8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
