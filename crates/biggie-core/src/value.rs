use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Attribute values of one record, in property declaration order.
pub type Attributes = IndexMap<String, Value>;

/// An attribute value held by a model instance.
///
/// Values are loosely typed on the way in; the property type's caster
/// turns them into their canonical variant during validation.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Raw bytes
    Bytes(Vec<u8>),

    /// Non-integral number
    F64(f64),

    /// Integral number
    I64(i64),

    /// Null value
    #[default]
    Null,

    /// String value
    String(String),
}

impl Value {
    pub const fn null() -> Value {
        Value::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub const fn is_number(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            Value::F64(v) if v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::I64(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// The sorted-set score used for numeric indexes.
    pub fn score(&self) -> Option<f64> {
        self.as_f64()
    }

    /// Encodes the value the way it is written into the attribute hash.
    ///
    /// `Null` encodes to an empty payload; callers delete the hash field
    /// instead of writing it.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bytes(v) => v.clone(),
            Value::Null => Vec::new(),
            other => other.to_key_part().into_bytes(),
        }
    }

    /// Renders the value as the trailing segment of a per-value index key
    /// (`index:type:prop:value`).
    pub fn to_key_part(&self) -> String {
        match self {
            Value::Bool(v) => v.to_string(),
            Value::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
            Value::F64(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::Null => String::new(),
            Value::String(v) => v.clone(),
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            other => f.write_str(&other.to_key_part()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::Null => serializer.serialize_unit(),
            Value::String(v) => serializer.serialize_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Value {
        Value::Bool(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Value {
        Value::I64(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Value {
        Value::I64(src.into())
    }
}

impl From<u64> for Value {
    fn from(src: u64) -> Value {
        match i64::try_from(src) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::F64(src as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Value {
        Value::F64(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Value {
        Value::String(src.to_string())
    }
}

impl From<String> for Value {
    fn from(src: String) -> Value {
        Value::String(src)
    }
}

impl From<Vec<u8>> for Value {
    fn from(src: Vec<u8>) -> Value {
        Value::Bytes(src)
    }
}

impl From<&[u8]> for Value {
    fn from(src: &[u8]) -> Value {
        Value::Bytes(src.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Value {
        match src {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
