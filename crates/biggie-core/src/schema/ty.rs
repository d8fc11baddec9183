use crate::Value;

use std::{fmt, sync::Arc};

/// Converts an incoming value into a property type's canonical form, or
/// rejects it with `None`.
pub type Caster = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// The type of a model property.
#[derive(Clone)]
pub enum Type {
    /// Integral or floating point number. Indexed through sorted sets.
    Number,

    String,

    Binary,

    Bool,

    /// A type registered with `Builder::property_type`.
    Custom { name: String, caster: Caster },
}

// The largest magnitude where every integral f64 still fits an i64.
const I64_SAFE: f64 = 9_007_199_254_740_992.0;

impl Type {
    /// Look up a built-in type by the name used in model definitions.
    pub fn builtin(name: &str) -> Option<Type> {
        match name {
            "number" => Some(Type::Number),
            "string" => Some(Type::String),
            "binary" => Some(Type::Binary),
            "boolean" => Some(Type::Bool),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Type::Number => "number",
            Type::String => "string",
            Type::Binary => "binary",
            Type::Bool => "boolean",
            Type::Custom { name, .. } => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Number)
    }

    /// Casts `value` to this type.
    ///
    /// `Null` never casts; required checks run before casting.
    pub fn cast(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return None;
        }

        match self {
            Type::Number => cast_number(value),
            Type::String => cast_string(value).map(Value::String),
            Type::Binary => match value {
                Value::Bytes(bytes) => Some(Value::Bytes(bytes.clone())),
                other => cast_string(other).map(|s| Value::Bytes(s.into_bytes())),
            },
            Type::Bool => cast_bool(value),
            Type::Custom { caster, .. } => caster(value),
        }
    }

    /// Decodes a stored hash field back into a value of this type.
    ///
    /// Payloads that no longer cast are kept as strings so a record written
    /// by another client is still readable.
    pub fn decode(&self, bytes: Vec<u8>) -> Value {
        match self {
            Type::Binary => Value::Bytes(bytes),
            Type::String => Value::String(into_string(bytes)),
            ty => {
                let raw = Value::String(into_string(bytes));
                ty.cast(&raw).unwrap_or(raw)
            }
        }
    }
}

fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn cast_number(value: &Value) -> Option<Value> {
    match value {
        Value::I64(v) => Some(Value::I64(*v)),
        Value::F64(v) => canonical_f64(*v),
        Value::Bool(v) => Some(Value::I64(*v as i64)),
        Value::String(s) => parse_number(s),
        Value::Bytes(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_number),
        Value::Null => None,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(Value::I64(v));
    }
    s.parse::<f64>().ok().and_then(canonical_f64)
}

fn canonical_f64(v: f64) -> Option<Value> {
    if !v.is_finite() {
        None
    } else if v.fract() == 0.0 && v.abs() <= I64_SAFE {
        Some(Value::I64(v as i64))
    } else {
        Some(Value::F64(v))
    }
}

fn cast_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bytes(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::Null => None,
        other => Some(other.to_key_part()),
    }
}

fn cast_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(v) => Some(Value::Bool(*v)),
        Value::I64(0) => Some(Value::Bool(false)),
        Value::I64(1) => Some(Value::Bool(true)),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Custom { name, .. } => f.debug_tuple("Custom").field(name).finish(),
            other => f.write_str(other.name()),
        }
    }
}
