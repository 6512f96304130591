//! Serialization contracts of the built-in scalars.
//!
//! Raw REST parameters mostly arrive as strings; each built-in scalar decides
//! which raw values it can represent, following the GraphQL reference rules.

use serde_json::{Number, Value};
use thiserror::Error;

/// The scalars every schema provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinScalar {
    Int,
    Float,
    String,
    Boolean,
    ID,
}

/// Error returned when a scalar cannot represent a value.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{scalar} cannot represent value: {value}")]
pub struct ScalarError {
    pub scalar: &'static str,
    pub value: Value,
}

impl BuiltinScalar {
    pub const ALL: [BuiltinScalar; 5] = [
        BuiltinScalar::Int,
        BuiltinScalar::Float,
        BuiltinScalar::String,
        BuiltinScalar::Boolean,
        BuiltinScalar::ID,
    ];

    /// Looks up a built-in scalar by type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "String" => Some(Self::String),
            "Boolean" => Some(Self::Boolean),
            "ID" => Some(Self::ID),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::ID => "ID",
        }
    }

    /// Converts a raw value into the scalar's canonical JSON form.
    pub fn serialize(&self, value: &Value) -> Result<Value, ScalarError> {
        let result = match self {
            Self::Int => to_number(value).and_then(to_int),
            Self::Float => to_number(value)
                .filter(|n| n.is_finite())
                .and_then(|n| Number::from_f64(n).map(Value::Number)),
            Self::String => match value {
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                _ => None,
            },
            Self::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Number(n) => n.as_f64().map(|n| Value::Bool(n != 0.0)),
                _ => None,
            },
            Self::ID => match value {
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Number(n) if n.is_i64() || n.is_u64() => {
                    Some(Value::String(n.to_string()))
                }
                _ => None,
            },
        };

        result.ok_or_else(|| ScalarError {
            scalar: self.name(),
            value: value.clone(),
        })
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(n: f64) -> Option<Value> {
    if n.fract() != 0.0 || n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
        return None;
    }
    Some(Value::from(n as i32))
}
