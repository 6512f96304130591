//! Type-directed variable coercion.
//!
//! REST parameters arrive untyped: path segments and query strings are
//! always strings, bodies are whatever JSON the caller sent. Before a call
//! reaches the executor every declared variable is converted to the shape
//! its type requires.

use crate::error::{RgqlError, RgqlResult};
use crate::operation::OperationDocument;
use crate::routes::PathParams;
use rgql_schema::{BuiltinScalar, Schema, TypeDef, TypeRef};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Decoded query-string parameters. A repeated key keeps its last value.
pub type QueryParams = HashMap<String, String>;

/// Parses the query part of a URL (without the leading `?`).
pub fn parse_query(query: &str) -> QueryParams {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Where raw parameter values can come from.
#[derive(Debug, Clone, Copy)]
pub struct ParamSources<'a> {
    pub path: &'a PathParams,
    pub query: &'a QueryParams,
    pub body: &'a Value,
}

impl ParamSources<'_> {
    /// Picks the raw value of a parameter: path, then query string, then body.
    ///
    /// A JSON `null` in the body counts as missing.
    pub fn pick(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.path.get(name) {
            return Some(Value::String(value.clone()));
        }
        if let Some(value) = self.query.get(name) {
            return Some(Value::String(value.clone()));
        }
        match self.body.get(name) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value.clone()),
        }
    }
}

/// Coerces every variable declared by `document`.
///
/// Variables with no supplied value are omitted from the result.
pub fn coerce_variables(
    schema: &Schema,
    document: &OperationDocument,
    sources: &ParamSources<'_>,
) -> RgqlResult<Map<String, Value>> {
    let mut variables = Map::new();
    for definition in &document.variables {
        let Some(raw) = sources.pick(&definition.name) else {
            continue;
        };
        let value = coerce_variable(schema, &definition.ty, raw)
            .map_err(|e| e.with_extension("variable", &definition.name))?;
        variables.insert(definition.name.clone(), value);
    }
    Ok(variables)
}

/// Coerces a single raw value to the given type.
pub fn coerce_variable(schema: &Schema, ty: &TypeRef, value: Value) -> RgqlResult<Value> {
    match ty {
        TypeRef::NonNull(inner) => coerce_variable(schema, inner, value),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| coerce_variable(schema, inner, item))
                .collect::<RgqlResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(RgqlError::coercion(format!(
                "Expected a list for type '{ty}', got {other}"
            ))),
        },
        TypeRef::Named(name) => coerce_named(schema, name, value),
    }
}

fn coerce_named(schema: &Schema, name: &str, value: Value) -> RgqlResult<Value> {
    if name == "Boolean" {
        return Ok(Value::Bool(value.as_str() == Some("true")));
    }

    match schema.get_type(name) {
        Some(TypeDef::Scalar(scalar)) => match scalar.builtin_kind() {
            Some(builtin) => coerce_builtin(builtin, &value),
            None => Ok(value),
        },
        Some(TypeDef::InputObject(_)) => match value {
            Value::Object(_) => Ok(value),
            Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
                RgqlError::coercion(format!("Invalid JSON for input type '{name}': {e}"))
            }),
            other => Err(RgqlError::coercion(format!(
                "Expected an object for input type '{name}', got {other}"
            ))),
        },
        Some(_) => Ok(value),
        None => match BuiltinScalar::from_name(name) {
            Some(builtin) => coerce_builtin(builtin, &value),
            None => Ok(value),
        },
    }
}

fn coerce_builtin(scalar: BuiltinScalar, value: &Value) -> RgqlResult<Value> {
    scalar
        .serialize(value)
        .map_err(|e| RgqlError::coercion(e.to_string()))
}
