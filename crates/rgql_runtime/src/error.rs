//! Error types for the REST layer.
//!
//! Every failure is scoped to the request or push attempt that produced it.
//! Errors serialize to JSON so they can travel inside an error envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Typed error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    /// Unknown subscription field or subscription id.
    NotFound,
    /// The executor reported errors.
    ExecutionError,
    /// A raw parameter could not be converted to its declared type.
    CoercionError,
    /// A webhook delivery failed.
    PushError,
    /// Invalid configuration.
    ConfigError,
    /// Schema is missing something the router needs.
    SchemaError,
    /// Filesystem failure.
    IoError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::CoercionError => "COERCION_ERROR",
            Self::PushError => "PUSH_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::SchemaError => "SCHEMA_ERROR",
            Self::IoError => "IO_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error raised by the router, the coercion layer or the subscription manager.
#[derive(Error, Debug, Clone)]
#[error("[{code}] {message}")]
pub struct RgqlError {
    pub code: ErrorCode,
    pub message: String,
    pub extensions: Option<HashMap<String, serde_json::Value>>,
}

impl RgqlError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extensions: None,
        }
    }

    /// Adds extension data.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let extensions = self.extensions.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            extensions.insert(key.into(), v);
        }
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExecutionError, message)
    }

    pub fn coercion(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CoercionError, message)
    }

    pub fn push(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PushError, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaError, message)
    }

    /// Converts the error into a GraphQL-style error object.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for RgqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("RgqlError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref ext) = self.extensions {
            state.serialize_field("extensions", ext)?;
        }
        state.end()
    }
}

impl From<serde_json::Error> for RgqlError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::ConfigError, err.to_string())
    }
}

/// Type alias for results in this crate.
pub type RgqlResult<T> = std::result::Result<T, RgqlError>;

/// Result extension for mapping foreign errors.
pub trait ResultExt<T> {
    /// Maps the error to an `RgqlError` with the given code.
    fn map_rgql_err(self, code: ErrorCode) -> RgqlResult<T>;

    /// Maps the error to an `RgqlError` with the given code and message,
    /// keeping the original message as an extension.
    fn map_rgql_err_with(self, code: ErrorCode, message: impl Into<String>) -> RgqlResult<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn map_rgql_err(self, code: ErrorCode) -> RgqlResult<T> {
        self.map_err(|e| RgqlError::new(code, e.to_string()))
    }

    fn map_rgql_err_with(self, code: ErrorCode, message: impl Into<String>) -> RgqlResult<T> {
        self.map_err(|e| {
            RgqlError::new(code, message).with_extension("original_error", e.to_string())
        })
    }
}
