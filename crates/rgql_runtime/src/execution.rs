//! The executor interface.
//!
//! The router never executes GraphQL itself. Embedders implement
//! [`Executor`] on top of whatever engine they run and hand it to the
//! router configuration.

use crate::context::SharedContext;
use crate::error::RgqlError;
use crate::operation::OperationDocument;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A call to be executed on behalf of a route or subscription.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub document: Arc<OperationDocument>,
    pub variables: Map<String, Value>,
    pub context: SharedContext,
}

/// Outcome of a single execution: data, errors or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
}

impl ExecutionResult {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn errors(errors: Vec<Value>) -> Self {
        Self { data: None, errors }
    }

    /// Builds a result carrying a single router error.
    pub fn from_error(error: &RgqlError) -> Self {
        Self::errors(vec![error.to_value()])
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the value of the given root field, or `null`.
    pub fn field(&self, name: &str) -> Value {
        self.data
            .as_ref()
            .and_then(|data| data.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Stream of results produced by a live subscription.
pub type ResultStream = BoxStream<'static, ExecutionResult>;

/// What `subscribe` hands back.
pub enum SubscribeOutcome {
    /// A live source of results, pulled until it ends or is cancelled.
    Stream(ResultStream),
    /// A single result returned instead of a stream (typically errors).
    Immediate(ExecutionResult),
}

impl std::fmt::Debug for SubscribeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
        }
    }
}

/// Executes compiled operations.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes a query or mutation.
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult;

    /// Starts a subscription.
    async fn subscribe(&self, request: ExecutionRequest) -> SubscribeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_lookup() {
        let result = ExecutionResult::data(json!({"user": {"id": "1"}}));
        assert_eq!(result.field("user"), json!({"id": "1"}));
        assert_eq!(result.field("other"), Value::Null);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_serialization_skips_empty_parts() {
        let result = ExecutionResult::data(json!({"ok": true}));
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"data": {"ok": true}}));

        let failed = ExecutionResult::from_error(&RgqlError::execution("boom"));
        let json = serde_json::to_value(&failed).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["errors"][0]["code"], "EXECUTION_ERROR");
    }
}
