//! Router configuration.

use crate::compiler::SelectionCompiler;
use crate::error::{ErrorCode, RgqlResult, ResultExt};
use crate::execution::Executor;
use crate::operation::OperationCompiler;
use crate::router::ResponseEnvelope;
use crate::routes::{HttpMethod, RouteInfo};
use crate::webhook::{HttpWebhookSender, WebhookSender};
use rgql_schema::Schema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Turns executor errors into a response.
pub type ErrorHandler = Arc<dyn Fn(&[Value]) -> ResponseEnvelope + Send + Sync>;

/// Called once for every compiled field route.
pub type OnRoute = Arc<dyn Fn(&RouteInfo) + Send + Sync>;

/// Everything a [`Router`](crate::router::Router) is built from.
#[derive(Clone)]
pub struct RouterConfig {
    /// Prefix every route lives under, e.g. `/api`.
    pub base_path: String,
    pub schema: Arc<Schema>,
    pub executor: Arc<dyn Executor>,
    pub operation_compiler: Arc<dyn OperationCompiler>,
    /// Type names or `Type.field` entries never collapsed to an `id`.
    pub ignore: Vec<String>,
    pub on_route: Option<OnRoute>,
    pub depth_limit: usize,
    pub error_handler: Option<ErrorHandler>,
    /// Verb overrides keyed by `"Type.field"`.
    pub method: HashMap<String, HttpMethod>,
    pub webhook_sender: Arc<dyn WebhookSender>,
}

impl RouterConfig {
    pub fn new(
        base_path: impl Into<String>,
        schema: impl Into<Arc<Schema>>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            schema: schema.into(),
            executor,
            operation_compiler: Arc::new(SelectionCompiler),
            ignore: Vec::new(),
            on_route: None,
            depth_limit: 1,
            error_handler: None,
            method: HashMap::new(),
            webhook_sender: Arc::new(HttpWebhookSender::new()),
        }
    }

    /// Applies the serialisable part of the configuration.
    #[must_use]
    pub fn with_options(mut self, options: RouterOptions) -> Self {
        if let Some(base_path) = options.base_path {
            self.base_path = base_path;
        }
        self.ignore = options.ignore;
        self.depth_limit = options.depth_limit;
        self.method = options.method;
        self
    }

    #[must_use]
    pub fn with_operation_compiler(mut self, compiler: Arc<dyn OperationCompiler>) -> Self {
        self.operation_compiler = compiler;
        self
    }

    #[must_use]
    pub fn with_ignore<I, S>(mut self, ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = ignore.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_on_route(mut self, on_route: impl Fn(&RouteInfo) + Send + Sync + 'static) -> Self {
        self.on_route = Some(Arc::new(on_route));
        self
    }

    #[must_use]
    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    #[must_use]
    pub fn with_error_handler(
        mut self,
        handler: impl Fn(&[Value]) -> ResponseEnvelope + Send + Sync + 'static,
    ) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Overrides the verb of one field, e.g. `("Mutation.deleteUser", Delete)`.
    #[must_use]
    pub fn with_method(mut self, field: impl Into<String>, method: HttpMethod) -> Self {
        self.method.insert(field.into(), method);
        self
    }

    #[must_use]
    pub fn with_webhook_sender(mut self, sender: Arc<dyn WebhookSender>) -> Self {
        self.webhook_sender = sender;
        self
    }
}

impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("base_path", &self.base_path)
            .field("ignore", &self.ignore)
            .field("depth_limit", &self.depth_limit)
            .field("method", &self.method)
            .field("on_route", &self.on_route.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Router settings that can live in a JSON file.
///
/// ```json
/// {
///   "basePath": "/api",
///   "ignore": ["Post.author"],
///   "depthLimit": 2,
///   "method": { "Mutation.deleteUser": "DELETE" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RouterOptions {
    pub base_path: Option<String>,
    pub ignore: Vec<String>,
    pub depth_limit: usize,
    pub method: HashMap<String, HttpMethod>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            base_path: None,
            ignore: Vec::new(),
            depth_limit: 1,
            method: HashMap::new(),
        }
    }
}

impl RouterOptions {
    pub fn from_json(json: &str) -> RgqlResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> RgqlResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_rgql_err_with(
            ErrorCode::IoError,
            format!("Cannot read options file {}", path.display()),
        )?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options = RouterOptions::from_json(
            r#"{"basePath":"/api","ignore":["Post.author"],"method":{"Mutation.deleteUser":"DELETE"}}"#,
        )
        .unwrap();

        assert_eq!(options.base_path.as_deref(), Some("/api"));
        assert_eq!(options.ignore, vec!["Post.author"]);
        assert_eq!(options.depth_limit, 1);
        assert_eq!(options.method["Mutation.deleteUser"], HttpMethod::Delete);
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let err = RouterOptions::from_json(r#"{"base_path":"/api"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[test]
    fn test_missing_options_file() {
        let err = RouterOptions::from_file("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::IoError);
    }
}
