//! Request dispatch.
//!
//! The router owns the route table and the subscription manager. It is
//! transport agnostic: adapters turn their native request into a
//! [`Request`], call [`Router::dispatch`] and write the returned
//! [`ResponseEnvelope`] back. `None` means the request is not for us and
//! should fall through to whatever the adapter does next.

use crate::coercion::{coerce_variables, parse_query, ParamSources};
use crate::config::{ErrorHandler, RouterConfig};
use crate::context::{Context, SharedContext};
use crate::error::{RgqlError, RgqlResult};
use crate::execution::{ExecutionRequest, ExecutionResult, Executor};
use crate::models::extract_models;
use crate::operation::OperationDocument;
use crate::routes::{
    HttpMethod, PathParams, Route, RouteCompiler, RouteHandler, RouteTable, WebhookAction,
};
use crate::subscriptions::{
    parse_subscription_id, StartSubscription, SubscriptionManager, UpdateSubscription,
};
use rgql_schema::Schema;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// An incoming REST call.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Full request target, path plus optional query string.
    pub url: String,
    pub body: Value,
    pub context: SharedContext,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: Value::Null,
            context: Arc::new(Context::new()),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: SharedContext) -> Self {
        self.context = context;
        self
    }
}

/// Transport-neutral response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseEnvelope {
    Result {
        status: u16,
        #[serde(rename = "statusMessage", skip_serializing_if = "Option::is_none")]
        status_message: Option<String>,
        body: Value,
    },
    Error {
        status: u16,
        #[serde(rename = "statusMessage", skip_serializing_if = "Option::is_none")]
        status_message: Option<String>,
        error: Value,
    },
}

impl ResponseEnvelope {
    /// A `200` result.
    pub fn ok(body: Value) -> Self {
        Self::Result {
            status: 200,
            status_message: None,
            body,
        }
    }

    pub fn error(status: u16, error: Value) -> Self {
        Self::Error {
            status,
            status_message: None,
            error,
        }
    }

    #[must_use]
    pub fn with_status_message(mut self, message: impl Into<String>) -> Self {
        match &mut self {
            Self::Result { status_message, .. } | Self::Error { status_message, .. } => {
                *status_message = Some(message.into());
            }
        }
        self
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Result { status, .. } | Self::Error { status, .. } => *status,
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        match self {
            Self::Result { status_message, .. } | Self::Error { status_message, .. } => {
                status_message.as_deref()
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The `body` of a result or the `error` of an error.
    pub fn payload(&self) -> &Value {
        match self {
            Self::Result { body, .. } => body,
            Self::Error { error, .. } => error,
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            Self::Result { body, .. } => body,
            Self::Error { error, .. } => error,
        }
    }
}

/// Executor errors become a 500 carrying the first error.
fn default_error_handler(errors: &[Value]) -> ResponseEnvelope {
    ResponseEnvelope::error(500, errors.first().cloned().unwrap_or(Value::Null))
}

/// Maps REST calls onto compiled operations.
pub struct Router {
    base_path: String,
    schema: Arc<Schema>,
    executor: Arc<dyn Executor>,
    error_handler: ErrorHandler,
    models: Vec<String>,
    routes: RouteTable,
    subscriptions: SubscriptionManager,
}

impl Router {
    /// Compiles the route table and the subscription operations.
    pub fn new(config: RouterConfig) -> RgqlResult<Self> {
        let models = extract_models(&config.schema);
        debug!("[Router] Models: {}", models.join(", "));

        let compiled = RouteCompiler {
            schema: &config.schema,
            models: &models,
            ignore: &config.ignore,
            depth_limit: config.depth_limit,
            method_map: &config.method,
            compiler: config.operation_compiler.as_ref(),
        }
        .compile()?;

        let mut routes = RouteTable::new();
        for route in compiled {
            if let (Some(on_route), Some(info)) = (&config.on_route, route.info()) {
                on_route(&info);
            }
            routes.insert(route);
        }

        for (method, path, action) in [
            (HttpMethod::Post, "/webhook", WebhookAction::Start),
            (HttpMethod::Post, "/webhook/:id", WebhookAction::Update),
            (HttpMethod::Delete, "/webhook/:id", WebhookAction::Stop),
        ] {
            routes.insert(Route::new(method, path, RouteHandler::Webhook(action)));
        }

        let subscriptions = SubscriptionManager::new(&config, &models)?;
        let error_handler: ErrorHandler = match config.error_handler {
            Some(handler) => handler,
            None => Arc::new(default_error_handler),
        };

        Ok(Self {
            base_path: config.base_path,
            schema: config.schema,
            executor: config.executor,
            error_handler,
            models,
            routes,
            subscriptions,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Types recognised as REST resources.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Handles a request, or returns `None` if no route matches.
    pub async fn dispatch(&self, request: Request) -> Option<ResponseEnvelope> {
        let Request {
            method,
            url,
            body,
            context,
        } = request;

        let (route, params, query) = self.resolve(&method, &url)?;

        debug!("[Router] {} {}", route.method, route.path);

        let envelope = match &route.handler {
            RouteHandler::Operation(document) => {
                self.execute(document, &params, query, &body, context).await
            }
            RouteHandler::Webhook(action) => {
                self.webhook(*action, &params, body, context).await
            }
        };
        Some(envelope)
    }

    /// Returns true if `dispatch` would handle a request with this method
    /// and URL.
    pub fn handles(&self, method: &str, url: &str) -> bool {
        self.resolve(method, url).is_some()
    }

    fn resolve<'u>(&self, method: &str, url: &'u str) -> Option<(&Route, PathParams, &'u str)> {
        let relative = url.strip_prefix(self.base_path.as_str())?;
        let at_boundary = relative.is_empty()
            || relative.starts_with(['/', '?'])
            || self.base_path.ends_with('/');
        if !at_boundary {
            return None;
        }
        let (path, query) = relative.split_once('?').unwrap_or((relative, ""));
        let method: HttpMethod = method.parse().ok()?;
        let (route, params) = self.routes.find(method, path)?;
        Some((route, params, query))
    }

    /// Cancels all running subscriptions.
    pub async fn shutdown(&self) {
        self.subscriptions.shutdown().await;
    }

    async fn execute(
        &self,
        document: &Arc<OperationDocument>,
        params: &PathParams,
        query: &str,
        body: &Value,
        context: SharedContext,
    ) -> ResponseEnvelope {
        let query = parse_query(query);
        let sources = ParamSources {
            path: params,
            query: &query,
            body,
        };

        let result = match coerce_variables(&self.schema, document, &sources) {
            Ok(variables) => {
                self.executor
                    .execute(ExecutionRequest {
                        document: Arc::clone(document),
                        variables,
                        context,
                    })
                    .await
            }
            Err(err) => ExecutionResult::from_error(&err),
        };

        if result.has_errors() {
            return (self.error_handler)(&result.errors);
        }
        ResponseEnvelope::ok(result.field(&document.field_name))
    }

    async fn webhook(
        &self,
        action: WebhookAction,
        params: &PathParams,
        body: Value,
        context: SharedContext,
    ) -> ResponseEnvelope {
        let (outcome, failure) = match action {
            WebhookAction::Start => (self.start(body, context).await, "Subscription failed"),
            WebhookAction::Update => (
                self.update(params, body, context).await,
                "Subscription failed to update",
            ),
            WebhookAction::Stop => (self.stop(params).await, "Subscription failed to stop"),
        };

        match outcome {
            Ok(body) => ResponseEnvelope::ok(body).with_status_message("OK"),
            Err(err) => ResponseEnvelope::error(500, err.to_value()).with_status_message(failure),
        }
    }

    async fn start(&self, body: Value, context: SharedContext) -> RgqlResult<Value> {
        let input: StartSubscription = serde_json::from_value(body)
            .map_err(|e| RgqlError::coercion(format!("Invalid subscription request: {e}")))?;
        let started = self.subscriptions.start(input, context).await?;
        Ok(to_body(&started))
    }

    async fn update(
        &self,
        params: &PathParams,
        body: Value,
        context: SharedContext,
    ) -> RgqlResult<Value> {
        let id = parse_subscription_id(path_id(params))?;
        let input = match body {
            Value::Null => UpdateSubscription::default(),
            body => serde_json::from_value(body)
                .map_err(|e| RgqlError::coercion(format!("Invalid subscription update: {e}")))?,
        };
        let updated = self.subscriptions.update(id, input, context).await?;
        Ok(to_body(&updated))
    }

    async fn stop(&self, params: &PathParams) -> RgqlResult<Value> {
        let id = parse_subscription_id(path_id(params))?;
        let stopped = self.subscriptions.stop(id).await?;
        Ok(to_body(&stopped))
    }
}

fn path_id(params: &PathParams) -> &str {
    params.get("id").map_or("", String::as_str)
}

fn to_body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serialization() {
        let ok = ResponseEnvelope::ok(json!({"id": "1"}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"type": "result", "status": 200, "body": {"id": "1"}})
        );

        let failed = ResponseEnvelope::error(500, json!({"message": "boom"}))
            .with_status_message("Subscription failed");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "type": "error",
                "status": 500,
                "statusMessage": "Subscription failed",
                "error": {"message": "boom"}
            })
        );
        assert!(failed.is_error());
        assert_eq!(failed.status_message(), Some("Subscription failed"));
    }

    #[test]
    fn test_default_error_handler_uses_first_error() {
        let envelope = default_error_handler(&[json!("first"), json!("second")]);
        assert_eq!(envelope.status(), 500);
        assert_eq!(envelope.payload(), &json!("first"));
    }
}
