//! REST surface over a schema-described GraphQL API.
//!
//! Every root query and mutation field becomes one REST route, parameters
//! are coerced to the types the field declares, and subscriptions are
//! delivered by webhook push.
//!
//! # Example
//!
//! ```ignore
//! use rgql_runtime::{Request, Router, RouterConfig};
//!
//! let router = Router::new(RouterConfig::new("/api", schema, executor))?;
//! let response = router.dispatch(Request::new("GET", "/api/user/1")).await;
//! ```

pub mod coercion;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod models;
pub mod operation;
pub mod router;
pub mod routes;
pub mod subscriptions;
pub mod webhook;

pub use coercion::{coerce_variable, coerce_variables, ParamSources};
pub use compiler::SelectionCompiler;
pub use config::{ErrorHandler, OnRoute, RouterConfig, RouterOptions};
pub use context::{Context, ContextExt, SharedContext};
pub use error::{ErrorCode, ResultExt, RgqlError, RgqlResult};
pub use execution::{ExecutionRequest, ExecutionResult, Executor, ResultStream, SubscribeOutcome};
pub use models::{extract_models, Model};
pub use operation::{
    CompileRequest, OperationCompiler, OperationDocument, OperationKind, VariableDefinition,
};
pub use router::{Request, ResponseEnvelope, Router};
pub use routes::{HttpMethod, Route, RouteInfo, RouteTable};
pub use subscriptions::{StartResult, StartSubscription, SubscriptionManager, UpdateSubscription};
pub use webhook::{HttpWebhookSender, WebhookSender};

pub use rgql_schema as schema;
