//! Route table and route compilation.
//!
//! Each root query and mutation field becomes exactly one route:
//!
//! | Field                    | Route               |
//! |--------------------------|---------------------|
//! | `Query.users`            | `GET /users`        |
//! | `Query.user(id: ID!)`    | `GET /user/:id`     |
//! | `Mutation.addUser(...)`  | `POST /add-user`    |
//!
//! Verbs can be overridden per `"Type.field"`. Two fields that map to the
//! same method and path are not reported; the last one registered wins.

use crate::error::{RgqlError, RgqlResult};
use crate::operation::{CompileRequest, OperationCompiler, OperationDocument, OperationKind};
use rgql_schema::{convert_name, FieldDef, ObjectDef, Schema};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// HTTP verbs a route can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Returns true for verbs whose variables travel in a request body.
    pub const fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RgqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(RgqlError::config(format!("Unsupported HTTP method '{other}'"))),
        }
    }
}

/// Parameters bound from named path segments.
pub type PathParams = FxHashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// A parsed path such as `/user/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Self {
        let segments = split_path(path)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Matches a concrete path, binding named segments.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }

    /// Returns the names of the path parameters.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }
}

/// Splits on `/` after dropping one leading and one trailing slash.
/// Interior empty segments are kept so `//` never matches a single `/`.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path).split('/')
}

/// The fixed subscription webhook endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAction {
    /// `POST /webhook`
    Start,
    /// `POST /webhook/:id`
    Update,
    /// `DELETE /webhook/:id`
    Stop,
}

/// What a matched route does.
#[derive(Debug, Clone)]
pub enum RouteHandler {
    /// Execute a compiled query or mutation.
    Operation(Arc<OperationDocument>),
    /// Drive the subscription manager.
    Webhook(WebhookAction),
}

/// A single entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pattern: PathPattern,
    pub handler: RouteHandler,
}

impl Route {
    pub fn new(method: HttpMethod, path: impl Into<String>, handler: RouteHandler) -> Self {
        let path = path.into();
        Self {
            method,
            pattern: PathPattern::parse(&path),
            path,
            handler,
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns the root field served by this route, if any.
    pub fn field_name(&self) -> Option<&str> {
        match &self.handler {
            RouteHandler::Operation(document) => Some(&document.field_name),
            RouteHandler::Webhook(_) => None,
        }
    }

    /// Returns the public description of this route.
    pub fn info(&self) -> Option<RouteInfo> {
        match &self.handler {
            RouteHandler::Operation(document) => Some(RouteInfo {
                method: self.method,
                path: self.path.clone(),
                document: Arc::clone(document),
            }),
            RouteHandler::Webhook(_) => None,
        }
    }
}

/// A compiled field route, as reported to `on_route` callbacks.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub method: HttpMethod,
    pub path: String,
    pub document: Arc<OperationDocument>,
}

/// Ordered mapping from `(method, path)` to a handler.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route. An existing route with the same method and path
    /// is replaced in place.
    pub fn insert(&mut self, route: Route) {
        if let Some(existing) = self
            .routes
            .iter_mut()
            .find(|r| r.method == route.method && r.path == route.path)
        {
            debug!("[Router] {} {} replaced", route.method, route.path);
            *existing = route;
        } else {
            self.routes.push(route);
        }
    }

    /// Finds the first route matching the method and path.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Derives the REST path of a root field.
pub fn field_path(field_name: &str, with_id: bool) -> String {
    let suffix = if with_id { "/:id" } else { "" };
    format!("/{}{}", convert_name(field_name), suffix)
}

/// Compiles the root query and mutation fields into routes.
pub struct RouteCompiler<'a> {
    pub schema: &'a Schema,
    pub models: &'a [String],
    pub ignore: &'a [String],
    pub depth_limit: usize,
    pub method_map: &'a HashMap<String, HttpMethod>,
    pub compiler: &'a dyn OperationCompiler,
}

impl RouteCompiler<'_> {
    /// Compiles every root field, queries first, in schema order.
    pub fn compile(&self) -> RgqlResult<Vec<Route>> {
        let mut routes = Vec::new();

        if let Some(query) = self.schema.query_root() {
            for field in query.fields.values() {
                routes.push(self.query_route(query, field)?);
            }
        }

        if let Some(mutation) = self.schema.mutation_root() {
            for field in mutation.fields.values() {
                routes.push(self.mutation_route(mutation, field)?);
            }
        }

        Ok(routes)
    }

    fn query_route(&self, root: &ObjectDef, field: &FieldDef) -> RgqlResult<Route> {
        debug!("[Router] Creating {} query", field.name);

        let document = self.document(OperationKind::Query, field)?;
        let is_single = match field.ty.nullable() {
            rgql_schema::TypeRef::Named(name) => self.schema.get_object(name).is_some(),
            _ => false,
        };
        let has_id_argument = field.arguments.contains_key("id");
        let path = field_path(&field.name, is_single && has_id_argument);
        let method = self.method_for(&root.name, &field.name, HttpMethod::Get);

        debug!("[Router] {} query available at {} {}", field.name, method, path);
        Ok(Route::new(method, path, RouteHandler::Operation(document)))
    }

    fn mutation_route(&self, root: &ObjectDef, field: &FieldDef) -> RgqlResult<Route> {
        debug!("[Router] Creating {} mutation", field.name);

        let document = self.document(OperationKind::Mutation, field)?;
        let path = field_path(&field.name, false);
        let method = self.method_for(&root.name, &field.name, HttpMethod::Post);

        debug!("[Router] {} mutation available at {} {}", field.name, method, path);
        Ok(Route::new(method, path, RouteHandler::Operation(document)))
    }

    fn document(&self, kind: OperationKind, field: &FieldDef) -> RgqlResult<Arc<OperationDocument>> {
        let document = self.compiler.compile(&CompileRequest {
            kind,
            field: &field.name,
            schema: self.schema,
            models: self.models,
            ignore: self.ignore,
            depth_limit: self.depth_limit,
        })?;
        Ok(Arc::new(document))
    }

    fn method_for(&self, type_name: &str, field_name: &str, default: HttpMethod) -> HttpMethod {
        self.method_map
            .get(&format!("{type_name}.{field_name}"))
            .copied()
            .unwrap_or(default)
    }
}
