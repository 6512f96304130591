//! OpenAPI 3.0 documents for rgql routes.
//!
//! Build an [`OpenApi`] from the schema, then feed it every compiled route
//! through the router's `on_route` callback:
//!
//! ```ignore
//! let openapi = Arc::new(Mutex::new(OpenApi::new(schema.clone(), Info::new("Users", "1.0.0"))));
//! let sink = Arc::clone(&openapi);
//! let config = RouterConfig::new("/api", schema, executor)
//!     .with_on_route(move |route| sink.lock().unwrap().add_route(route, "/api"));
//! ```

use rgql_runtime::error::{ErrorCode, ResultExt, RgqlError, RgqlResult};
use rgql_runtime::{OperationKind, RouteInfo, VariableDefinition};
use rgql_schema::{FieldDef, Schema, TypeDef, TypeRef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The `info` object of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Info {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An OpenAPI document under construction.
#[derive(Debug, Clone)]
pub struct OpenApi {
    schema: Arc<Schema>,
    document: Map<String, Value>,
}

impl OpenApi {
    /// Creates a document with a component schema per object and input type.
    pub fn new(schema: impl Into<Arc<Schema>>, info: Info) -> Self {
        let schema = schema.into();

        let mut components = Map::new();
        for (name, type_def) in schema.types() {
            if let Some(object) = component_schema(&schema, type_def) {
                components.insert(name.clone(), object);
            }
        }

        let mut document = Map::new();
        document.insert("openapi".into(), json!("3.0.0"));
        document.insert("info".into(), json!(info));
        document.insert("paths".into(), Value::Object(Map::new()));
        document.insert("components".into(), json!({ "schemas": components }));

        Self { schema, document }
    }

    /// Adds a `servers` entry.
    #[must_use]
    pub fn with_server(mut self, url: impl Into<String>) -> Self {
        let servers = self
            .document
            .entry("servers")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(servers) = servers {
            servers.push(json!({ "url": url.into() }));
        }
        self
    }

    /// Adds the operation behind a compiled route.
    pub fn add_route(&mut self, route: &RouteInfo, base_path: &str) {
        let path = format!("{base_path}{}", openapi_path(&route.path));
        debug!("[OpenAPI] {} {}", route.method, path);

        let operation = self.operation(route, &path);
        if let Some(Value::Object(paths)) = self.document.get_mut("paths") {
            let item = paths
                .entry(path)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(item) = item {
                item.insert(route.method.as_str().to_ascii_lowercase(), operation);
            }
        }
    }

    /// The document as it stands.
    pub fn get(&self) -> Value {
        Value::Object(self.document.clone())
    }

    pub fn to_json(&self) -> RgqlResult<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }

    pub fn to_yaml(&self) -> RgqlResult<String> {
        serde_yaml::to_string(&self.document).map_rgql_err(ErrorCode::ConfigError)
    }

    /// Writes the document, as JSON for `.json` targets and as YAML for
    /// `.yaml`/`.yml` targets.
    pub fn save(&self, path: impl AsRef<Path>) -> RgqlResult<()> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let contents = match extension.as_deref() {
            Some("json") => self.to_json()?,
            Some("yaml" | "yml") => self.to_yaml()?,
            _ => {
                return Err(RgqlError::config(format!(
                    "Cannot write {}: only JSON and YAML files are supported",
                    path.display()
                )))
            }
        };

        std::fs::write(path, contents).map_rgql_err_with(
            ErrorCode::IoError,
            format!("Cannot write {}", path.display()),
        )
    }

    fn operation(&self, route: &RouteInfo, path: &str) -> Value {
        let document = &route.document;
        let field = self.root_field(document.kind, &document.field_name);

        let mut operation = Map::new();
        operation.insert("operationId".into(), json!(document.name));

        if route.method.has_body() {
            operation.insert(
                "requestBody".into(),
                json!({
                    "content": {
                        "application/json": { "schema": self.request_body(&document.variables) }
                    }
                }),
            );
        } else {
            let parameters: Vec<Value> = document
                .variables
                .iter()
                .map(|variable| {
                    let location = if path.contains(&format!("{{{}}}", variable.name)) {
                        "path"
                    } else {
                        "query"
                    };
                    json!({
                        "in": location,
                        "name": variable.name,
                        "required": variable.required(),
                        "schema": self.param_schema(&variable.ty),
                    })
                })
                .collect();
            operation.insert("parameters".into(), Value::Array(parameters));
        }

        let description = field
            .and_then(|field| field.description.clone())
            .unwrap_or_default();
        let response = field.map_or_else(
            || json!({}),
            |field| field_schema(&self.schema, &field.ty),
        );
        operation.insert(
            "responses".into(),
            json!({
                "200": {
                    "description": description,
                    "content": { "application/json": { "schema": response } }
                }
            }),
        );

        Value::Object(operation)
    }

    fn root_field(&self, kind: OperationKind, name: &str) -> Option<&FieldDef> {
        let root = match kind {
            OperationKind::Query => self.schema.query_root(),
            OperationKind::Mutation => self.schema.mutation_root(),
            OperationKind::Subscription => self.schema.subscription_root(),
        };
        root.and_then(|root| root.fields.get(name))
    }

    fn request_body(&self, variables: &[VariableDefinition]) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for variable in variables {
            if variable.required() {
                required.push(json!(variable.name));
            }
            properties.insert(variable.name.clone(), self.param_schema(&variable.ty));
        }

        let mut body = Map::new();
        body.insert("type".into(), json!("object"));
        body.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            body.insert("required".into(), Value::Array(required));
        }
        Value::Object(body)
    }

    fn param_schema(&self, ty: &TypeRef) -> Value {
        match ty {
            TypeRef::NonNull(inner) => self.param_schema(inner),
            TypeRef::List(inner) => json!({ "type": "array", "items": self.param_schema(inner) }),
            TypeRef::Named(name) => match self.schema.get_type(name) {
                Some(TypeDef::Enum(def)) => enum_schema(def.values.iter().map(|v| v.name.as_str())),
                Some(TypeDef::Object(_) | TypeDef::InputObject(_)) => reference(name),
                _ => primitive(name).unwrap_or_else(|| json!({ "type": "object" })),
            },
        }
    }
}

/// Rewrites `:param` segments as `{param}`.
pub fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn component_schema(schema: &Schema, type_def: &TypeDef) -> Option<Value> {
    let fields: Vec<(&str, &TypeRef, Option<&str>)> = match type_def {
        TypeDef::Object(object) => object
            .fields
            .values()
            .map(|f| (f.name.as_str(), &f.ty, f.description.as_deref()))
            .collect(),
        TypeDef::InputObject(input) => input
            .fields
            .values()
            .map(|f| (f.name.as_str(), &f.ty, f.description.as_deref()))
            .collect(),
        _ => return None,
    };

    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, ty, description) in fields {
        if ty.is_non_null() {
            required.push(json!(name));
        }
        properties.insert(name.to_string(), described(field_schema(schema, ty), description));
    }

    let mut object = Map::new();
    object.insert("type".into(), json!("object"));
    if !required.is_empty() {
        object.insert("required".into(), Value::Array(required));
    }
    object.insert("properties".into(), Value::Object(properties));
    Some(described(Value::Object(object), type_def.description()))
}

/// Output types: lists become arrays, objects become references.
fn field_schema(schema: &Schema, ty: &TypeRef) -> Value {
    match ty {
        TypeRef::NonNull(inner) => field_schema(schema, inner),
        TypeRef::List(inner) => json!({ "type": "array", "items": field_schema(schema, inner) }),
        TypeRef::Named(name) => match schema.get_type(name) {
            Some(TypeDef::Object(_)) => reference(name),
            Some(TypeDef::Scalar(_)) => primitive(name).unwrap_or_else(|| json!({ "type": "object" })),
            Some(TypeDef::Enum(def)) => enum_schema(def.values.iter().map(|v| v.name.as_str())),
            _ => json!({ "type": "object" }),
        },
    }
}

fn primitive(name: &str) -> Option<Value> {
    let schema = match name {
        "Int" => json!({ "type": "integer", "format": "int32" }),
        "Float" => json!({ "type": "number", "format": "float" }),
        "String" | "ID" => json!({ "type": "string" }),
        "Boolean" => json!({ "type": "boolean" }),
        _ => return None,
    };
    Some(schema)
}

fn reference(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn enum_schema<'a>(values: impl Iterator<Item = &'a str>) -> Value {
    json!({ "type": "string", "enum": values.collect::<Vec<_>>() })
}

fn described(mut schema: Value, description: Option<&str>) -> Value {
    if let (Value::Object(object), Some(description)) = (&mut schema, description) {
        object.insert("description".into(), json!(description));
    }
    schema
}
