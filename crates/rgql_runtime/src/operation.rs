//! Operation documents and the compiler interface.
//!
//! Every REST route and every webhook subscription is backed by one
//! operation document: a printed GraphQL operation selecting a single root
//! field, plus the variables it declares.

use crate::error::RgqlResult;
use rgql_schema::{Schema, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A variable declared by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Returns true if the variable's type is non-null.
    pub fn required(&self) -> bool {
        self.ty.is_non_null()
    }
}

/// A compiled operation selecting one root field.
///
/// Owned by the route (or subscription entry) that created it and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDocument {
    pub kind: OperationKind,
    /// Operation name, e.g. `user_query`.
    pub name: String,
    /// The root field this operation selects.
    pub field_name: String,
    /// Printed GraphQL source.
    pub source: String,
    pub variables: Vec<VariableDefinition>,
}

impl OperationDocument {
    /// Finds a declared variable by name.
    pub fn variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Input to an operation compiler.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub kind: OperationKind,
    pub field: &'a str,
    pub schema: &'a Schema,
    /// Names of the types recognized as REST resources.
    pub models: &'a [String],
    /// Type names or `Type.field` entries never treated as models.
    pub ignore: &'a [String],
    /// How many times a type may repeat along one selection path.
    pub depth_limit: usize,
}

/// Builds the operation document for a root field.
pub trait OperationCompiler: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> RgqlResult<OperationDocument>;
}
