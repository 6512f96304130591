//! Default operation compiler.
//!
//! Expands a root field into a full selection set:
//! - scalars and enums are selected directly
//! - objects and interfaces are expanded recursively
//! - nested resources (models) only select their `id`
//! - unions become one inline fragment per member
//! - a type may repeat at most `depth_limit` times along a path

use crate::error::{RgqlError, RgqlResult};
use crate::operation::{
    CompileRequest, OperationCompiler, OperationDocument, OperationKind, VariableDefinition,
};
use rgql_schema::{FieldDef, ObjectDef, Schema, TypeDef};
use std::fmt::Write;

/// Compiles operations by walking the schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionCompiler;

impl SelectionCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl OperationCompiler for SelectionCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> RgqlResult<OperationDocument> {
        let root = root_type(request.schema, request.kind).ok_or_else(|| {
            RgqlError::schema(format!("Schema has no {} type", request.kind))
        })?;
        let field = root.fields.get(request.field).ok_or_else(|| {
            RgqlError::schema(format!(
                "Field '{}.{}' does not exist",
                root.name, request.field
            ))
        })?;

        let variables: Vec<VariableDefinition> = field
            .arguments
            .values()
            .map(|arg| VariableDefinition::new(arg.name.clone(), arg.ty.clone()))
            .collect();

        let walker = Walker { request };
        let children = walker.children_of(&root.name, field, &mut Vec::new(), true);

        let root_selection = Selection::Field {
            name: field.name.clone(),
            arguments: field.arguments.keys().cloned().collect(),
            children: children.unwrap_or_default(),
        };

        let name = format!("{}_{}", request.field, request.kind);
        let source = print_operation(request.kind, &name, &variables, &root_selection);

        Ok(OperationDocument {
            kind: request.kind,
            name,
            field_name: field.name.clone(),
            source,
            variables,
        })
    }
}

fn root_type(schema: &Schema, kind: OperationKind) -> Option<&ObjectDef> {
    match kind {
        OperationKind::Query => schema.query_root(),
        OperationKind::Mutation => schema.mutation_root(),
        OperationKind::Subscription => schema.subscription_root(),
    }
}

/// A node of the selection tree.
#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Field {
        name: String,
        /// Arguments passed through as `name: $name` (root field only).
        arguments: Vec<String>,
        children: Vec<Selection>,
    },
    InlineFragment {
        type_condition: String,
        children: Vec<Selection>,
    },
}

struct Walker<'r, 'a> {
    request: &'r CompileRequest<'a>,
}

impl Walker<'_, '_> {
    /// Builds the sub-selection of `field`.
    ///
    /// Returns `Some(vec![])` for leaves, `None` when the field must be skipped.
    fn children_of(
        &self,
        parent: &str,
        field: &FieldDef,
        ancestors: &mut Vec<String>,
        is_root: bool,
    ) -> Option<Vec<Selection>> {
        let type_name = field.ty.named_type();
        let Some(type_def) = self.request.schema.get_type(type_name) else {
            return Some(Vec::new());
        };

        match type_def {
            TypeDef::Scalar(_) | TypeDef::Enum(_) | TypeDef::InputObject(_) => Some(Vec::new()),
            TypeDef::Object(_) | TypeDef::Interface(_) => {
                if self.is_circular(type_name, ancestors) {
                    return None;
                }
                if !is_root && self.is_model(parent, &field.name, type_name) {
                    return Some(vec![leaf("id")]);
                }
                let children = self.expand_type(type_def, ancestors);
                (!children.is_empty()).then_some(children)
            }
            TypeDef::Union(union_def) => {
                let mut fragments = Vec::new();
                for member in &union_def.members {
                    let Some(member_def) = self.request.schema.get_type(member) else {
                        continue;
                    };
                    if self.is_circular(member, ancestors) {
                        continue;
                    }
                    let children = self.expand_type(member_def, ancestors);
                    if !children.is_empty() {
                        fragments.push(Selection::InlineFragment {
                            type_condition: member.clone(),
                            children,
                        });
                    }
                }
                (!fragments.is_empty()).then_some(fragments)
            }
        }
    }

    fn expand_type(&self, type_def: &TypeDef, ancestors: &mut Vec<String>) -> Vec<Selection> {
        let Some(fields) = type_def.fields() else {
            return Vec::new();
        };

        ancestors.push(type_def.name().to_string());
        let mut selections = Vec::new();
        for field in fields.values() {
            // Nested arguments are never bound to variables.
            if field.has_required_arguments() {
                continue;
            }
            if let Some(children) = self.children_of(type_def.name(), field, ancestors, false) {
                selections.push(Selection::Field {
                    name: field.name.clone(),
                    arguments: Vec::new(),
                    children,
                });
            }
        }
        ancestors.pop();
        selections
    }

    fn is_circular(&self, type_name: &str, ancestors: &[String]) -> bool {
        let seen = ancestors.iter().filter(|a| *a == type_name).count();
        seen + 1 > self.request.depth_limit
    }

    fn is_model(&self, parent: &str, field: &str, type_name: &str) -> bool {
        let ignored = self
            .request
            .ignore
            .iter()
            .any(|entry| entry == type_name || *entry == format!("{parent}.{field}"));
        !ignored && self.request.models.iter().any(|m| m == type_name)
    }
}

fn leaf(name: &str) -> Selection {
    Selection::Field {
        name: name.to_string(),
        arguments: Vec::new(),
        children: Vec::new(),
    }
}

fn print_operation(
    kind: OperationKind,
    name: &str,
    variables: &[VariableDefinition],
    root: &Selection,
) -> String {
    let mut out = format!("{kind} {name}");
    if !variables.is_empty() {
        let defs: Vec<String> = variables
            .iter()
            .map(|v| format!("${}: {}", v.name, v.ty))
            .collect();
        let _ = write!(out, "({})", defs.join(", "));
    }
    out.push_str(" {\n");
    print_selection(&mut out, root, 1);
    out.push('}');
    out
}

fn print_selection(out: &mut String, selection: &Selection, depth: usize) {
    let indent = "  ".repeat(depth);
    let (head, children) = match selection {
        Selection::Field {
            name,
            arguments,
            children,
        } => {
            let mut head = name.clone();
            if !arguments.is_empty() {
                let args: Vec<String> = arguments.iter().map(|a| format!("{a}: ${a}")).collect();
                let _ = write!(head, "({})", args.join(", "));
            }
            (head, children)
        }
        Selection::InlineFragment {
            type_condition,
            children,
        } => (format!("... on {type_condition}"), children),
    };

    if children.is_empty() {
        let _ = writeln!(out, "{indent}{head}");
        return;
    }

    let _ = writeln!(out, "{indent}{head} {{");
    for child in children {
        print_selection(out, child, depth + 1);
    }
    let _ = writeln!(out, "{indent}}}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgql_schema::{FieldDef, ObjectDef, TypeRef, UnionDef};

    fn schema() -> Schema {
        let id = || TypeRef::non_null(TypeRef::named("ID"));
        Schema::builder()
            .query_type("Query")
            .object(
                ObjectDef::new("User")
                    .field(FieldDef::new("id", id()))
                    .field(FieldDef::new("name", TypeRef::named("String")))
                    .field(FieldDef::new("posts", TypeRef::list(TypeRef::named("Post")))),
            )
            .object(
                ObjectDef::new("Post")
                    .field(FieldDef::new("id", id()))
                    .field(FieldDef::new("title", TypeRef::named("String")))
                    .field(FieldDef::new("author", TypeRef::named("User")))
                    .field(
                        FieldDef::new("comments", TypeRef::named("String"))
                            .argument("limit", TypeRef::non_null(TypeRef::named("Int"))),
                    ),
            )
            .add_type(TypeDef::Union(UnionDef {
                name: "SearchResult".into(),
                description: None,
                members: vec!["User".into(), "Post".into()],
            }))
            .object(
                ObjectDef::new("Query")
                    .field(FieldDef::new("user", TypeRef::named("User")).argument("id", id()))
                    .field(FieldDef::new("posts", TypeRef::list(TypeRef::named("Post"))))
                    .field(FieldDef::new("search", TypeRef::list(TypeRef::named("SearchResult"))))
                    .field(FieldDef::new("version", TypeRef::named("String"))),
            )
            .build()
    }

    fn compile(schema: &Schema, field: &str, models: &[String], ignore: &[String]) -> OperationDocument {
        SelectionCompiler
            .compile(&CompileRequest {
                kind: OperationKind::Query,
                field,
                schema,
                models,
                ignore,
                depth_limit: 1,
            })
            .unwrap()
    }

    #[test]
    fn test_root_arguments_become_variables() {
        let schema = schema();
        let doc = compile(&schema, "user", &[], &[]);

        assert_eq!(doc.name, "user_query");
        assert_eq!(doc.field_name, "user");
        assert_eq!(doc.variables.len(), 1);
        assert_eq!(doc.variables[0].name, "id");
        assert!(doc.variables[0].required());
        assert!(doc.source.starts_with("query user_query($id: ID!) {\n  user(id: $id) {\n"));
    }

    #[test]
    fn test_circular_references_are_cut() {
        let schema = schema();
        let doc = compile(&schema, "user", &[], &[]);

        let expected = "query user_query($id: ID!) {
  user(id: $id) {
    id
    name
    posts {
      id
      title
    }
  }
}";
        assert_eq!(doc.source, expected);
    }

    #[test]
    fn test_nested_models_select_id_only() {
        let schema = schema();
        let models = vec!["User".to_string()];
        let doc = compile(&schema, "posts", &models, &[]);

        assert!(doc.source.contains("    author {\n      id\n    }\n"));

        let ignore = vec!["Post.author".to_string()];
        let doc = compile(&schema, "posts", &models, &ignore);
        assert!(doc.source.contains("    author {\n      id\n      name\n    }\n"));
    }

    #[test]
    fn test_unions_use_inline_fragments() {
        let schema = schema();
        let doc = compile(&schema, "search", &[], &[]);

        assert!(doc.source.contains("    ... on User {\n"));
        assert!(doc.source.contains("    ... on Post {\n"));
    }

    #[test]
    fn test_unknown_field() {
        let schema = schema();
        let err = SelectionCompiler
            .compile(&CompileRequest {
                kind: OperationKind::Mutation,
                field: "nope",
                schema: &schema,
                models: &[],
                ignore: &[],
                depth_limit: 1,
            })
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SchemaError);
    }
}
