//! Resource (model) detection.
//!
//! An object type with an `id` field is a model when the query root exposes
//! both a list field named after the type's plural and a single-item field
//! named after the type that takes exactly one `id` argument:
//!
//! ```graphql
//! type Query {
//!   users: [User!]!       # list
//!   user(id: ID!): User   # single
//! }
//! ```

use indexmap::IndexMap;
use rgql_schema::{is_name_equal, Schema};
use serde::Serialize;

/// A type recognized as an addressable REST resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub type_name: String,
    pub is_list: bool,
    pub is_single: bool,
}

impl Model {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_resource(&self) -> bool {
        self.is_list && self.is_single
    }
}

/// Returns the names of all model types, in query field order.
pub fn extract_models(schema: &Schema) -> Vec<String> {
    let Some(query) = schema.query_root() else {
        return Vec::new();
    };

    let mut candidates: IndexMap<&str, Model> = IndexMap::new();

    for field in query.fields.values() {
        let type_name = field.ty.named_type();
        let Some(object) = schema.get_object(type_name) else {
            continue;
        };
        if !object.has_id() {
            continue;
        }

        let model = candidates
            .entry(type_name)
            .or_insert_with(|| Model::new(type_name));

        if field.ty.is_list_of(type_name) {
            let same_name = is_name_equal(&field.name, &format!("{type_name}s"));
            model.is_list = same_name && !field.has_required_arguments();
        } else if field.ty.is_single_of(type_name) {
            let same_name = is_name_equal(&field.name, type_name);
            let has_id_argument =
                field.arguments.len() == 1 && field.arguments.contains_key("id");
            model.is_single = same_name && has_id_argument;
        }
    }

    candidates
        .into_values()
        .filter(Model::is_resource)
        .map(|model| model.type_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgql_schema::{FieldDef, ObjectDef, TypeRef};

    fn id() -> TypeRef {
        TypeRef::non_null(TypeRef::named("ID"))
    }

    fn schema_with(query: ObjectDef) -> Schema {
        Schema::builder()
            .query_type("Query")
            .object(ObjectDef::new("User").field(FieldDef::new("id", id())))
            .object(
                ObjectDef::new("Settings")
                    .field(FieldDef::new("theme", TypeRef::named("String"))),
            )
            .object(query)
            .build()
    }

    fn users() -> FieldDef {
        FieldDef::new(
            "users",
            TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("User")))),
        )
        .argument("limit", TypeRef::named("Int"))
    }

    fn user() -> FieldDef {
        FieldDef::new("user", TypeRef::named("User")).argument("id", id())
    }

    #[test]
    fn test_list_and_single_make_a_model() {
        let schema = schema_with(ObjectDef::new("Query").field(users()).field(user()));
        assert_eq!(extract_models(&schema), vec!["User".to_string()]);
    }

    #[test]
    fn test_membership_flips_with_fields() {
        let only_list = schema_with(ObjectDef::new("Query").field(users()));
        assert!(extract_models(&only_list).is_empty());

        let only_single = schema_with(ObjectDef::new("Query").field(user()));
        assert!(extract_models(&only_single).is_empty());
    }

    #[test]
    fn test_required_list_arguments_disqualify() {
        let users = FieldDef::new("users", TypeRef::list(TypeRef::named("User")))
            .argument("filter", TypeRef::non_null(TypeRef::named("String")));
        let schema = schema_with(ObjectDef::new("Query").field(users).field(user()));
        assert!(extract_models(&schema).is_empty());
    }

    #[test]
    fn test_single_needs_exactly_one_id_argument() {
        let user = FieldDef::new("user", TypeRef::named("User"))
            .argument("id", id())
            .argument("locale", TypeRef::named("String"));
        let schema = schema_with(ObjectDef::new("Query").field(users()).field(user));
        assert!(extract_models(&schema).is_empty());

        let by_name = FieldDef::new("user", TypeRef::named("User"))
            .argument("name", TypeRef::named("String"));
        let schema = schema_with(ObjectDef::new("Query").field(users()).field(by_name));
        assert!(extract_models(&schema).is_empty());
    }

    #[test]
    fn test_names_must_match() {
        let members = FieldDef::new("members", TypeRef::list(TypeRef::named("User")));
        let schema = schema_with(ObjectDef::new("Query").field(members).field(user()));
        assert!(extract_models(&schema).is_empty());
    }

    #[test]
    fn test_types_without_id_are_ignored() {
        let schema = schema_with(
            ObjectDef::new("Query")
                .field(FieldDef::new("settingss", TypeRef::list(TypeRef::named("Settings"))))
                .field(FieldDef::new("settings", TypeRef::named("Settings")).argument("id", id())),
        );
        assert!(extract_models(&schema).is_empty());
    }

    #[test]
    fn test_no_query_type() {
        assert!(extract_models(&Schema::new()).is_empty());
    }
}
