//! Schema definition.

use crate::scalar::BuiltinScalar;
use crate::type_ref::TypeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A GraphQL schema, reduced to the metadata the REST layer needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub mutation_type: Option<String>,
    #[serde(default)]
    pub subscription_type: Option<String>,

    #[serde(default)]
    pub types: IndexMap<String, TypeDef>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema builder with the built-in scalars registered.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Gets a type by name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Gets an object type by name.
    pub fn get_object(&self, name: &str) -> Option<&ObjectDef> {
        match self.types.get(name) {
            Some(TypeDef::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Returns all types.
    pub fn types(&self) -> impl Iterator<Item = (&String, &TypeDef)> {
        self.types.iter()
    }

    /// Returns the query root type.
    pub fn query_root(&self) -> Option<&ObjectDef> {
        self.query_type.as_deref().and_then(|name| self.get_object(name))
    }

    /// Returns the mutation root type.
    pub fn mutation_root(&self) -> Option<&ObjectDef> {
        self.mutation_type
            .as_deref()
            .and_then(|name| self.get_object(name))
    }

    /// Returns the subscription root type.
    pub fn subscription_root(&self) -> Option<&ObjectDef> {
        self.subscription_type
            .as_deref()
            .and_then(|name| self.get_object(name))
    }

    /// Adds any missing built-in scalar definitions.
    ///
    /// Schemas loaded from JSON usually leave the built-ins out.
    pub fn with_builtin_scalars(mut self) -> Self {
        for scalar in BuiltinScalar::ALL {
            self.types
                .entry(scalar.name().to_string())
                .or_insert_with(|| TypeDef::Scalar(ScalarDef::builtin(scalar)));
        }
        self
    }
}

/// A type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeDef {
    Scalar(ScalarDef),
    Object(ObjectDef),
    Interface(InterfaceDef),
    Union(UnionDef),
    Enum(EnumDef),
    InputObject(InputObjectDef),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(s) => &s.name,
            TypeDef::Object(o) => &o.name,
            TypeDef::Interface(i) => &i.name,
            TypeDef::Union(u) => &u.name,
            TypeDef::Enum(e) => &e.name,
            TypeDef::InputObject(i) => &i.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TypeDef::Scalar(s) => s.description.as_deref(),
            TypeDef::Object(o) => o.description.as_deref(),
            TypeDef::Interface(i) => i.description.as_deref(),
            TypeDef::Union(u) => u.description.as_deref(),
            TypeDef::Enum(e) => e.description.as_deref(),
            TypeDef::InputObject(i) => i.description.as_deref(),
        }
    }

    /// Returns the output fields of object and interface types.
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            TypeDef::Object(o) => Some(&o.fields),
            TypeDef::Interface(i) => Some(&i.fields),
            _ => None,
        }
    }
}

/// Scalar type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ScalarDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    fn builtin(scalar: BuiltinScalar) -> Self {
        Self {
            name: scalar.name().to_string(),
            description: Some(format!("Built-in {} scalar", scalar.name())),
        }
    }

    /// Returns the built-in contract for this scalar, if it is one.
    pub fn builtin_kind(&self) -> Option<BuiltinScalar> {
        BuiltinScalar::from_name(&self.name)
    }
}

/// Object type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            implements: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Adds a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Returns true if the type exposes an `id` field.
    pub fn has_id(&self) -> bool {
        self.fields.contains_key("id")
    }
}

/// Interface type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
}

/// Union type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<String>,
}

/// Enum type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<EnumValueDef>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            values: values
                .into_iter()
                .map(|value| EnumValueDef {
                    name: value.into(),
                    description: None,
                    deprecated: false,
                    deprecation_reason: None,
                })
                .collect(),
        }
    }
}

/// Enum value definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

/// Input object type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputObjectDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, InputValueDef>,
}

impl InputObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
        }
    }

    /// Adds an input field.
    pub fn field(mut self, field: InputValueDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// Field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, InputValueDef>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
            deprecated: false,
            deprecation_reason: None,
        }
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Adds an argument.
    pub fn argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        let arg = InputValueDef::new(name, ty);
        self.arguments.insert(arg.name.clone(), arg);
        self
    }

    /// Returns true if any argument is non-null.
    pub fn has_required_arguments(&self) -> bool {
        self.arguments.values().any(|arg| arg.ty.is_non_null())
    }
}

/// Argument or input field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValueDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }
}

/// Schema builder.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        let builder = Self::default();
        Self {
            schema: builder.schema.with_builtin_scalars(),
        }
    }

    /// Sets the schema description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.schema.description = Some(desc.into());
        self
    }

    /// Sets the query type.
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.schema.query_type = Some(name.into());
        self
    }

    /// Sets the mutation type.
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.schema.mutation_type = Some(name.into());
        self
    }

    /// Sets the subscription type.
    pub fn subscription_type(mut self, name: impl Into<String>) -> Self {
        self.schema.subscription_type = Some(name.into());
        self
    }

    /// Adds a type.
    pub fn add_type(mut self, type_def: TypeDef) -> Self {
        self.schema
            .types
            .insert(type_def.name().to_string(), type_def);
        self
    }

    /// Adds an object type.
    pub fn object(self, object: ObjectDef) -> Self {
        self.add_type(TypeDef::Object(object))
    }

    /// Adds an input object type.
    pub fn input_object(self, input: InputObjectDef) -> Self {
        self.add_type(TypeDef::InputObject(input))
    }

    /// Adds an enum type.
    pub fn enumeration(self, def: EnumDef) -> Self {
        self.add_type(TypeDef::Enum(def))
    }

    /// Adds a custom scalar.
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.add_type(TypeDef::Scalar(ScalarDef::new(name)))
    }

    /// Builds the schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::builder()
            .query_type("Query")
            .object(ObjectDef::new("User").field(FieldDef::new(
                "id",
                TypeRef::non_null(TypeRef::named("ID")),
            )))
            .object(
                ObjectDef::new("Query").field(
                    FieldDef::new("user", TypeRef::named("User"))
                        .argument("id", TypeRef::non_null(TypeRef::named("ID"))),
                ),
            )
            .build()
    }

    #[test]
    fn test_schema_builder() {
        let schema = sample();
        assert!(schema.get_type("Int").is_some());
        assert!(schema.get_type("Boolean").is_some());
        assert_eq!(schema.query_root().map(|q| q.name.as_str()), Some("Query"));
        assert!(schema.mutation_root().is_none());
        assert!(schema.get_object("User").unwrap().has_id());
    }

    #[test]
    fn test_required_arguments() {
        let schema = sample();
        let user = &schema.query_root().unwrap().fields["user"];
        assert!(user.has_required_arguments());
    }

    #[test]
    fn test_schema_from_json() {
        let json = r#"{
            "queryType": "Query",
            "types": {
                "Query": {
                    "kind": "Object",
                    "name": "Query",
                    "fields": {
                        "posts": { "name": "posts", "type": "[Post!]!" }
                    }
                },
                "Post": {
                    "kind": "Object",
                    "name": "Post",
                    "fields": { "id": { "name": "id", "type": "ID!" } }
                }
            }
        }"#;

        let schema: Schema = serde_json::from_str(json).unwrap();
        let schema = schema.with_builtin_scalars();
        let posts = &schema.query_root().unwrap().fields["posts"];
        assert!(posts.ty.is_list_of("Post"));
        assert!(matches!(schema.get_type("ID"), Some(TypeDef::Scalar(_))));
    }
}
