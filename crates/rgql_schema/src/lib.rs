//! Schema metadata for rgql.
//!
//! This crate describes the GraphQL schema that the REST layer is generated from:
//! - `schema`: Type definitions, root operation types and the schema builder
//! - `type_ref`: Wrapped type references (`NonNull`, `List`, `Named`)
//! - `scalar`: Serialization contracts of the built-in scalars
//! - `naming`: Case folding shared by model detection and path generation

pub mod naming;
pub mod scalar;
pub mod schema;
pub mod type_ref;

pub use naming::{convert_name, is_name_equal};
pub use scalar::{BuiltinScalar, ScalarError};
pub use schema::{
    EnumDef, EnumValueDef, FieldDef, InputObjectDef, InputValueDef, InterfaceDef, ObjectDef,
    ScalarDef, Schema, SchemaBuilder, TypeDef, UnionDef,
};
pub use type_ref::{TypeRef, TypeRefParseError};
