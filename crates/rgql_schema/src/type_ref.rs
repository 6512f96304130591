//! Type references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A reference to a schema type, possibly wrapped in list and non-null modifiers.
///
/// Serialized in GraphQL notation, e.g. `"[ID!]!"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// Parses GraphQL type notation (`ID`, `[Int!]`, `User!`).
    pub fn parse(input: &str) -> Result<Self, TypeRefParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TypeRefParseError::Empty);
        }

        if let Some(inner) = input.strip_suffix('!') {
            let inner = Self::parse(inner)?;
            if matches!(inner, TypeRef::NonNull(_)) {
                return Err(TypeRefParseError::Invalid(input.to_string()));
            }
            return Ok(Self::non_null(inner));
        }

        if let Some(rest) = input.strip_prefix('[') {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| TypeRefParseError::Unbalanced(input.to_string()))?;
            return Ok(Self::list(Self::parse(inner)?));
        }

        if input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            Ok(Self::named(input))
        } else {
            Err(TypeRefParseError::Invalid(input.to_string()))
        }
    }

    /// Returns the innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.named_type(),
        }
    }

    /// Returns true for `T!`.
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Strips one outer non-null modifier.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Returns true for `[T]` or `[T]!`.
    pub fn is_list(&self) -> bool {
        matches!(self.nullable(), TypeRef::List(_))
    }

    /// Returns true for `T` or `T!` where `T` is the given named type.
    pub fn is_single_of(&self, name: &str) -> bool {
        matches!(self.nullable(), TypeRef::Named(n) if n == name)
    }

    /// Returns true for `[T]`, `[T!]`, `[T]!` and `[T!]!`.
    pub fn is_list_of(&self, name: &str) -> bool {
        match self.nullable() {
            TypeRef::List(item) => item.is_single_of(name),
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl FromStr for TypeRef {
    type Err = TypeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// Error returned when type notation cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeRefParseError {
    #[error("empty type reference")]
    Empty,
    #[error("unbalanced brackets in type reference '{0}'")]
    Unbalanced(String),
    #[error("invalid type reference '{0}'")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        for notation in ["ID", "ID!", "[Int]", "[Int!]!", "[[String]!]"] {
            let ty = TypeRef::parse(notation).unwrap();
            assert_eq!(ty.to_string(), notation);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(TypeRef::parse(""), Err(TypeRefParseError::Empty));
        assert!(matches!(
            TypeRef::parse("[Int"),
            Err(TypeRefParseError::Unbalanced(_))
        ));
        assert!(matches!(
            TypeRef::parse("Int!!"),
            Err(TypeRefParseError::Invalid(_))
        ));
        assert!(matches!(
            TypeRef::parse("Int Float"),
            Err(TypeRefParseError::Invalid(_))
        ));
    }

    #[test]
    fn test_shape_queries() {
        let ty = TypeRef::parse("[User!]!").unwrap();
        assert_eq!(ty.named_type(), "User");
        assert!(ty.is_list());
        assert!(ty.is_list_of("User"));
        assert!(!ty.is_single_of("User"));

        let single = TypeRef::parse("User!").unwrap();
        assert!(single.is_single_of("User"));
        assert!(!single.is_list());

        let nested = TypeRef::parse("[[User]]").unwrap();
        assert!(!nested.is_list_of("User"));
    }

    #[test]
    fn test_serde_uses_notation() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::named("ID")));
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, r#""[ID]!""#);
        let back: TypeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
