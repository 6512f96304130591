//! Name case folding.
//!
//! Field names become URL path segments in kebab case (`userById` -> `user-by-id`).
//! Model detection compares names through the same folding so that the
//! resources it finds always line up with the generated paths.

use heck::ToKebabCase;

/// Converts a schema name into its path form.
pub fn convert_name(name: &str) -> String {
    name.to_kebab_case()
}

/// Returns true if both names fold to the same path form.
pub fn is_name_equal(a: &str, b: &str) -> bool {
    convert_name(a) == convert_name(b)
}
