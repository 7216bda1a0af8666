use thiserror::Error;

/// Name of the shared schema holding the tenant directory
pub const DEFAULT_PUBLIC_SCHEMA: &str = "public";

lazy_static::lazy_static! {
    static ref SCHEMA_NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[_a-zA-Z][_a-zA-Z0-9]{0,62}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaNameError {
    #[error("Invalid schema name '{0}': must match [_a-zA-Z][_a-zA-Z0-9]{{0,62}}")]
    Malformed(String),

    #[error("Invalid schema name '{0}': the pg_ prefix is reserved")]
    Reserved(String),
}

/// Check that `name` is safe to splice into a `search_path` as a quoted identifier
pub fn validate_schema_name(name: &str) -> Result<(), SchemaNameError> {
    if !SCHEMA_NAME_REGEX.is_match(name) {
        return Err(SchemaNameError::Malformed(name.to_string()));
    }
    if name.starts_with("pg_") {
        return Err(SchemaNameError::Reserved(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_schema_names() {
        for name in ["public", "acme", "_private", "tenant_42", "A"] {
            assert!(validate_schema_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_schema_names() {
        assert!(matches!(
            validate_schema_name(""),
            Err(SchemaNameError::Malformed(_))
        ));
        assert!(matches!(
            validate_schema_name("42tenant"),
            Err(SchemaNameError::Malformed(_))
        ));
        assert!(matches!(
            validate_schema_name("acme\"; DROP SCHEMA public; --"),
            Err(SchemaNameError::Malformed(_))
        ));
        assert!(matches!(
            validate_schema_name(&"a".repeat(64)),
            Err(SchemaNameError::Malformed(_))
        ));
        assert!(matches!(
            validate_schema_name("pg_catalog"),
            Err(SchemaNameError::Reserved(_))
        ));
    }

    #[test]
    fn test_max_length_is_postgres_identifier_limit() {
        assert!(validate_schema_name(&"a".repeat(63)).is_ok());
    }
}
