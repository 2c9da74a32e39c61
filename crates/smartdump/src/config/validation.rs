//! Validation of operator-supplied table references and scan conditions.

use crate::core::identifier::validate_identifier;
use crate::core::schema::Table;
use crate::error::{DumpError, Result};

/// Parse a `table` or `schema.table` reference, resolving bare names against
/// the default schema.
pub fn parse_table_ref(reference: &str, default_schema: &str) -> Result<Table> {
    let mut parts = reference.splitn(2, '.');
    let first = parts.next().unwrap_or("");

    let (schema, name) = match parts.next() {
        Some(name) => (first, name),
        None => (default_schema, first),
    };

    validate_identifier(schema)?;
    validate_identifier(name)?;

    Ok(Table::new(schema, name))
}

/// Validate a raw conditions suffix.
///
/// Conditions are operator-supplied SQL by design, so this only enforces the
/// one-statement invariant: no statement separators, no comment markers that
/// could hide one.
pub fn validate_conditions(conditions: &str) -> Result<()> {
    if conditions.trim().is_empty() {
        return Err(DumpError::Config(
            "Table conditions cannot be blank; omit them instead".to_string(),
        ));
    }

    if conditions.contains(';') {
        return Err(DumpError::Config(format!(
            "Table conditions must be a single statement fragment (found ';'): {:?}",
            conditions
        )));
    }

    if conditions.contains("--") || conditions.contains("/*") || conditions.contains("*/") {
        return Err(DumpError::Config(format!(
            "Table conditions must not contain SQL comment markers: {:?}",
            conditions
        )));
    }

    Ok(())
}
