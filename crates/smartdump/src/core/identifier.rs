//! Identifier validation shared by config parsing and the store adapters.
//!
//! SQL identifiers cannot be bound as statement parameters, so every
//! identifier that ends up in generated SQL goes through validation first
//! and is then quoted by the adapter's dialect rules.

use crate::error::{DumpError, Result};

/// Maximum identifier length (MySQL allows 64; keep headroom for quoting).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier (schema, table, or column name).
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DumpError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(DumpError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DumpError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}
