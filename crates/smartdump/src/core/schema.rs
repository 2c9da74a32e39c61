//! Schema metadata types: tables, foreign keys, and row identities.
//!
//! These types give the dump engine a database-agnostic view of the schema
//! graph it walks. They carry no behavior beyond identity and display.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::value::SqlValue;
use crate::error::{DumpError, Result};

/// A table identity: schema name plus table name.
///
/// Two `Table` values denote the same table iff both fields are equal, so the
/// type is usable as a map key throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Table {
    /// Schema (database) name.
    pub schema: String,

    /// Table name.
    pub name: String,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Get the fully qualified table name, unquoted.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Foreign key metadata, as declared on the referencing table.
///
/// `columns` and `referenced_columns` are parallel lists in constraint
/// ordinal order: `columns[i]` on [`ForeignKey::table`] references
/// `referenced_columns[i]` on [`ForeignKey::referenced_table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Schema where the constraint resides.
    pub schema: String,

    /// Constraint name.
    pub name: String,

    /// The table declaring the constraint.
    pub table: Table,

    /// The table referenced by the constraint.
    pub referenced_table: Table,

    /// Local column names, in constraint order. Never empty.
    pub columns: Vec<String>,

    /// Referenced column names, parallel to `columns`.
    pub referenced_columns: Vec<String>,

    /// Whether the referenced columns match the referenced table's primary
    /// key, as opposed to some other unique key. Documents the constraint's
    /// shape; traversal does not depend on it.
    pub targets_primary_key: bool,
}

/// A primary key value: integer or text.
///
/// Primary keys of other scalar types cannot serve as row identity here and
/// are rejected during projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkValue {
    Int(i64),
    Text(String),
}

impl PkValue {
    /// Project a row value into a key value.
    ///
    /// Integer-family values become `Int`; unsigned values above `i64::MAX`
    /// fall back to their decimal text form so they still have a stable,
    /// canonical identity. Text stays text.
    pub fn from_sql_value(table: &Table, column: &str, value: &SqlValue) -> Result<Self> {
        match value {
            SqlValue::Int(v) => Ok(PkValue::Int(*v)),
            SqlValue::UInt(v) => match i64::try_from(*v) {
                Ok(v) => Ok(PkValue::Int(v)),
                Err(_) => Ok(PkValue::Text(v.to_string())),
            },
            SqlValue::Text(v) => Ok(PkValue::Text(v.clone())),
            other => Err(DumpError::Unexpected(format!(
                "primary key column {}.{} holds a {} value; only integer and text keys are supported",
                table, column, other.type_name()
            ))),
        }
    }
}

impl fmt::Display for PkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PkValue::Int(v) => write!(f, "{}", v),
            PkValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

/// A row identity: primary-key column names paired with their values, in
/// primary-key column order.
///
/// Equality and hashing are order-sensitive; the adapter returns primary-key
/// columns in a fixed order, so the encoding is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKeyId {
    entries: Vec<(String, PkValue)>,
}

impl PrimaryKeyId {
    /// Build an identity from `(column, value)` pairs. Must be non-empty.
    pub fn new(entries: Vec<(String, PkValue)>) -> Self {
        debug_assert!(!entries.is_empty());
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PkValue)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The identity as a lookup key for [`StoreAdapter::read_row`].
    ///
    /// [`StoreAdapter::read_row`]: crate::core::traits::StoreAdapter::read_row
    pub fn to_lookup(&self) -> Vec<(String, SqlValue)> {
        self.entries
            .iter()
            .map(|(c, v)| (c.clone(), SqlValue::from(v)))
            .collect()
    }
}

impl fmt::Display for PrimaryKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (column, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", column, value)?;
        }
        Ok(())
    }
}
