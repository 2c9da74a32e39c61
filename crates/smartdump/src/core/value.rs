//! SQL scalar values and rows.
//!
//! Values are owned: rows stream through the engine one at a time and only
//! their primary-key projection is retained, so there is nothing to borrow
//! from.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::core::schema::PkValue;

/// A single SQL scalar value, database-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,

    Bool(bool),

    /// Signed integer family (tinyint through bigint).
    Int(i64),

    /// Unsigned bigint; smaller unsigned types fit in `Int`.
    UInt(u64),

    Float(f64),

    /// Exact numeric (decimal/numeric).
    Decimal(Decimal),

    Text(String),

    Bytes(Vec<u8>),

    Date(NaiveDate),

    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::UInt(_) => "unsigned int",
            SqlValue::Float(_) => "float",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Date(_) => "date",
            SqlValue::Time(_) => "time",
            SqlValue::DateTime(_) => "datetime",
        }
    }
}

impl From<&PkValue> for SqlValue {
    fn from(value: &PkValue) -> Self {
        match value {
            PkValue::Int(v) => SqlValue::Int(*v),
            PkValue::Text(v) => SqlValue::Text(v.clone()),
        }
    }
}

/// A table row: an ordered mapping of column name to value.
///
/// Column order is the table's column order and is preserved into the
/// generated INSERT statements. Always non-empty (every table has at least
/// one column).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    entries: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(entries: Vec<(String, SqlValue)>) -> Self {
        debug_assert!(!entries.is_empty());
        Self { entries }
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get_and_order() {
        let row = Row::new(vec![
            ("id".to_string(), SqlValue::Int(1)),
            ("name".to_string(), SqlValue::Text("a".into())),
            ("note".to_string(), SqlValue::Null),
        ]);

        assert_eq!(row.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get("note"), Some(&SqlValue::Null));
        assert_eq!(row.get("missing"), None);

        let columns: Vec<&str> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["id", "name", "note"]);
    }

    #[test]
    fn test_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Int(0).is_null());
    }

    #[test]
    fn test_pk_value_round_trip() {
        assert_eq!(SqlValue::from(&PkValue::Int(5)), SqlValue::Int(5));
        assert_eq!(
            SqlValue::from(&PkValue::Text("k".into())),
            SqlValue::Text("k".into())
        );
    }
}
