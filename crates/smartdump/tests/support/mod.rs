//! In-memory store adapter used by the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use smartdump::core::{ForeignKey, Row, SqlValue, StoreAdapter, Table};
use smartdump::error::{DumpError, Result};
use tokio::sync::mpsc;

/// One table's schema and contents.
pub struct MemoryTable {
    pub table: Table,
    pub pk_columns: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub rows: Vec<Row>,
}

/// Deterministic in-memory adapter.
///
/// Scan order is insertion order, so tests can assert exact statement
/// sequences.
#[derive(Default)]
pub struct MemoryAdapter {
    tables: Vec<MemoryTable>,
    begin_calls: AtomicUsize,
    end_calls: AtomicUsize,
    read_row_calls: AtomicUsize,
    /// After this many successful `read_row` calls, further calls report
    /// zero matches; simulates a row vanishing mid-dump.
    fail_read_row_after: Option<usize>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        table: Table,
        pk_columns: &[&str],
        foreign_keys: Vec<ForeignKey>,
        rows: Vec<Row>,
    ) -> Self {
        self.tables.push(MemoryTable {
            table,
            pk_columns: pk_columns.iter().map(|c| c.to_string()).collect(),
            foreign_keys,
            rows,
        });
        self
    }

    pub fn fail_read_row_after(mut self, calls: usize) -> Self {
        self.fail_read_row_after = Some(calls);
        self
    }

    pub fn begin_count(&self) -> usize {
        self.begin_calls.load(Ordering::SeqCst)
    }

    pub fn end_count(&self) -> usize {
        self.end_calls.load(Ordering::SeqCst)
    }

    fn find(&self, table: &Table) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| &t.table == table)
    }

    fn describe_key(key: &[(String, SqlValue)]) -> String {
        key.iter()
            .map(|(column, value)| format!("{}={}", column, quote_value(value)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl StoreAdapter for MemoryAdapter {
    async fn begin_transaction(&self) -> Result<()> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn end_transaction(&self) -> Result<()> {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_primary_key_columns(&self, table: &Table) -> Result<Vec<String>> {
        match self.find(table) {
            Some(entry) => Ok(entry.pk_columns.clone()),
            None => Err(DumpError::UnknownTable(table.full_name())),
        }
    }

    async fn get_foreign_keys(&self, table: &Table) -> Result<Vec<ForeignKey>> {
        match self.find(table) {
            Some(entry) => Ok(entry.foreign_keys.clone()),
            None => Err(DumpError::UnknownTable(table.full_name())),
        }
    }

    fn read_table(&self, table: &Table, conditions: Option<&str>) -> mpsc::Receiver<Result<Row>> {
        let rows = match self.find(table) {
            Some(entry) => {
                // Only the LIMIT form is needed by the tests.
                let limit = conditions
                    .and_then(|c| c.strip_prefix("LIMIT "))
                    .and_then(|n| n.parse::<usize>().ok())
                    .unwrap_or(entry.rows.len());
                entry.rows.iter().take(limit).cloned().collect()
            }
            None => Vec::new(),
        };

        let (tx, rx) = mpsc::channel(rows.len().max(1));
        for row in rows {
            tx.try_send(Ok(row)).expect("channel sized for all rows");
        }
        rx
    }

    async fn read_row(&self, table: &Table, key: &[(String, SqlValue)]) -> Result<Row> {
        let calls = self.read_row_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.fail_read_row_after {
            if calls > limit {
                return Err(DumpError::row_lookup(
                    table.full_name(),
                    Self::describe_key(key),
                    0,
                ));
            }
        }

        let entry = self
            .find(table)
            .ok_or_else(|| DumpError::UnknownTable(table.full_name()))?;

        let matches: Vec<&Row> = entry
            .rows
            .iter()
            .filter(|row| {
                key.iter()
                    .all(|(column, value)| row.get(column) == Some(value))
            })
            .collect();

        if matches.len() != 1 {
            return Err(DumpError::row_lookup(
                table.full_name(),
                Self::describe_key(key),
                matches.len() as u64,
            ));
        }

        Ok(matches[0].clone())
    }

    async fn get_create_table_sql(&self, table: &Table, include_schema: bool) -> Result<String> {
        let name = if include_schema {
            self.get_table_identifier(table)
        } else {
            self.quote_identifier(&table.name)
        };
        Ok(format!("CREATE TABLE {} (...);", name))
    }

    fn get_drop_table_if_exists_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", table)
    }

    fn get_disable_foreign_keys_sql(&self) -> String {
        "SET FOREIGN_KEY_CHECKS = 0;".to_string()
    }

    fn get_enable_foreign_keys_sql(&self) -> String {
        "SET FOREIGN_KEY_CHECKS = 1;".to_string()
    }

    fn get_upsert_sql(&self, table: &str, row: &Row) -> String {
        let columns = row
            .iter()
            .map(|(column, _)| self.quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let values = row
            .iter()
            .map(|(_, value)| quote_value(value))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = row
            .iter()
            .map(|(column, _)| {
                let quoted = self.quote_identifier(column);
                format!("{} = VALUES({})", quoted, quoted)
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {};",
            table, columns, values, updates
        )
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn get_table_identifier(&self, table: &Table) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(&table.schema),
            self.quote_identifier(&table.name)
        )
    }

    fn quote_value(&self, value: &SqlValue) -> String {
        quote_value(value)
    }
}

fn quote_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::UInt(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Decimal(v) => v.to_string(),
        SqlValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
        SqlValue::Bytes(v) => format!(
            "X'{}'",
            v.iter().map(|b| format!("{:02X}", b)).collect::<String>()
        ),
        SqlValue::Date(v) => format!("'{}'", v),
        SqlValue::Time(v) => format!("'{}'", v),
        SqlValue::DateTime(v) => format!("'{}'", v),
    }
}

// ---- builders ----

pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    Row::new(
        pairs
            .iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect(),
    )
}

pub fn int(v: i64) -> SqlValue {
    SqlValue::Int(v)
}

pub fn text(v: &str) -> SqlValue {
    SqlValue::Text(v.to_string())
}

pub fn null() -> SqlValue {
    SqlValue::Null
}

pub fn foreign_key(
    name: &str,
    table: &Table,
    columns: &[&str],
    referenced_table: &Table,
    referenced_columns: &[&str],
) -> ForeignKey {
    ForeignKey {
        schema: table.schema.clone(),
        name: name.to_string(),
        table: table.clone(),
        referenced_table: referenced_table.clone(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
        targets_primary_key: true,
    }
}
