//! The store adapter contract.
//!
//! One implementation exists per database engine; the dump engine depends
//! only on this trait. The adapter owns everything dialect-specific: schema
//! introspection, row access, transaction control, and SQL text generation.
//!
//! # Transactions
//!
//! All reads for one dump call happen between `begin_transaction` and
//! `end_transaction`, inside a single snapshot-consistent transaction. Rows
//! read while building the workset and rows re-read during emission must
//! observe the same point-in-time state even if other writers are active.
//!
//! # Streaming
//!
//! `read_table` returns a channel receiver yielding rows one at a time, the
//! adapter deciding fetch batching internally. This keeps full-table scans
//! out of memory regardless of table size.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::schema::{ForeignKey, Table};
use crate::core::value::{Row, SqlValue};
use crate::error::Result;

/// Capability interface implemented once per database engine.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Begin one snapshot-consistent transaction, read-only if the engine
    /// supports it.
    async fn begin_transaction(&self) -> Result<()>;

    /// End the transaction. Commit or rollback; for a read-only transaction
    /// the two are equivalent.
    async fn end_transaction(&self) -> Result<()>;

    /// Primary key column names for the table, in key order.
    ///
    /// Fails with [`DumpError::UnknownTable`] if the table does not exist. An
    /// empty result means the table has no primary key; the engine rejects
    /// such tables at first use (adapters may also fail eagerly with
    /// [`DumpError::NoPrimaryKey`]).
    ///
    /// [`DumpError::UnknownTable`]: crate::error::DumpError::UnknownTable
    /// [`DumpError::NoPrimaryKey`]: crate::error::DumpError::NoPrimaryKey
    async fn get_primary_key_columns(&self, table: &Table) -> Result<Vec<String>>;

    /// Foreign keys declared on the table (outgoing), in a stable order.
    async fn get_foreign_keys(&self, table: &Table) -> Result<Vec<ForeignKey>>;

    /// Stream all rows of the table, with an optional raw SQL suffix
    /// (`WHERE …`, `LIMIT …`) restricting the scan.
    ///
    /// The receiver yields rows until the scan is exhausted or an error is
    /// sent; the adapter decides fetch batching.
    fn read_table(&self, table: &Table, conditions: Option<&str>) -> mpsc::Receiver<Result<Row>>;

    /// Read the single row matching a unique key.
    ///
    /// Fails with [`DumpError::RowLookup`] carrying the matched-row count
    /// when the lookup does not match exactly one row; the caller needs the
    /// count to tell a broken foreign key from a snapshot violation.
    ///
    /// [`DumpError::RowLookup`]: crate::error::DumpError::RowLookup
    async fn read_row(&self, table: &Table, key: &[(String, SqlValue)]) -> Result<Row>;

    /// One executable CREATE TABLE statement for the table.
    ///
    /// When `include_schema` is set, the created table and any foreign-key
    /// `REFERENCES` clauses embedded in the statement are schema-qualified;
    /// otherwise schema qualifiers are omitted everywhere in the statement.
    async fn get_create_table_sql(&self, table: &Table, include_schema: bool) -> Result<String>;

    /// Statement dropping the table if it exists. `table` is already quoted.
    fn get_drop_table_if_exists_sql(&self, table: &str) -> String;

    /// Statement disabling foreign key checks for the importing session.
    fn get_disable_foreign_keys_sql(&self) -> String;

    /// Statement re-enabling foreign key checks.
    fn get_enable_foreign_keys_sql(&self) -> String;

    /// Insert-or-update statement for the row. `table` is already quoted.
    ///
    /// Must update the existing row in place on key conflict, never
    /// delete-then-reinsert.
    fn get_upsert_sql(&self, table: &str, row: &Row) -> String;

    /// Quote an identifier such as a table or column name.
    fn quote_identifier(&self, name: &str) -> String;

    /// Quoted, schema-qualified table identifier.
    fn get_table_identifier(&self, table: &Table) -> String;

    /// Quote a value for direct embedding in a statement.
    fn quote_value(&self, value: &SqlValue) -> String;
}
