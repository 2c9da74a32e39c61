//! MySQL store adapter implementation.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Row as _, TypeInfo, ValueRef};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::schema::{ForeignKey, Table};
use crate::core::traits::StoreAdapter;
use crate::core::value::{Row, SqlValue};
use crate::error::{DumpError, Result};

use super::sql;

/// Rows fetched per batch during full-table scans.
const DEFAULT_BATCH_SIZE: usize = 1000;

/// Capacity of the row channel handed to the dumper.
const READ_CHANNEL_CAPACITY: usize = 256;

/// MySQL/MariaDB store adapter.
///
/// Holds exactly one connection: the dump's snapshot transaction is a
/// session property, so spreading reads over a pool would split the
/// snapshot.
pub struct MySqlStoreAdapter {
    conn: Arc<Mutex<MySqlConnection>>,
    batch_size: usize,
}

impl MySqlStoreAdapter {
    /// Connect to the source database.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let conn = options.connect().await?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Override the scan batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Primary key columns without the missing-table / keyless checks.
    ///
    /// Used internally where an empty result is an answer, not an error
    /// (e.g. classifying what a foreign key targets).
    async fn primary_key_columns_on(
        conn: &mut MySqlConnection,
        table: &Table,
    ) -> Result<Vec<String>> {
        // CAST to CHAR to sidestep collation differences in information_schema.
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(conn)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("COLUMN_NAME").map_err(Into::into))
            .collect()
    }

    async fn table_exists_on(conn: &mut MySqlConnection, table: &Table) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) AS cnt
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        "#;

        let row: MySqlRow = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_one(conn)
            .await?;

        Ok(row.try_get::<i64, _>("cnt")? > 0)
    }

    /// Background scan loop feeding the row channel batch by batch.
    async fn read_table_impl(
        conn: Arc<Mutex<MySqlConnection>>,
        table: Table,
        conditions: Option<String>,
        batch_size: usize,
        tx: mpsc::Sender<Result<Row>>,
    ) -> Result<()> {
        let ident = sql::table_identifier(&table);

        // Conditions may carry their own ORDER BY / LIMIT, so a conditioned
        // scan runs as a single buffered query instead of being paginated.
        if let Some(conditions) = conditions {
            let query = format!("SELECT * FROM {} {}", ident, conditions);
            let rows = {
                let mut conn = conn.lock().await;
                sqlx::query(&query).fetch_all(&mut *conn).await?
            };

            for row in &rows {
                if tx.send(Self::convert_row(row)).await.is_err() {
                    return Ok(()); // receiver dropped
                }
            }
            return Ok(());
        }

        // Unconditioned scans are paginated in primary-key order, which also
        // makes the dump output deterministic.
        let pk_columns = {
            let mut conn = conn.lock().await;
            Self::primary_key_columns_on(&mut conn, &table).await?
        };

        let order_clause = if pk_columns.is_empty() {
            String::new()
        } else {
            format!(
                " ORDER BY {}",
                pk_columns
                    .iter()
                    .map(|c| sql::quote_identifier(c))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };

        let mut offset: u64 = 0;

        loop {
            let query = format!(
                "SELECT * FROM {}{} LIMIT {} OFFSET {}",
                ident, order_clause, batch_size, offset
            );

            let rows = {
                let mut conn = conn.lock().await;
                sqlx::query(&query).fetch_all(&mut *conn).await?
            };

            let fetched = rows.len();

            for row in &rows {
                if tx.send(Self::convert_row(row)).await.is_err() {
                    return Ok(());
                }
            }

            if fetched < batch_size {
                return Ok(());
            }
            offset += fetched as u64;
        }
    }

    fn convert_row(row: &MySqlRow) -> Result<Row> {
        let mut entries = Vec::with_capacity(row.columns().len());

        for (index, column) in row.columns().iter().enumerate() {
            let value = Self::column_value(row, index, column.type_info().name())?;
            entries.push((column.name().to_string(), value));
        }

        Ok(Row::new(entries))
    }

    fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<SqlValue> {
        if row.try_get_raw(index)?.is_null() {
            return Ok(SqlValue::Null);
        }

        let value = match type_name {
            "BOOLEAN" => SqlValue::Bool(row.try_get(index)?),

            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                SqlValue::Int(row.try_get::<i64, _>(index)?)
            }

            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => SqlValue::UInt(row.try_get::<u64, _>(index)?),

            "YEAR" => SqlValue::UInt(row.try_get::<u16, _>(index)? as u64),

            "FLOAT" => SqlValue::Float(row.try_get::<f32, _>(index)? as f64),
            "DOUBLE" => SqlValue::Float(row.try_get::<f64, _>(index)?),

            "DECIMAL" => SqlValue::Decimal(row.try_get::<Decimal, _>(index)?),

            "DATE" => SqlValue::Date(row.try_get(index)?),
            "TIME" => SqlValue::Time(row.try_get(index)?),
            "DATETIME" | "TIMESTAMP" => SqlValue::DateTime(row.try_get(index)?),

            "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" | "JSON" => SqlValue::Text(row.try_get(index)?),

            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
            | "GEOMETRY" => SqlValue::Bytes(row.try_get::<Vec<u8>, _>(index)?),

            // Unknown types: text first, raw bytes as the last resort.
            _ => match row.try_get::<String, _>(index) {
                Ok(text) => SqlValue::Text(text),
                Err(_) => SqlValue::Bytes(row.try_get::<Vec<u8>, _>(index)?),
            },
        };

        Ok(value)
    }

    /// Order-insensitive column list comparison.
    fn same_columns(a: &[String], b: &[String]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        let mut a: Vec<&String> = a.iter().collect();
        let mut b: Vec<&String> = b.iter().collect();
        a.sort();
        b.sort();
        a == b
    }
}

#[async_trait]
impl StoreAdapter for MySqlStoreAdapter {
    async fn begin_transaction(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        sqlx::query("SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *conn)
            .await?;
        sqlx::query("START TRANSACTION WITH CONSISTENT SNAPSHOT, READ ONLY")
            .execute(&mut *conn)
            .await?;
        debug!("started consistent snapshot transaction");
        Ok(())
    }

    async fn end_transaction(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        sqlx::query("COMMIT").execute(&mut *conn).await?;
        Ok(())
    }

    async fn get_primary_key_columns(&self, table: &Table) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let columns = Self::primary_key_columns_on(&mut conn, table).await?;

        if columns.is_empty() {
            return if Self::table_exists_on(&mut conn, table).await? {
                Err(DumpError::NoPrimaryKey(table.full_name()))
            } else {
                Err(DumpError::UnknownTable(table.full_name()))
            };
        }

        Ok(columns)
    }

    async fn get_foreign_keys(&self, table: &Table) -> Result<Vec<ForeignKey>> {
        let query = r#"
            SELECT
                CAST(rc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_SCHEMA AS CHAR(255)) AS REFERENCED_TABLE_SCHEMA,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME
            FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND rc.TABLE_NAME = kcu.TABLE_NAME
            WHERE rc.CONSTRAINT_SCHEMA = ? AND rc.TABLE_NAME = ?
            ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let mut conn = self.conn.lock().await;
        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&mut *conn)
            .await?;

        // Group the per-column rows by constraint, preserving query order so
        // the result order is stable.
        let mut foreign_keys: Vec<ForeignKey> = Vec::new();

        for row in rows {
            let name: String = row.try_get("CONSTRAINT_NAME")?;
            let column: String = row.try_get("COLUMN_NAME")?;
            let ref_schema: String = row.try_get("REFERENCED_TABLE_SCHEMA")?;
            let ref_table: String = row.try_get("REFERENCED_TABLE_NAME")?;
            let ref_column: String = row.try_get("REFERENCED_COLUMN_NAME")?;

            match foreign_keys.iter_mut().find(|fk| fk.name == name) {
                Some(fk) => {
                    fk.columns.push(column);
                    fk.referenced_columns.push(ref_column);
                }
                None => foreign_keys.push(ForeignKey {
                    schema: table.schema.clone(),
                    name,
                    table: table.clone(),
                    referenced_table: Table::new(ref_schema, ref_table),
                    columns: vec![column],
                    referenced_columns: vec![ref_column],
                    targets_primary_key: false,
                }),
            }
        }

        for fk in &mut foreign_keys {
            let referenced_pk =
                Self::primary_key_columns_on(&mut conn, &fk.referenced_table).await?;
            fk.targets_primary_key = Self::same_columns(&fk.referenced_columns, &referenced_pk);
        }

        debug!(
            table = %table,
            count = foreign_keys.len(),
            "loaded foreign keys"
        );

        Ok(foreign_keys)
    }

    fn read_table(&self, table: &Table, conditions: Option<&str>) -> mpsc::Receiver<Result<Row>> {
        let (tx, rx) = mpsc::channel(READ_CHANNEL_CAPACITY);
        let conn = Arc::clone(&self.conn);
        let table = table.clone();
        let conditions = conditions.map(String::from);
        let batch_size = self.batch_size;

        tokio::spawn(async move {
            if let Err(err) =
                Self::read_table_impl(conn, table, conditions, batch_size, tx.clone()).await
            {
                let _ = tx.send(Err(err)).await;
            }
        });

        rx
    }

    async fn read_row(&self, table: &Table, key: &[(String, SqlValue)]) -> Result<Row> {
        let conditions = key
            .iter()
            .map(|(column, value)| {
                format!("{} = {}", sql::quote_identifier(column), sql::quote_value(value))
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let query = format!(
            "SELECT * FROM {} WHERE {}",
            sql::table_identifier(table),
            conditions
        );

        let mut conn = self.conn.lock().await;
        let rows: Vec<MySqlRow> = sqlx::query(&query).fetch_all(&mut *conn).await?;

        if rows.len() != 1 {
            let key_desc = key
                .iter()
                .map(|(column, value)| format!("{}={}", column, sql::quote_value(value)))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DumpError::row_lookup(
                table.full_name(),
                key_desc,
                rows.len() as u64,
            ));
        }

        Self::convert_row(&rows[0])
    }

    async fn get_create_table_sql(&self, table: &Table, include_schema: bool) -> Result<String> {
        let query = format!("SHOW CREATE TABLE {}", sql::table_identifier(table));

        let mut conn = self.conn.lock().await;
        let row: MySqlRow = sqlx::query(&query).fetch_one(&mut *conn).await?;

        // Column 1 holds the statement; MySQL omits the trailing separator.
        let ddl: String = row.try_get(1)?;
        let ddl = format!("{};", ddl);

        Ok(sql::rewrite_create_table(&ddl, table, include_schema))
    }

    fn get_drop_table_if_exists_sql(&self, table: &str) -> String {
        sql::drop_table_if_exists(table)
    }

    fn get_disable_foreign_keys_sql(&self) -> String {
        sql::disable_foreign_keys()
    }

    fn get_enable_foreign_keys_sql(&self) -> String {
        sql::enable_foreign_keys()
    }

    fn get_upsert_sql(&self, table: &str, row: &Row) -> String {
        sql::upsert(table, row)
    }

    fn quote_identifier(&self, name: &str) -> String {
        sql::quote_identifier(name)
    }

    fn get_table_identifier(&self, table: &Table) -> String {
        sql::table_identifier(table)
    }

    fn quote_value(&self, value: &SqlValue) -> String {
        sql::quote_value(value)
    }
}
