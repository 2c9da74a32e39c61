//! Dump orchestration: closure construction and statement emission.
//!
//! A dump runs in two passes over one snapshot transaction. The first pass
//! walks the requested tables and follows every non-null foreign key until
//! the workset holds the full referential closure. The second pass re-walks
//! the workset in discovery order and produces one SQL statement at a time,
//! re-reading each row by primary key at emission time so the dump streams
//! without buffering row data.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::AdapterCache;
use crate::config::{DumpOptions, TargetTable};
use crate::core::schema::{PkValue, PrimaryKeyId, Table};
use crate::core::traits::StoreAdapter;
use crate::core::value::{Row, SqlValue};
use crate::error::{DumpError, Result};
use crate::workset::Workset;

/// Dumps a set of tables and all their relationships.
///
/// Only the requested tables are dumped in full; related tables contribute
/// exactly the rows required to satisfy foreign keys.
pub struct Dumper {
    adapter: Arc<dyn StoreAdapter>,
}

impl Dumper {
    pub fn new(adapter: Arc<dyn StoreAdapter>) -> Self {
        Self { adapter }
    }

    /// Start a dump.
    ///
    /// Opens the snapshot transaction, builds the workset inside it, and
    /// returns the statement stream. Construction failures end the
    /// transaction before returning. The returned stream ends the
    /// transaction after its last statement; a caller that abandons the
    /// stream mid-way owns the still-open transaction.
    pub async fn dump(&self, tables: &[TargetTable], options: DumpOptions) -> Result<DumpStream> {
        self.adapter.begin_transaction().await?;

        let workset = match self.generate_workset(tables).await {
            Ok(workset) => workset,
            Err(err) => {
                if let Err(end_err) = self.adapter.end_transaction().await {
                    warn!("failed to end transaction after error: {}", end_err);
                }
                return Err(err);
            }
        };

        info!(
            tables = workset.table_count(),
            rows = workset.row_count(),
            "workset complete"
        );

        Ok(DumpStream::new(
            Arc::clone(&self.adapter),
            workset,
            options,
        ))
    }

    /// Build the workset: every requested table plus the closure of every
    /// row reachable from their rows through foreign keys.
    async fn generate_workset(&self, tables: &[TargetTable]) -> Result<Workset> {
        let mut workset = Workset::new();
        let mut cache = AdapterCache::new(self.adapter.as_ref());

        // Requested tables export structurally even when empty. Touching the
        // primary key here also rejects unknown and keyless tables up front.
        for target in tables {
            workset.add_table(&target.table);
            cache.primary_key_columns(&target.table).await?;
        }

        for target in tables {
            debug!(table = %target.table, "scanning requested table");
            let mut rows = self
                .adapter
                .read_table(&target.table, target.conditions.as_deref());

            while let Some(row) = rows.recv().await {
                self.collect_row(&mut workset, &mut cache, &target.table, row?)
                    .await?;
            }
        }

        Ok(workset)
    }

    /// Record one row and everything transitively reachable from it.
    ///
    /// Runs on an explicit worklist instead of native recursion so that long
    /// foreign-key chains cannot overflow the call stack. Termination: row
    /// counts are finite and `Workset::add_row` refuses revisits, so a cycle's
    /// closing edge always lands on a recorded identity and stops.
    async fn collect_row(
        &self,
        workset: &mut Workset,
        cache: &mut AdapterCache<'_>,
        table: &Table,
        row: Row,
    ) -> Result<()> {
        let mut pending: Vec<(Table, Row)> = vec![(table.clone(), row)];

        while let Some((table, row)) = pending.pop() {
            let pk_columns = cache.primary_key_columns(&table).await?;
            let id = project_primary_key(&table, &pk_columns, &row)?;

            if !workset.add_row(&table, id) {
                // Row already recorded; everything reachable from it is too.
                continue;
            }

            'fks: for fk in cache.foreign_keys(&table).await? {
                let mut lookup = Vec::with_capacity(fk.columns.len());
                let mut local_pairs = Vec::with_capacity(fk.columns.len());

                for (local, referenced) in fk.columns.iter().zip(&fk.referenced_columns) {
                    let value = row.get(local).ok_or_else(|| {
                        DumpError::Unexpected(format!(
                            "row of {} is missing foreign key column {}",
                            table, local
                        ))
                    })?;

                    if value.is_null() {
                        // No referenced record behind this constraint; the
                        // row's other foreign keys are still followed.
                        continue 'fks;
                    }

                    lookup.push((referenced.clone(), value.clone()));
                    local_pairs.push((local.as_str(), value));
                }

                let referenced_row = match self.adapter.read_row(&fk.referenced_table, &lookup).await
                {
                    Ok(row) => row,
                    Err(DumpError::RowLookup { found: 0, .. }) => {
                        return Err(DumpError::BrokenForeignKey {
                            constraint: fk.name.clone(),
                            referencing_table: table.full_name(),
                            referenced_table: fk.referenced_table.full_name(),
                            key: describe_pairs(&local_pairs, self.adapter.as_ref()),
                        });
                    }
                    Err(DumpError::RowLookup { table, key, found }) => {
                        return Err(DumpError::InternalConsistency { table, key, found });
                    }
                    Err(err) => return Err(err),
                };

                pending.push((fk.referenced_table.clone(), referenced_row));
            }
        }

        Ok(())
    }
}

/// Project a row onto its table's primary key columns.
fn project_primary_key(table: &Table, pk_columns: &[String], row: &Row) -> Result<PrimaryKeyId> {
    let mut entries = Vec::with_capacity(pk_columns.len());

    for column in pk_columns {
        let value = row.get(column).ok_or_else(|| {
            DumpError::Unexpected(format!(
                "row of {} is missing primary key column {}",
                table, column
            ))
        })?;
        entries.push((
            column.clone(),
            PkValue::from_sql_value(table, column, value)?,
        ));
    }

    Ok(PrimaryKeyId::new(entries))
}

/// Render `column=value` pairs for diagnostics.
fn describe_pairs(pairs: &[(&str, &SqlValue)], adapter: &dyn StoreAdapter) -> String {
    pairs
        .iter()
        .map(|(column, value)| format!("{}={}", column, adapter.quote_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Emission progress through one table.
#[derive(Debug, Clone, Copy)]
enum TableStep {
    Drop,
    Create,
    Row(usize),
}

/// Emission progress through the dump.
#[derive(Debug, Clone, Copy)]
enum EmitState {
    DisableForeignKeys,
    Table { index: usize, step: TableStep },
    EnableForeignKeys,
    EndTransaction,
    Done,
}

/// Pull-based cursor over the dump's SQL statements.
///
/// Each call to [`DumpStream::next_statement`] computes exactly one
/// statement, so a caller can stream the dump to a file or socket without
/// the engine buffering the result. Row data is re-read from the snapshot at
/// emission time rather than retained from closure construction.
pub struct DumpStream {
    adapter: Arc<dyn StoreAdapter>,
    workset: Workset,
    tables: Vec<Table>,
    options: DumpOptions,
    state: EmitState,
}

impl std::fmt::Debug for DumpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpStream")
            .field("tables", &self.tables.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DumpStream {
    fn new(adapter: Arc<dyn StoreAdapter>, workset: Workset, options: DumpOptions) -> Self {
        let tables: Vec<Table> = workset.tables().cloned().collect();
        Self {
            adapter,
            workset,
            tables,
            options,
            state: EmitState::DisableForeignKeys,
        }
    }

    /// Produce the next statement, or `None` once the dump is complete.
    ///
    /// The first statement disables foreign key checks and the last one
    /// re-enables them: rows are emitted table-by-table in discovery order,
    /// which is not a topological order of the foreign-key graph, so the
    /// importer must not enforce referential integrity mid-import. After the
    /// last statement the snapshot transaction is ended. Any error aborts
    /// the stream; no partial dump is valid output.
    pub async fn next_statement(&mut self) -> Option<Result<String>> {
        loop {
            match self.state {
                EmitState::DisableForeignKeys => {
                    self.state = EmitState::Table {
                        index: 0,
                        step: TableStep::Drop,
                    };
                    return Some(Ok(self.adapter.get_disable_foreign_keys_sql()));
                }

                EmitState::Table { index, step } => {
                    if index >= self.tables.len() {
                        self.state = EmitState::EnableForeignKeys;
                        continue;
                    }

                    match self.emit_table_step(index, step).await {
                        Ok(Some(statement)) => return Some(Ok(statement)),
                        Ok(None) => continue,
                        Err(err) => {
                            self.abort().await;
                            return Some(Err(err));
                        }
                    }
                }

                EmitState::EnableForeignKeys => {
                    self.state = EmitState::EndTransaction;
                    return Some(Ok(self.adapter.get_enable_foreign_keys_sql()));
                }

                EmitState::EndTransaction => {
                    self.state = EmitState::Done;
                    if let Err(err) = self.adapter.end_transaction().await {
                        return Some(Err(err));
                    }
                    return None;
                }

                EmitState::Done => return None,
            }
        }
    }

    /// Drain the remaining statements into a vector.
    pub async fn collect(mut self) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        while let Some(statement) = self.next_statement().await {
            statements.push(statement?);
        }
        Ok(statements)
    }

    /// Advance one step within a table. `Ok(None)` means the step produced
    /// no statement and emission should continue with the updated state.
    async fn emit_table_step(&mut self, index: usize, step: TableStep) -> Result<Option<String>> {
        let table = self.tables[index].clone();
        let table_name = self.output_table_name(&table);

        match step {
            TableStep::Drop => {
                self.state = EmitState::Table {
                    index,
                    step: TableStep::Create,
                };

                if self.options.add_drop_table && !self.options.merge {
                    Ok(Some(self.adapter.get_drop_table_if_exists_sql(&table_name)))
                } else {
                    Ok(None)
                }
            }

            TableStep::Create => {
                self.state = EmitState::Table {
                    index,
                    step: TableStep::Row(0),
                };

                if self.options.add_create_table && !self.options.merge {
                    debug!(table = %table, "emitting table structure");
                    let sql = self
                        .adapter
                        .get_create_table_sql(&table, self.options.include_schema_name_in_output)
                        .await?;
                    Ok(Some(sql))
                } else {
                    Ok(None)
                }
            }

            TableStep::Row(position) => {
                let ids = self.workset.primary_key_ids(&table);
                if position >= ids.len() {
                    self.state = EmitState::Table {
                        index: index + 1,
                        step: TableStep::Drop,
                    };
                    return Ok(None);
                }

                let id = ids[position].clone();
                self.state = EmitState::Table {
                    index,
                    step: TableStep::Row(position + 1),
                };

                let row = self.reread_row(&table, &id).await?;

                let statement = if self.options.merge {
                    self.adapter.get_upsert_sql(&table_name, &row)
                } else {
                    build_insert_sql(self.adapter.as_ref(), &table_name, &row)
                };
                Ok(Some(statement))
            }
        }
    }

    /// Re-read a recorded row by primary key inside the same snapshot.
    ///
    /// The identity was derived from a row that existed when it was
    /// recorded, so under snapshot isolation anything but exactly one match
    /// is an internal consistency failure, not a data problem.
    async fn reread_row(&self, table: &Table, id: &PrimaryKeyId) -> Result<Row> {
        match self.adapter.read_row(table, &id.to_lookup()).await {
            Ok(row) => Ok(row),
            Err(DumpError::RowLookup { found, .. }) => Err(DumpError::InternalConsistency {
                table: table.full_name(),
                key: id.to_string(),
                found,
            }),
            Err(err) => Err(err),
        }
    }

    /// Table identifier as it appears in the output.
    fn output_table_name(&self, table: &Table) -> String {
        if self.options.include_schema_name_in_output {
            self.adapter.get_table_identifier(table)
        } else {
            self.adapter.quote_identifier(&table.name)
        }
    }

    /// Best-effort transaction teardown on the failure path.
    async fn abort(&mut self) {
        self.state = EmitState::Done;
        if let Err(err) = self.adapter.end_transaction().await {
            warn!("failed to end transaction after error: {}", err);
        }
    }
}

/// Build an INSERT statement for the row.
fn build_insert_sql(adapter: &dyn StoreAdapter, table: &str, row: &Row) -> String {
    let columns = row
        .iter()
        .map(|(column, _)| adapter.quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ");

    let values = row
        .iter()
        .map(|(_, value)| adapter.quote_value(value))
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) VALUES ({});", table, columns, values)
}
