//! Memoizing wrapper around the store adapter's schema introspection.
//!
//! The closure walk asks for a table's primary-key columns once per row and
//! for its foreign keys once per newly recorded row. Both facts are
//! immutable for the duration of the dump (the snapshot transaction pins the
//! schema), so memoizing them per table turns O(rows) introspection queries
//! into O(distinct tables touched). No invalidation is needed.

use std::collections::HashMap;

use crate::core::schema::{ForeignKey, Table};
use crate::core::traits::StoreAdapter;
use crate::error::{DumpError, Result};

/// Per-dump-call cache over `get_primary_key_columns` and `get_foreign_keys`.
pub struct AdapterCache<'a> {
    adapter: &'a dyn StoreAdapter,
    primary_key_columns: HashMap<Table, Vec<String>>,
    foreign_keys: HashMap<Table, Vec<ForeignKey>>,
}

impl<'a> AdapterCache<'a> {
    pub fn new(adapter: &'a dyn StoreAdapter) -> Self {
        Self {
            adapter,
            primary_key_columns: HashMap::new(),
            foreign_keys: HashMap::new(),
        }
    }

    /// Primary key column names for the table, in key order.
    ///
    /// An adapter returning an empty list is rejected here, once, at the
    /// table's first use: a table without a primary key has no row identity
    /// and cannot be dumped.
    pub async fn primary_key_columns(&mut self, table: &Table) -> Result<Vec<String>> {
        if let Some(columns) = self.primary_key_columns.get(table) {
            return Ok(columns.clone());
        }

        let columns = self.adapter.get_primary_key_columns(table).await?;
        if columns.is_empty() {
            return Err(DumpError::NoPrimaryKey(table.full_name()));
        }

        self.primary_key_columns
            .insert(table.clone(), columns.clone());

        Ok(columns)
    }

    /// Foreign keys declared on the table, in the adapter's stable order.
    pub async fn foreign_keys(&mut self, table: &Table) -> Result<Vec<ForeignKey>> {
        if let Some(keys) = self.foreign_keys.get(table) {
            return Ok(keys.clone());
        }

        let keys = self.adapter.get_foreign_keys(table).await?;
        self.foreign_keys.insert(table.clone(), keys.clone());

        Ok(keys)
    }
}
