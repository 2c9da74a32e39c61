//! The workset: the total set of tables and rows to export.
//!
//! Built once per dump call while walking the foreign-key closure, then read
//! back during emission. Append-only: once a table or row identity is
//! recorded it stays recorded for the lifetime of the dump.

use std::collections::{HashMap, HashSet};

use crate::core::schema::{PrimaryKeyId, Table};

/// Accumulator of "which rows, in which tables, must be exported".
#[derive(Debug, Default)]
pub struct Workset {
    /// Tables to export structurally, in first-added order.
    tables: Vec<Table>,

    /// Fast membership check backing `tables`.
    table_set: HashSet<Table>,

    /// Row identities per table, in discovery order.
    primary_key_ids: HashMap<Table, Vec<PrimaryKeyId>>,

    /// Identities already recorded; the cycle / redundant-work guard.
    seen: HashSet<(Table, PrimaryKeyId)>,
}

impl Workset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a table for structural export.
    ///
    /// Only needs to be called for explicitly requested tables, so that
    /// their structure is exported even when they are empty; other tables
    /// join the workset when their first row does.
    pub fn add_table(&mut self, table: &Table) {
        if !self.table_set.contains(table) {
            self.table_set.insert(table.clone());
            self.tables.push(table.clone());
        }
    }

    /// Record a row identity.
    ///
    /// Returns `true` if this `(table, id)` pair is new — the caller must
    /// now follow the row's relationships — and `false` if it was already
    /// recorded, in which case everything reachable from the row is already
    /// accounted for and the caller must stop.
    pub fn add_row(&mut self, table: &Table, id: PrimaryKeyId) -> bool {
        if self.seen.contains(&(table.clone(), id.clone())) {
            return false;
        }

        self.add_table(table);
        self.primary_key_ids
            .entry(table.clone())
            .or_default()
            .push(id.clone());
        self.seen.insert((table.clone(), id));

        true
    }

    /// Tables in the workset, in first-added order: the explicitly requested
    /// tables first, then tables discovered through the closure.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Row identities recorded for the table, in discovery order. Empty for
    /// a table that was added structurally but has no rows.
    pub fn primary_key_ids(&self, table: &Table) -> &[PrimaryKeyId] {
        self.primary_key_ids
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of recorded rows across all tables.
    pub fn row_count(&self) -> usize {
        self.seen.len()
    }

    /// Number of tables marked for export.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::PkValue;

    fn id(v: i64) -> PrimaryKeyId {
        PrimaryKeyId::new(vec![("id".to_string(), PkValue::Int(v))])
    }

    #[test]
    fn test_add_row_deduplicates() {
        let mut workset = Workset::new();
        let orders = Table::new("shop", "orders");

        assert!(workset.add_row(&orders, id(1)));
        assert!(!workset.add_row(&orders, id(1)));
        assert!(workset.add_row(&orders, id(2)));

        assert_eq!(workset.primary_key_ids(&orders), &[id(1), id(2)]);
        assert_eq!(workset.row_count(), 2);
    }

    #[test]
    fn test_add_row_implies_add_table() {
        let mut workset = Workset::new();
        let orders = Table::new("shop", "orders");

        workset.add_row(&orders, id(1));

        let tables: Vec<&Table> = workset.tables().collect();
        assert_eq!(tables, vec![&orders]);
    }

    #[test]
    fn test_add_table_idempotent_and_ordered() {
        let mut workset = Workset::new();
        let orders = Table::new("shop", "orders");
        let customers = Table::new("shop", "customers");

        workset.add_table(&orders);
        workset.add_table(&customers);
        workset.add_table(&orders);

        let tables: Vec<&Table> = workset.tables().collect();
        assert_eq!(tables, vec![&orders, &customers]);
    }

    #[test]
    fn test_structurally_added_table_has_no_rows() {
        let mut workset = Workset::new();
        let empty = Table::new("shop", "audit_log");

        workset.add_table(&empty);

        assert!(workset.primary_key_ids(&empty).is_empty());
        assert_eq!(workset.table_count(), 1);
    }

    #[test]
    fn test_same_key_in_different_tables_is_distinct() {
        let mut workset = Workset::new();
        let orders = Table::new("shop", "orders");
        let invoices = Table::new("shop", "invoices");

        assert!(workset.add_row(&orders, id(1)));
        assert!(workset.add_row(&invoices, id(1)));
        assert_eq!(workset.row_count(), 2);
    }

    #[test]
    fn test_same_table_name_in_different_schemas_is_distinct() {
        let mut workset = Workset::new();
        let shop_orders = Table::new("shop", "orders");
        let archive_orders = Table::new("archive", "orders");

        assert!(workset.add_row(&shop_orders, id(1)));
        assert!(workset.add_row(&archive_orders, id(1)));
        assert_eq!(workset.table_count(), 2);
    }
}
