//! Configuration type definitions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::validation::{parse_table_ref, validate_conditions};
use crate::core::schema::Table;
use crate::error::Result;

/// Options controlling statement emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    /// Whether to add CREATE TABLE statements to the dump.
    pub add_create_table: bool,

    /// Whether to add a DROP TABLE IF EXISTS statement before each CREATE
    /// TABLE. Ignored unless `add_create_table` is set.
    pub add_drop_table: bool,

    /// Whether to include the schema name in the dump output.
    ///
    /// Leaving this off allows importing the dump into a schema other than
    /// the source one. If the source spans multiple schemas, importing such
    /// a dump regroups all tables into one schema, and name collisions
    /// between schemas become conflicts.
    pub include_schema_name_in_output: bool,

    /// Whether to produce a dump that merges into existing data: rows become
    /// upserts, and create/drop statements are suppressed at emission time
    /// regardless of the flags above.
    ///
    /// Importing a merge dump can still fail on unique-key conflicts with
    /// pre-existing rows outside the dump.
    pub merge: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            add_create_table: true,
            add_drop_table: false,
            include_schema_name_in_output: false,
            merge: false,
        }
    }
}

/// A table to dump, with optional row-restricting conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    /// The table to dump.
    pub table: Table,

    /// Raw SQL suffix appended to the table's full scan, e.g.
    /// `WHERE user_id = 123`, `LIMIT 10`, or both. Restricts only the seed
    /// rows; the foreign-key closure still pulls in everything those rows
    /// reference.
    pub conditions: Option<String>,
}

impl TargetTable {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            conditions: None,
        }
    }

    pub fn with_conditions(table: Table, conditions: impl Into<String>) -> Self {
        Self {
            table,
            conditions: Some(conditions.into()),
        }
    }
}

/// Source database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Default schema; bare table names resolve against it.
    pub database: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

/// A table entry in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// `table` or `schema.table`.
    pub name: String,

    /// Optional raw SQL suffix for the seed scan.
    #[serde(default)]
    pub conditions: Option<String>,
}

/// Root configuration structure, loadable from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Source database connection.
    pub connection: ConnectionConfig,

    /// Tables to dump in full.
    pub tables: Vec<TableSpec>,

    /// Emission options.
    #[serde(default)]
    pub options: DumpOptions,
}

impl DumpConfig {
    /// Load and parse a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: DumpConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate table specs and conditions.
    pub fn validate(&self) -> Result<()> {
        for spec in &self.tables {
            parse_table_ref(&spec.name, &self.connection.database)?;
            if let Some(conditions) = &spec.conditions {
                validate_conditions(conditions)?;
            }
        }
        Ok(())
    }

    /// Resolve the table specs into [`TargetTable`] values, bare names
    /// defaulting to the connection's database.
    pub fn target_tables(&self) -> Result<Vec<TargetTable>> {
        self.tables
            .iter()
            .map(|spec| {
                let table = parse_table_ref(&spec.name, &self.connection.database)?;
                Ok(TargetTable {
                    table,
                    conditions: spec.conditions.clone(),
                })
            })
            .collect()
    }
}
