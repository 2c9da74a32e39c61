//! Error types for the dump library.

use thiserror::Error;

/// Main error type for dump operations.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Configuration error (invalid YAML, bad table spec, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database driver error, propagated unchanged from the store adapter.
    #[cfg(feature = "mysql")]
    #[error("Database error: {0}")]
    Driver(#[from] sqlx::Error),

    /// Table has no primary key (every dumped table needs one for row identity).
    #[error("Table {0} has no primary key - a primary key is required to dump a table")]
    NoPrimaryKey(String),

    /// A requested table does not exist in the source database.
    #[error("Table {0} does not exist")]
    UnknownTable(String),

    /// A key lookup did not match exactly one row.
    ///
    /// Raw adapter-level failure; the dumper reclassifies it as either
    /// [`DumpError::BrokenForeignKey`] or [`DumpError::InternalConsistency`]
    /// depending on which read failed.
    #[error("Key lookup on {table} matched {found} rows (expected exactly 1) for {key}")]
    RowLookup {
        table: String,
        key: String,
        found: u64,
    },

    /// A non-null foreign key value has no matching row in the referenced table.
    #[error(
        "Broken foreign key {constraint}: {referencing_table} references \
         {referenced_table} but no row matches {key}"
    )]
    BrokenForeignKey {
        constraint: String,
        referencing_table: String,
        referenced_table: String,
        key: String,
    },

    /// A row the workset already trusts to exist could not be re-read exactly
    /// once inside the same snapshot.
    #[error(
        "Internal consistency violation: row {key} of {table} matched {found} rows \
         inside the snapshot (expected exactly 1)"
    )]
    InternalConsistency {
        table: String,
        key: String,
        found: u64,
    },

    /// IO error (writing the dump output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Unexpected internal error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl DumpError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        DumpError::Config(message.into())
    }

    /// Create a RowLookup error.
    pub fn row_lookup(table: impl Into<String>, key: impl Into<String>, found: u64) -> Self {
        DumpError::RowLookup {
            table: table.into(),
            key: key.into(),
            found,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error, used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            DumpError::Config(_) | DumpError::Yaml(_) => 2,
            DumpError::NoPrimaryKey(_) | DumpError::UnknownTable(_) => 3,
            DumpError::BrokenForeignKey { .. } => 4,
            _ => 1,
        }
    }
}

/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;
