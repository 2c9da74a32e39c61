//! # smartdump
//!
//! Referentially-consistent partial dumps of relational databases.
//!
//! Given a set of requested tables, smartdump emits a sequence of SQL
//! statements recreating those tables' full contents plus every row
//! elsewhere in the database reachable from them through foreign keys — and
//! nothing else. The result imports cleanly without breaking referential
//! integrity, without dumping the whole database.
//!
//! All reads for one dump happen inside a single snapshot-consistent
//! transaction, and statements are produced lazily so arbitrarily large
//! dumps stream without buffering.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use smartdump::{
//!     ConnectionConfig, Dumper, DumpOptions, MySqlStoreAdapter, Table, TargetTable,
//! };
//!
//! #[tokio::main]
//! async fn main() -> smartdump::Result<()> {
//!     let connection = ConnectionConfig {
//!         host: "localhost".into(),
//!         port: 3306,
//!         user: "root".into(),
//!         password: "secret".into(),
//!         database: "shop".into(),
//!     };
//!
//!     let adapter = Arc::new(MySqlStoreAdapter::connect(&connection).await?);
//!     let dumper = Dumper::new(adapter);
//!
//!     let tables = vec![TargetTable::new(Table::new("shop", "orders"))];
//!     let mut stream = dumper.dump(&tables, DumpOptions::default()).await?;
//!
//!     while let Some(statement) = stream.next_statement().await {
//!         println!("{}", statement?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod drivers;
pub mod dumper;
pub mod error;
pub mod workset;

// Re-exports for convenient access
pub use crate::cache::AdapterCache;
pub use crate::config::{ConnectionConfig, DumpConfig, DumpOptions, TargetTable};
pub use crate::core::{ForeignKey, PkValue, PrimaryKeyId, Row, SqlValue, StoreAdapter, Table};
pub use crate::dumper::{DumpStream, Dumper};
pub use crate::error::{DumpError, Result};
pub use crate::workset::Workset;

#[cfg(feature = "mysql")]
pub use crate::drivers::mysql::MySqlStoreAdapter;
