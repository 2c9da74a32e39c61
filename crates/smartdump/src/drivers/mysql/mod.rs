//! MySQL/MariaDB store adapter.
//!
//! Built on a single sqlx connection: a consistent snapshot is a property of
//! one session, so all reads for a dump must share one connection rather
//! than a pool.
//!
//! Only available when the `mysql` feature is enabled (default).

mod adapter;
mod sql;

pub use adapter::MySqlStoreAdapter;
