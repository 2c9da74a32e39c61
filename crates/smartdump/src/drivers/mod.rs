//! Store adapter implementations, one per database engine.

#[cfg(feature = "mysql")]
pub mod mysql;
