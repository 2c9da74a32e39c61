//! Core types: schema model, values, identifier validation, and the store
//! adapter contract.

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ForeignKey, PkValue, PrimaryKeyId, Table};
pub use traits::StoreAdapter;
pub use value::{Row, SqlValue};
