//! Record subsystem for quilldb
//!
//! Defines the row model shared by every scan: typed schemas, positional
//! rows, and record identifiers. Schemas are ordered field lists; rows are
//! constant vectors positionally matched to a schema.

mod rid;
mod row;
mod schema;

pub use rid::Rid;
pub use row::Row;
pub use schema::{FieldType, Schema};
