//! Storage substrate for quilldb
//!
//! The execution core treats durable storage as an external collaborator;
//! this module supplies the in-memory stand-in it plans against: a catalog
//! of tables with statistics, an explicit execution configuration, and the
//! cheap-to-clone [`Transaction`] handle every plan carries.
//!
//! # Design Principles
//!
//! - Explicit configuration, no globals, no environment reads
//! - Statistics are computed from the stored rows, deterministically
//! - Temp table names come from a catalog-owned counter, not process state

mod catalog;
mod config;
mod db;
mod stats;
mod transaction;

pub use catalog::{Catalog, IndexEntry, TableData};
pub use config::ExecutionConfig;
pub use db::Db;
pub use stats::TableStats;
pub use transaction::Transaction;
