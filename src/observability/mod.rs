//! Observability for quilldb
//!
//! Structured, synchronous JSON logging with deterministic field
//! ordering. The planner logs one event per decision it makes, so two
//! runs of the same query over the same statistics produce
//! byte-identical log output.

mod logger;

pub use logger::{Logger, Severity};
