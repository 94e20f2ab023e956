//! Execution Module - read-only query execution against the relational store

pub mod engine;
pub mod result;
pub mod sqlite_engine;

pub use engine::SqlExecutor;
pub use result::{CellValue, QueryResult, Row};
pub use sqlite_engine::SqliteExecutor;
