//! Database module for the SQLite store
//!
//! Schema rendering and CSV ingestion for the store, plus the in-memory
//! session history of answered questions.

pub mod ingest;
pub mod query_history;
pub mod schema;

pub use ingest::{initialize_database, load_csv_into_table};
pub use query_history::{HistoryEntry, QueryHistory};
pub use schema::{load_schema, table_row_counts};
