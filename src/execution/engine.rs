//! Execution Engine Trait - contract between the repair loop and the store

use crate::error::Result;
use crate::execution::result::QueryResult;

/// Runs one read-only SQL statement and returns the full result set.
///
/// Implementations must refuse anything whose first token is not `SELECT` or
/// `WITH`, independently of any earlier validation, and must report store
/// faults as `AssistantError::Execution` carrying the engine's message.
pub trait SqlExecutor: Send + Sync {
    /// Engine name (e.g., "sqlite")
    fn name(&self) -> &'static str;

    fn execute(&self, sql: &str) -> Result<QueryResult>;
}
