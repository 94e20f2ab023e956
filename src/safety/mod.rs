//! SQL Safety
//!
//! Read-only guards applied before anything reaches the relational store:
//! a natural-language intent filter, the authoritative SQL validator and a
//! pattern-based auto-fixer for SQL shapes SQLite rejects.

pub mod auto_fix;
pub mod intent;
pub mod sql_validator;

pub use auto_fix::auto_fix_sql;
pub use intent::validate_question;
pub use sql_validator::{is_read_only_head, validate_sql, FORBIDDEN_VERBS};
