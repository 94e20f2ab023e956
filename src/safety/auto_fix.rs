//! SQL Auto-fixer
//!
//! Rewrites SQL shapes SQLite rejects into equivalent ones. Pattern based, not
//! a parser: a UNION or ORDER BY inside a string literal or comment also
//! triggers the rewrite.

use lazy_static::lazy_static;
use regex::Regex;

pub const UNION_ALIAS: &str = "union_result";

lazy_static! {
    static ref UNION: Regex = Regex::new(r"\bUNION\b").unwrap();
    static ref ORDER_BY: Regex = Regex::new(r"\bORDER\s+BY\b").unwrap();
    static ref ALREADY_WRAPPED: Regex =
        Regex::new(r"(?is)^\s*SELECT\s+\*\s+FROM\s*\(.*\)\s*AS\s+union_result\s*;?\s*$").unwrap();
    static ref TRAILING_TERMINATORS: Regex = Regex::new(r"(?:\s|;|--[^\n]*)+$").unwrap();
}

/// Wrap a UNION + ORDER BY statement as `SELECT * FROM (<sql>) AS union_result`.
/// Any other statement, including one already wrapped, is returned unchanged,
/// as is one that still holds a `;` once trailing terminators and line
/// comments are removed.
pub fn auto_fix_sql(sql: &str) -> String {
    let sql_upper = sql.to_uppercase();

    if !(UNION.is_match(&sql_upper) && ORDER_BY.is_match(&sql_upper)) {
        return sql.to_string();
    }

    if ALREADY_WRAPPED.is_match(sql) {
        return sql.to_string();
    }

    // A semicolon inside the subquery is a syntax error
    let inner = TRAILING_TERMINATORS.replace(sql.trim(), "");
    if inner.contains(';') {
        return sql.to_string();
    }

    tracing::debug!("Wrapping UNION with ORDER BY as a subquery");
    format!("SELECT *\nFROM (\n{}\n) AS {}", inner, UNION_ALIAS)
}
