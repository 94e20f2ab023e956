//! SQL Safety Validator
//!
//! Authoritative read-only gate immediately before execution. Verbs are
//! matched as whole words on an uppercased copy; the statement itself is
//! never modified.

use crate::error::{AssistantError, Result};
use lazy_static::lazy_static;
use regex::Regex;

pub const FORBIDDEN_VERBS: &[&str] = &[
    "DELETE", "UPDATE", "INSERT", "DROP", "ALTER", "TRUNCATE", "CREATE", "REPLACE",
];

lazy_static! {
    static ref FORBIDDEN_PATTERNS: Vec<(&'static str, Regex)> = FORBIDDEN_VERBS
        .iter()
        .map(|verb| (*verb, Regex::new(&format!(r"\b{}\b", verb)).unwrap()))
        .collect();
}

/// First SQL token after leading whitespace, e.g. `SELECT` in `  select 1`.
fn leading_token(sql: &str) -> &str {
    let trimmed = sql.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// True when the first token is `SELECT` or `WITH`, case-insensitively.
pub fn is_read_only_head(sql: &str) -> bool {
    let head = leading_token(sql);
    head.eq_ignore_ascii_case("SELECT") || head.eq_ignore_ascii_case("WITH")
}

pub fn validate_sql(sql: &str) -> Result<()> {
    let sql_upper = sql.to_uppercase();

    for (verb, pattern) in FORBIDDEN_PATTERNS.iter() {
        if pattern.is_match(&sql_upper) {
            return Err(AssistantError::SafetyViolation(format!(
                "Forbidden SQL operation detected: {}",
                verb
            )));
        }
    }

    if !is_read_only_head(sql) {
        return Err(AssistantError::SafetyViolation(
            "Only SELECT queries are allowed.".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_violation(sql: &str) {
        match validate_sql(sql) {
            Err(AssistantError::SafetyViolation(_)) => {}
            other => panic!("expected safety violation for {:?}, got {:?}", sql, other),
        }
    }

    #[test]
    fn test_plain_select_and_cte_pass() {
        assert!(validate_sql("SELECT * FROM orders").is_ok());
        assert!(validate_sql("   select count(*) from orders").is_ok());
        assert!(validate_sql("\n\tWITH t AS (SELECT 1) SELECT * FROM t").is_ok());
    }

    #[test]
    fn test_non_select_head_fails() {
        assert_violation("PRAGMA table_info(orders)");
        assert_violation("EXPLAIN SELECT 1");
        assert_violation("SELECTION FROM t");
        assert_violation("");
    }

    #[test]
    fn test_forbidden_verb_any_case_fails() {
        assert_violation("DROP TABLE x");
        assert_violation("select 1; drop table orders");
        assert_violation("SELECT * FROM t WHERE id IN (SELECT id FROM u); Delete FROM t");
        assert_violation("WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x");
        assert_violation("SELECT replace(name, 'a', 'b') FROM t");
    }

    #[test]
    fn test_verb_inside_identifier_passes() {
        assert!(validate_sql("SELECT dropout_rate FROM t").is_ok());
        assert!(validate_sql("SELECT created_at, updated_by FROM t").is_ok());
        assert!(validate_sql("SELECT last_update FROM t").is_ok());
    }

    #[test]
    fn test_forbidden_message_names_verb() {
        let err = validate_sql("DROP TABLE x").unwrap_err();
        assert!(err.to_string().contains("DROP"));
    }
}
