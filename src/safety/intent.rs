//! Intent Filter
//!
//! Blocks destructive intent at the natural language level, before any SQL is
//! generated. Matching is a plain substring check on the lowercased question,
//! so "please insert a filter" is rejected too.

use crate::error::{AssistantError, Result};

pub const FORBIDDEN_INTENTS: &[&str] = &["delete", "remove", "drop", "truncate", "update", "insert"];

pub const READ_ONLY_MESSAGE: &str = "This assistant is read-only. Destructive actions are not allowed.";

pub fn validate_question(question: &str) -> Result<()> {
    let lowered = question.to_lowercase();

    if let Some(word) = FORBIDDEN_INTENTS.iter().find(|w| lowered.contains(*w)) {
        tracing::warn!(intent = %word, "Rejected question with destructive intent");
        return Err(AssistantError::IntentViolation(READ_ONLY_MESSAGE.to_string()));
    }

    Ok(())
}
