//! Error Recovery
//!
//! Builds the repair prompt sent after a failed attempt.

use crate::execution_loop::error_classifier::ErrorClassifier;

/// Repair prompt carrying the failure text, a targeted hint when the failure
/// is recognised, and the original schema and question.
pub fn build_repair_prompt(schema: &str, question: &str, error: &str) -> String {
    let class = ErrorClassifier::new().classify_message(error);

    let hint = class
        .repair_hint()
        .map(|h| format!("\nHINT ({}):\n{}\n", class, h))
        .unwrap_or_default();

    format!(
        r#"You generated SQL that failed in SQLite.

ERROR:
{}
{}
Fix the SQL so it runs successfully in SQLite.
Follow all safety rules.
Return ONLY SQL.

Schema:
{}

Question:
{}
"#,
        error, hint, schema, question
    )
}
