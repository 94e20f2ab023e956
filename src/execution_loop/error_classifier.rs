//! Error Classifier
//!
//! Classifies failed attempts for logging, retry decisions and repair hints.

use crate::error::AssistantError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy for a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    ForbiddenOperation,
    NotReadOnly,
    MultipleStatements,
    TableNotFound,
    ColumnNotFound,
    AmbiguousColumn,
    SyntaxError,
    Timeout,
    ExecutionError,
    /// Not caused by the SQL candidate; regenerating cannot help.
    Terminal,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureClass::Terminal)
    }

    /// One-line instruction added to the repair prompt.
    pub fn repair_hint(&self) -> Option<&'static str> {
        match self {
            FailureClass::ForbiddenOperation => {
                Some("The query used a data-modifying keyword. Use only read-only SELECT logic.")
            }
            FailureClass::NotReadOnly => Some("The statement must start with SELECT or WITH."),
            FailureClass::MultipleStatements => Some("Return exactly one SQL statement."),
            FailureClass::TableNotFound => Some("Use only table names that appear in the schema."),
            FailureClass::ColumnNotFound => {
                Some("Use only column names that appear in the schema for each table.")
            }
            FailureClass::AmbiguousColumn => {
                Some("Qualify every column with its table name or alias.")
            }
            FailureClass::SyntaxError => Some("Check the query for SQLite syntax errors."),
            FailureClass::Timeout => {
                Some("The query ran too long. Simplify it, filter earlier, or avoid large joins.")
            }
            FailureClass::ExecutionError | FailureClass::Terminal => None,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureClass::ForbiddenOperation => "ForbiddenOperation",
            FailureClass::NotReadOnly => "NotReadOnly",
            FailureClass::MultipleStatements => "MultipleStatements",
            FailureClass::TableNotFound => "TableNotFound",
            FailureClass::ColumnNotFound => "ColumnNotFound",
            FailureClass::AmbiguousColumn => "AmbiguousColumn",
            FailureClass::SyntaxError => "SyntaxError",
            FailureClass::Timeout => "Timeout",
            FailureClass::ExecutionError => "ExecutionError",
            FailureClass::Terminal => "Terminal",
        };
        write!(f, "{}", name)
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an error into the taxonomy
    pub fn classify(&self, error: &AssistantError) -> FailureClass {
        match error {
            AssistantError::SafetyViolation(_) | AssistantError::Execution(_) => {
                self.classify_message(&error.to_string())
            }
            _ => FailureClass::Terminal,
        }
    }

    /// Classify from error text alone, as passed around for repair context.
    pub fn classify_message(&self, message: &str) -> FailureClass {
        let msg = message.to_lowercase();

        if msg.contains("forbidden sql operation") {
            return FailureClass::ForbiddenOperation;
        }

        if msg.contains("only select") {
            return FailureClass::NotReadOnly;
        }

        if msg.contains("multiple statements") {
            return FailureClass::MultipleStatements;
        }

        if msg.contains("statement timeout") || msg.contains("interrupted") {
            return FailureClass::Timeout;
        }

        if msg.contains("no such table") {
            return FailureClass::TableNotFound;
        }

        if msg.contains("no such column") {
            return FailureClass::ColumnNotFound;
        }

        if msg.contains("ambiguous column") {
            return FailureClass::AmbiguousColumn;
        }

        if msg.contains("syntax error") || msg.contains("incomplete input") {
            return FailureClass::SyntaxError;
        }

        FailureClass::ExecutionError
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
