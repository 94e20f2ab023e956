use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Intent violation: {0}")]
    IntentViolation(String),

    #[error("Safety violation: {0}")]
    SafetyViolation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    /// Terminal failure once the attempt budget is spent. Carries the last
    /// underlying cause so callers can show it directly.
    #[error("Final SQL failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for AssistantError {
    fn from(err: rusqlite::Error) -> Self {
        AssistantError::Database(err.to_string())
    }
}

impl From<csv::Error> for AssistantError {
    fn from(err: csv::Error) -> Self {
        AssistantError::Csv(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
