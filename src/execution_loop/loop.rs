//! Execution Loop
//!
//! Bounded validate -> auto-fix -> execute loop. Every failed attempt either
//! triggers an error-aware regeneration or, once the attempt budget is spent,
//! escalates to a terminal error carrying the last cause.

use crate::error::{AssistantError, Result};
use crate::execution::{QueryResult, SqlExecutor};
use crate::execution_loop::error_classifier::ErrorClassifier;
use crate::prompts::PromptTemplate;
use crate::safety::{auto_fix_sql, validate_question, validate_sql};
use crate::sql_generator::SqlGenerator;
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators the loop drives
#[derive(Clone)]
pub struct ExecutionContext {
    pub generator: SqlGenerator,
    pub executor: Arc<dyn SqlExecutor>,
}

/// Successful pipeline run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The statement that actually ran, after auto-fixing
    pub sql: String,
    pub result: QueryResult,
    /// 1-based attempt that succeeded
    pub attempts: u32,
}

/// Repair loop with bounded retries
pub struct RepairLoop {
    max_retries: u32,
    error_classifier: ErrorClassifier,
}

impl RepairLoop {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            error_classifier: ErrorClassifier::new(),
        }
    }

    /// Total attempts allowed per run: `max_retries + 1`.
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Generate SQL for `question` and run it safely, regenerating after
    /// each failure until the attempt budget is spent.
    pub async fn run_safe(
        &self,
        prompt: &PromptTemplate,
        schema: &str,
        question: &str,
        context: &ExecutionContext,
    ) -> Result<ExecutionResult> {
        // Destructive intent is terminal, never retried
        validate_question(question)?;

        let mut sql = context.generator.generate_sql(prompt, schema, question).await?;
        let budget = self.attempt_budget();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            info!("Execution attempt {} of {}", attempt, budget);

            let error = match self.try_candidate(&sql, context.executor.as_ref()) {
                Ok((executed_sql, result)) => {
                    info!(
                        rows = result.row_count(),
                        "Execution succeeded on attempt {}", attempt
                    );
                    return Ok(ExecutionResult {
                        sql: executed_sql,
                        result,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            let class = self.error_classifier.classify(&error);
            if !class.is_retryable() {
                return Err(error);
            }

            if attempt >= budget {
                warn!(class = %class, "Attempt budget of {} exhausted: {}", budget, error);
                return Err(AssistantError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            warn!(class = %class, "Attempt {} failed, regenerating SQL: {}", attempt, error);
            sql = context
                .generator
                .regenerate_sql(schema, question, &error.to_string())
                .await?;
        }
    }

    fn try_candidate(&self, sql: &str, executor: &dyn SqlExecutor) -> Result<(String, QueryResult)> {
        validate_sql(sql)?;
        let fixed = auto_fix_sql(sql);
        let result = executor.execute(&fixed)?;
        Ok((fixed, result))
    }
}

impl Default for RepairLoop {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_RETRIES)
    }
}
