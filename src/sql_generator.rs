//! SQL Generator
//!
//! Turns questions into SQL candidates through the completion service: the
//! first candidate from the generator template, later candidates from an
//! error-aware repair prompt. Also produces short conversation titles.

use crate::error::Result;
use crate::execution_loop::error_recovery::build_repair_prompt;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::prompts::PromptTemplate;
use std::sync::Arc;
use tracing::debug;

const GENERATOR_SYSTEM_PROMPT: &str = "You are an expert SQL generator.";
const REPAIR_SYSTEM_PROMPT: &str = "You are an expert SQLite SQL fixer.";
const TITLE_SYSTEM_PROMPT: &str = "You generate concise analytics chat titles.";
const TITLE_MAX_TOKENS: u32 = 12;

/// Strip markdown code fences the model sometimes adds around SQL, along
/// with any language tag on the opening fence (`sql`, `sqlite`, ...).
pub fn clean_sql_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let (tag, body) = rest.split_once('\n').unwrap_or((rest, ""));
            let is_tag = tag
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if is_tag {
                body
            } else {
                rest
            }
        }
        None => trimmed,
    };
    let inner = inner.trim_end();
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}

fn build_title_prompt(question: &str) -> String {
    format!(
        r#"Generate a short, descriptive conversation title (3-6 words).

Rules:
- No punctuation
- No emojis
- No filler words
- Abstract the intent
- Use Title Case

Examples:
Question: How many orders were placed in each year?
Title: Yearly Order Trends

Question: Can we see monthly seasonality in 2018 summers?
Title: Summer Seasonality Analysis

Question:
{}

Title:"#,
        question
    )
}

#[derive(Clone)]
pub struct SqlGenerator {
    llm: Arc<dyn TextCompletion>,
    model: String,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Initial candidate from the generator template.
    pub async fn generate_sql(&self, prompt: &PromptTemplate, schema: &str, question: &str) -> Result<String> {
        let filled = prompt.fill(&[("schema", schema), ("question", question)])?;
        let request = CompletionRequest::new(&self.model, GENERATOR_SYSTEM_PROMPT, &filled, 0.0);

        let sql = clean_sql_response(&self.llm.complete(request).await?);
        debug!(sql = %sql, "Generated SQL");
        Ok(sql)
    }

    /// Replacement candidate after `error`, built from a dedicated repair
    /// prompt rather than the generator template.
    pub async fn regenerate_sql(&self, schema: &str, question: &str, error: &str) -> Result<String> {
        let repair_prompt = build_repair_prompt(schema, question, error);
        let request = CompletionRequest::new(&self.model, REPAIR_SYSTEM_PROMPT, &repair_prompt, 0.0);

        let sql = clean_sql_response(&self.llm.complete(request).await?);
        debug!(sql = %sql, "Regenerated SQL");
        Ok(sql)
    }

    /// Short Title Case label for session history.
    pub async fn generate_title(&self, question: &str) -> Result<String> {
        let request = CompletionRequest::new(
            &self.model,
            TITLE_SYSTEM_PROMPT,
            &build_title_prompt(question),
            0.0,
        )
        .with_max_tokens(TITLE_MAX_TOKENS);

        Ok(self.llm.complete(request).await?.trim().to_string())
    }
}
