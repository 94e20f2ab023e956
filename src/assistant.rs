//! SQL Assistant
//!
//! One session over a fixed SQLite dataset: question in, SQL + rows +
//! explanation out, with a per-session query budget and history.

use crate::config::AssistantConfig;
use crate::db::{load_schema, QueryHistory};
use crate::error::Result;
use crate::execution::{QueryResult, SqlExecutor, SqliteExecutor};
use crate::execution_loop::{ExecutionContext, RepairLoop};
use crate::explain::{ExplainOutcome, Explainer};
use crate::llm::TextCompletion;
use crate::prompts::PromptTemplate;
use crate::sql_generator::SqlGenerator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const FALLBACK_TITLE_CHARS: usize = 48;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantAnswer {
    pub title: String,
    pub question: String,
    pub sql: String,
    pub result: QueryResult,
    pub explanation: ExplainOutcome,
    pub attempts: u32,
}

pub struct SqlAssistant {
    schema: String,
    generator_prompt: PromptTemplate,
    context: ExecutionContext,
    repair_loop: RepairLoop,
    explainer: Explainer,
    history: QueryHistory,
}

fn fallback_title(question: &str) -> String {
    let trimmed = question.trim();
    if trimmed.chars().count() <= FALLBACK_TITLE_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(FALLBACK_TITLE_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

impl SqlAssistant {
    /// Assistant over the SQLite database named in `config`.
    pub fn new(config: &AssistantConfig, llm: Arc<dyn TextCompletion>) -> Result<Self> {
        let schema = load_schema(&config.db_path)?;
        let executor: Arc<dyn SqlExecutor> = Arc::new(
            SqliteExecutor::new(&config.db_path).with_statement_timeout(config.statement_timeout),
        );
        Self::with_executor(config, llm, executor, schema)
    }

    /// Assistant over an arbitrary executor and schema text.
    pub fn with_executor(
        config: &AssistantConfig,
        llm: Arc<dyn TextCompletion>,
        executor: Arc<dyn SqlExecutor>,
        schema: String,
    ) -> Result<Self> {
        let generator_prompt = PromptTemplate::load_generator(&config.prompts_dir)?;
        let explainer_prompt = PromptTemplate::load_explainer(&config.prompts_dir)?;

        info!(
            engine = executor.name(),
            model = %config.llm.model,
            max_retries = config.max_retries,
            "SQL assistant ready"
        );

        Ok(Self {
            schema,
            generator_prompt,
            context: ExecutionContext {
                generator: SqlGenerator::new(Arc::clone(&llm), config.llm.model.clone()),
                executor,
            },
            repair_loop: RepairLoop::new(config.max_retries),
            explainer: Explainer::new(llm, config.llm.model.clone(), explainer_prompt),
            history: QueryHistory::new(config.max_queries_per_session),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    /// Answer one question and record it in the session history.
    pub async fn ask(&mut self, question: &str) -> Result<AssistantAnswer> {
        self.history.reserve_query()?;

        let run = self
            .repair_loop
            .run_safe(&self.generator_prompt, &self.schema, question, &self.context)
            .await?;

        let explanation = self.explainer.explain_result(question, &run.result).await?;

        let title = match self.context.generator.generate_title(question).await {
            Ok(title) if !title.is_empty() => title,
            Ok(_) => fallback_title(question),
            Err(e) => {
                warn!("Title generation failed, using question text: {}", e);
                fallback_title(question)
            }
        };

        let answer = AssistantAnswer {
            title,
            question: question.to_string(),
            sql: run.sql,
            result: run.result,
            explanation,
            attempts: run.attempts,
        };

        self.history.record(
            answer.title.clone(),
            answer.question.clone(),
            answer.sql.clone(),
            answer.result.clone(),
            answer.explanation.clone(),
        );

        Ok(answer)
    }
}
