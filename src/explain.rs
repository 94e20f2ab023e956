//! Result explanation
//!
//! Asks the completion service to explain a query result, then turns its
//! free-text reply into separate insight and recommendation lists.

use crate::error::Result;
use crate::execution::QueryResult;
use crate::llm::{CompletionRequest, TextCompletion};
use crate::prompts::PromptTemplate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const NO_DATA_MESSAGE: &str = "No data returned, so no insights can be generated.";

/// Rows sent to the explainer; the rest of the result stays local.
pub const PREVIEW_ROWS: usize = 10;

const EXPLAINER_SYSTEM_PROMPT: &str =
    "You are a senior business data analyst who explains insights clearly.";
const EXPLAINER_TEMPERATURE: f32 = 0.3;

lazy_static! {
    static ref LEADING_BULLETS: Regex = Regex::new(r"^[-*•]+").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref HEADING_MARKS: Regex = Regex::new(r"#+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExplanationRecord {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainOutcome {
    /// The query returned no rows; the explainer was not called.
    NoData(String),
    Explained(ExplanationRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Insight,
    Recommendation,
}

/// Split explainer output into insights and recommendations.
///
/// Lines mentioning "recommendation" or "insight" switch the current section
/// and are dropped. Other lines lose bullet, bold and heading markup plus
/// surrounding spaces and colons; empty results are dropped.
pub fn normalize_explanation<S: AsRef<str>>(lines: &[S]) -> ExplanationRecord {
    let mut record = ExplanationRecord::default();
    let mut section = Section::Insight;

    for line in lines {
        let text = line.as_ref().trim();
        let lowered = text.to_lowercase();

        if lowered.contains("recommendation") {
            section = Section::Recommendation;
            continue;
        }
        if lowered.contains("insight") {
            section = Section::Insight;
            continue;
        }

        let text = LEADING_BULLETS.replace(text, "");
        let text = BOLD.replace_all(&text, "$1");
        let text = HEADING_MARKS.replace_all(&text, "");
        let text = text.trim_matches(|c: char| c == ' ' || c == ':');

        if text.is_empty() {
            continue;
        }

        match section {
            Section::Insight => record.insights.push(text.to_string()),
            Section::Recommendation => record.recommendations.push(text.to_string()),
        }
    }

    record
}

pub struct Explainer {
    llm: Arc<dyn TextCompletion>,
    model: String,
    template: PromptTemplate,
}

impl Explainer {
    pub fn new(llm: Arc<dyn TextCompletion>, model: impl Into<String>, template: PromptTemplate) -> Self {
        Self {
            llm,
            model: model.into(),
            template,
        }
    }

    pub async fn explain_result(&self, question: &str, result: &QueryResult) -> Result<ExplainOutcome> {
        if result.is_empty() {
            return Ok(ExplainOutcome::NoData(NO_DATA_MESSAGE.to_string()));
        }

        let columns = result.columns.join(", ");
        let preview = result.preview(PREVIEW_ROWS);
        let prompt = self.template.fill(&[
            ("question", question),
            ("columns", &columns),
            ("result", &preview),
        ])?;

        let request = CompletionRequest::new(
            &self.model,
            EXPLAINER_SYSTEM_PROMPT,
            &prompt,
            EXPLAINER_TEMPERATURE,
        );
        let reply = self.llm.complete(request).await?;

        let lines: Vec<&str> = reply.trim().split('\n').collect();
        let record = normalize_explanation(&lines);
        info!(
            insights = record.insights.len(),
            recommendations = record.recommendations.len(),
            "Explanation normalized"
        );

        Ok(ExplainOutcome::Explained(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_are_split() {
        let record = normalize_explanation(&[
            "Insights",
            "Sales grew 10%",
            "Recommendations",
            "Increase marketing",
        ]);
        assert_eq!(
            record,
            ExplanationRecord {
                insights: vec!["Sales grew 10%".to_string()],
                recommendations: vec!["Increase marketing".to_string()],
            }
        );
    }

    #[test]
    fn test_markdown_is_stripped() {
        let record = normalize_explanation(&["- **Revenue** rose"]);
        assert_eq!(record.insights, vec!["Revenue rose".to_string()]);
    }

    #[test]
    fn test_headings_colons_and_blank_lines() {
        let record = normalize_explanation(&[
            "### Key Insights:",
            "",
            "* Orders peaked in **November 2017**:",
            "•• Average ticket is R$ 120",
            "   ",
            "## Recommendations",
            "1. Plan stock ahead of Black Friday",
            "#",
        ]);
        assert_eq!(
            record.insights,
            vec!["Orders peaked in November 2017", "Average ticket is R$ 120"]
        );
        assert_eq!(record.recommendations, vec!["1. Plan stock ahead of Black Friday"]);
    }

    #[test]
    fn test_lines_before_any_heading_are_insights() {
        let record = normalize_explanation(&["Volume doubled", "RECOMMENDATION:", "Hire staff", "insight", "Churn is flat"]);
        assert_eq!(record.insights, vec!["Volume doubled", "Churn is flat"]);
        assert_eq!(record.recommendations, vec!["Hire staff"]);
    }

    #[test]
    fn test_empty_input() {
        let empty: [&str; 0] = [];
        assert_eq!(normalize_explanation(&empty), ExplanationRecord::default());
    }
}
