//! Prompt Templates
//!
//! Parameterized prompt text with named `{placeholder}` slots. `{{` and `}}`
//! produce literal braces.

use crate::error::{AssistantError, Result};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const GENERATOR_PROMPT_FILE: &str = "sql_generator_prompt.txt";
pub const EXPLAINER_PROMPT_FILE: &str = "sql_explainer_prompt.txt";

const DEFAULT_GENERATOR_PROMPT: &str = include_str!("../prompts/sql_generator_prompt.txt");
const DEFAULT_EXPLAINER_PROMPT: &str = include_str!("../prompts/sql_explainer_prompt.txt");

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{|\}\}|\{(\w+)\}").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn default_generator() -> Self {
        Self::new(DEFAULT_GENERATOR_PROMPT)
    }

    pub fn default_explainer() -> Self {
        Self::new(DEFAULT_EXPLAINER_PROMPT)
    }

    /// Load the SQL generator template from `prompts_dir`, or the built-in one.
    pub fn load_generator(prompts_dir: &Path) -> Result<Self> {
        Self::load_or(prompts_dir, GENERATOR_PROMPT_FILE, DEFAULT_GENERATOR_PROMPT)
    }

    /// Load the result explainer template from `prompts_dir`, or the built-in one.
    pub fn load_explainer(prompts_dir: &Path) -> Result<Self> {
        Self::load_or(prompts_dir, EXPLAINER_PROMPT_FILE, DEFAULT_EXPLAINER_PROMPT)
    }

    fn load_or(prompts_dir: &Path, file_name: &str, fallback: &str) -> Result<Self> {
        let path = prompts_dir.join(file_name);
        if path.exists() {
            info!("Loading prompt template from {}", path.display());
            Ok(Self::new(std::fs::read_to_string(&path)?))
        } else {
            debug!("{} not found, using built-in template", path.display());
            Ok(Self::new(fallback))
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of all placeholders, in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.text) {
            if let Some(name) = caps.get(1) {
                if !names.iter().any(|n| n == name.as_str()) {
                    names.push(name.as_str().to_string());
                }
            }
        }
        names
    }

    /// Substitute every placeholder. A placeholder without a value is a
    /// configuration error; unused values are ignored.
    pub fn fill(&self, values: &[(&str, &str)]) -> Result<String> {
        let lookup: HashMap<&str, &str> = values.iter().copied().collect();
        let mut missing: Option<String> = None;

        let filled = PLACEHOLDER.replace_all(&self.text, |caps: &Captures| {
            match caps.get(1) {
                Some(name) => match lookup.get(name.as_str()) {
                    Some(value) => value.to_string(),
                    None => {
                        missing.get_or_insert_with(|| name.as_str().to_string());
                        String::new()
                    }
                },
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            }
        });

        match missing {
            Some(name) => Err(AssistantError::Config(format!(
                "Prompt template placeholder '{{{}}}' has no value",
                name
            ))),
            None => Ok(filled.into_owned()),
        }
    }
}
