pub mod assistant;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod explain;
pub mod llm;
pub mod prompts;
pub mod safety;
pub mod sql_generator;

pub use assistant::{AssistantAnswer, SqlAssistant};
pub use error::{AssistantError, Result};
