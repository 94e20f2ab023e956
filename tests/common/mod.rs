#![allow(dead_code)]

use async_trait::async_trait;
use sql_assistant::error::{AssistantError, Result};
use sql_assistant::execution::{CellValue, QueryResult, SqlExecutor};
use sql_assistant::llm::{CompletionRequest, TextCompletion};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Completion service that replays canned replies and records every request
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(AssistantError::Llm(message.to_string())));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextCompletion for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::Llm("script exhausted".to_string())))
    }
}

type Behavior = Box<dyn Fn(usize, &str) -> Result<QueryResult> + Send + Sync>;

/// Executor double that counts calls and delegates to a closure receiving the
/// 1-based call number and the SQL
pub struct CountingExecutor {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    behavior: Behavior,
}

impl CountingExecutor {
    pub fn new(behavior: impl Fn(usize, &str) -> Result<QueryResult> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            behavior: Box::new(behavior),
        }
    }

    pub fn always_ok(result: QueryResult) -> Self {
        Self::new(move |_, _| Ok(result.clone()))
    }

    pub fn always_failing(message: &'static str) -> Self {
        Self::new(move |_, _| Err(AssistantError::Execution(message.to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl SqlExecutor for CountingExecutor {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn execute(&self, sql: &str) -> Result<QueryResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push(sql.to_string());
        (self.behavior)(call, sql)
    }
}

pub fn single_value(column: &str, value: i64) -> QueryResult {
    QueryResult::new(vec![column.to_string()], vec![vec![CellValue::Integer(value)]]).unwrap()
}
