mod common;

use common::{single_value, CountingExecutor, ScriptedLlm};
use sql_assistant::error::AssistantError;
use sql_assistant::execution::SqlExecutor;
use sql_assistant::execution_loop::{ExecutionContext, RepairLoop};
use sql_assistant::prompts::PromptTemplate;
use sql_assistant::sql_generator::SqlGenerator;
use std::sync::Arc;

const SCHEMA: &str = "\n-- orders\nCREATE TABLE orders (order_id TEXT, order_purchase_timestamp TEXT)\n";

fn context(llm: &Arc<ScriptedLlm>, executor: &Arc<CountingExecutor>) -> ExecutionContext {
    let executor: Arc<dyn SqlExecutor> = executor.clone();
    ExecutionContext {
        generator: SqlGenerator::new(llm.clone(), "gpt-4o-mini"),
        executor,
    }
}

fn prompt() -> PromptTemplate {
    PromptTemplate::new("Schema: {schema}\nQuestion: {question}")
}

#[tokio::test]
async fn test_run_safe_success() {
    let llm = Arc::new(ScriptedLlm::new(&["SELECT 1 AS test_col;"]));
    let executor = Arc::new(CountingExecutor::always_ok(single_value("test_col", 1)));

    let run = RepairLoop::new(1)
        .run_safe(&prompt(), SCHEMA, "simple test", &context(&llm, &executor))
        .await
        .unwrap();

    assert!(run.sql.trim().starts_with("SELECT"));
    assert_eq!(run.result, single_value("test_col", 1));
    assert_eq!(run.attempts, 1);
    assert_eq!(executor.calls(), 1);

    // Only the generation call, no regeneration after success
    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages[0].content, "You are an expert SQL generator.");
    assert_eq!(requests[0].temperature, 0.0);
    assert!(requests[0].user_content().contains("Question: simple test"));
    assert!(requests[0].user_content().contains("CREATE TABLE orders"));
}

#[tokio::test]
async fn test_run_safe_retry_with_error_context() {
    let llm = Arc::new(ScriptedLlm::new(&["SELECT 1 AS test_col;", "SELECT 2 AS test_col;"]));
    let executor = Arc::new(CountingExecutor::new(|call, _| {
        if call == 1 {
            Err(AssistantError::Execution("SQL execution failed: no such column: test_col".to_string()))
        } else {
            Ok(single_value("test_col", 2))
        }
    }));

    let run = RepairLoop::new(1)
        .run_safe(&prompt(), SCHEMA, "retry test", &context(&llm, &executor))
        .await
        .unwrap();

    assert_eq!(run.result, single_value("test_col", 2));
    assert_eq!(run.attempts, 2);
    assert_eq!(executor.calls(), 2);
    assert_eq!(executor.seen()[1], "SELECT 2 AS test_col;");

    let repair = &llm.requests()[1];
    assert_eq!(repair.messages[0].content, "You are an expert SQLite SQL fixer.");
    assert!(repair.user_content().contains("no such column: test_col"));
    assert!(repair.user_content().contains("retry test"));
    assert!(repair.user_content().contains("CREATE TABLE orders"));
    assert!(!repair.user_content().starts_with("Schema:"));
}

#[tokio::test]
async fn test_run_safe_retry_limit() {
    let llm = Arc::new(ScriptedLlm::new(&["SELECT 1 AS test_col;", "SELECT 2 AS test_col;"]));
    let executor = Arc::new(CountingExecutor::always_failing("Always fails"));

    let err = RepairLoop::new(1)
        .run_safe(&prompt(), SCHEMA, "fail test", &context(&llm, &executor))
        .await
        .unwrap_err();

    match err {
        AssistantError::RetriesExhausted { attempts, ref last_error } => {
            assert_eq!(attempts, 2);
            assert!(last_error.contains("Always fails"));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert!(err.to_string().contains("Always fails"));
    assert_eq!(executor.calls(), 2);
    // No regeneration after the final attempt
    assert_eq!(llm.request_count(), 2);
}

#[tokio::test]
async fn test_execution_attempts_never_exceed_budget() {
    for max_retries in 0..4u32 {
        let replies: Vec<String> = (0..=max_retries).map(|i| format!("SELECT {} AS n", i)).collect();
        let reply_refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let llm = Arc::new(ScriptedLlm::new(&reply_refs));
        let executor = Arc::new(CountingExecutor::always_failing("boom"));

        let err = RepairLoop::new(max_retries)
            .run_safe(&prompt(), SCHEMA, "budget test", &context(&llm, &executor))
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::RetriesExhausted { .. }));
        assert_eq!(executor.calls(), max_retries as usize + 1);
        assert_eq!(llm.request_count(), max_retries as usize + 1);
    }
}

#[tokio::test]
async fn test_unsafe_candidate_is_regenerated_without_execution() {
    let llm = Arc::new(ScriptedLlm::new(&["DROP TABLE orders", "SELECT COUNT(*) AS n FROM orders"]));
    let executor = Arc::new(CountingExecutor::always_ok(single_value("n", 7)));

    let run = RepairLoop::new(1)
        .run_safe(&prompt(), SCHEMA, "how many orders", &context(&llm, &executor))
        .await
        .unwrap();

    assert_eq!(run.attempts, 2);
    assert_eq!(executor.calls(), 1);
    assert_eq!(executor.seen(), vec!["SELECT COUNT(*) AS n FROM orders".to_string()]);

    let repair = &llm.requests()[1];
    assert!(repair.user_content().contains("Forbidden SQL operation detected: DROP"));
    assert!(repair.user_content().contains("HINT (ForbiddenOperation)"));
}

#[tokio::test]
async fn test_unsafe_candidates_exhaust_budget_without_touching_store() {
    let llm = Arc::new(ScriptedLlm::new(&["PRAGMA table_info(orders)", "EXPLAIN SELECT 1"]));
    let executor = Arc::new(CountingExecutor::always_ok(single_value("n", 1)));

    let err = RepairLoop::new(1)
        .run_safe(&prompt(), SCHEMA, "show the schema", &context(&llm, &executor))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Only SELECT queries are allowed."));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_destructive_intent_is_terminal() {
    let llm = Arc::new(ScriptedLlm::new(&["SELECT 1"]));
    let executor = Arc::new(CountingExecutor::always_ok(single_value("n", 1)));

    let err = RepairLoop::new(3)
        .run_safe(&prompt(), SCHEMA, "Delete all cancelled orders", &context(&llm, &executor))
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::IntentViolation(_)));
    assert_eq!(llm.request_count(), 0);
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_llm_failure_during_regeneration_is_surfaced() {
    let llm = Arc::new(ScriptedLlm::new(&["SELECT broken"]));
    llm.push_error("LLM API call failed: connection reset");
    let executor = Arc::new(CountingExecutor::always_failing("no such column: broken"));

    let err = RepairLoop::new(2)
        .run_safe(&prompt(), SCHEMA, "anything", &context(&llm, &executor))
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::Llm(ref m) if m.contains("connection reset")));
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn test_union_with_order_by_is_auto_fixed_before_execution() {
    let llm = Arc::new(ScriptedLlm::new(&[
        "```sql\nSELECT customer_state AS s FROM customers UNION SELECT seller_state FROM sellers ORDER BY s;\n```",
    ]));
    let executor = Arc::new(CountingExecutor::always_ok(single_value("s", 0)));

    let run = RepairLoop::new(0)
        .run_safe(&prompt(), SCHEMA, "all states", &context(&llm, &executor))
        .await
        .unwrap();

    let executed = &executor.seen()[0];
    assert!(executed.starts_with("SELECT *\nFROM ("));
    assert!(executed.ends_with(") AS union_result"));
    assert_eq!(&run.sql, executed);
}
