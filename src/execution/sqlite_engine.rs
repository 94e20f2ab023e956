//! SQLite Engine
//!
//! Opens a read-only connection per call, runs one statement, materializes
//! every row and closes the connection on every exit path. No pooling: each
//! repair attempt gets its own connection.

use crate::error::{AssistantError, Result};
use crate::execution::engine::SqlExecutor;
use crate::execution::result::{CellValue, QueryResult, Row};
use crate::safety::is_read_only_head;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct SqliteExecutor {
    db_path: PathBuf,
    statement_timeout: Option<Duration>,
}

impl SqliteExecutor {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            statement_timeout: None,
        }
    }

    /// Abort statements that run longer than `timeout`.
    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    fn open(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            AssistantError::Execution(format!(
                "Failed to open database {}: {}",
                self.db_path.display(),
                e
            ))
        })
    }
}

fn engine_error(e: rusqlite::Error) -> AssistantError {
    AssistantError::Execution(format!("SQL execution failed: {}", e))
}

/// Runs exactly one statement. A second statement in the text is rejected
/// before anything runs.
fn run_statement(conn: &Connection, sql: &str) -> Result<(Vec<String>, Vec<Row>)> {
    let mut batch = Batch::new(conn, sql);
    let mut stmt = batch
        .next()
        .map_err(engine_error)?
        .ok_or_else(|| AssistantError::Execution("empty statement".to_string()))?;
    if batch.next().map_err(engine_error)?.is_some() {
        return Err(AssistantError::Execution(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut materialized = Vec::new();
    let mut rows = stmt.query([]).map_err(engine_error)?;
    while let Some(row) = rows.next().map_err(engine_error)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(CellValue::from(row.get::<_, Value>(idx).map_err(engine_error)?));
        }
        materialized.push(values);
    }

    Ok((columns, materialized))
}

/// Interrupts the connection's in-flight statement once the timeout elapses.
/// Dropping the watchdog disarms it.
struct Watchdog {
    cancel: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    fn arm(conn: &Connection, timeout: Duration) -> Self {
        let interrupt = conn.get_interrupt_handle();
        let fired = Arc::new(AtomicBool::new(false));
        let (cancel, disarmed) = mpsc::channel::<()>();

        let flag = Arc::clone(&fired);
        let handle = thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = disarmed.recv_timeout(timeout) {
                flag.store(true, Ordering::SeqCst);
                interrupt.interrupt();
            }
        });

        Self {
            cancel: Some(cancel),
            handle: Some(handle),
            fired,
        }
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Closing the channel wakes the thread without interrupting
        self.cancel.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl SqlExecutor for SqliteExecutor {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn execute(&self, sql: &str) -> Result<QueryResult> {
        if !is_read_only_head(sql) {
            return Err(AssistantError::Execution(
                "Only SELECT queries can be executed".to_string(),
            ));
        }

        let started = Instant::now();

        let conn = self.open()?;
        let watchdog = self.statement_timeout.map(|t| Watchdog::arm(&conn, t));
        let outcome = run_statement(&conn, sql);
        let timed_out = watchdog.as_ref().map_or(false, Watchdog::fired);
        drop(watchdog);
        drop(conn);

        match outcome {
            Ok((columns, rows)) => {
                debug!(
                    rows = rows.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Statement executed"
                );
                QueryResult::new(columns, rows)
            }
            Err(AssistantError::Execution(e)) if timed_out => {
                let limit_ms = self.statement_timeout.map_or(0, |t| t.as_millis());
                warn!(limit_ms = limit_ms as u64, "Statement aborted by timeout");
                Err(AssistantError::Execution(format!(
                    "statement timeout of {}ms exceeded: {}",
                    limit_ms, e
                )))
            }
            Err(e) => Err(e),
        }
    }
}
