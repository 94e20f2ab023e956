//! Query history for one assistant session
//!
//! Kept in memory only; nothing survives the process.

use crate::error::{AssistantError, Result};
use crate::execution::QueryResult;
use crate::explain::ExplainOutcome;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const QUOTA_MESSAGE: &str = "Query limit reached for this session.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub title: String,
    pub question: String,
    pub sql: String,
    pub result: QueryResult,
    pub explanation: ExplainOutcome,
    pub created_at: DateTime<Local>,
}

impl HistoryEntry {
    /// Wall-clock time the entry was recorded, as `HH:MM`.
    pub fn time_label(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}

/// Session history plus the per-session query budget
pub struct QueryHistory {
    entries: Vec<HistoryEntry>,
    query_count: usize,
    max_queries: usize,
}

impl QueryHistory {
    pub fn new(max_queries: usize) -> Self {
        Self {
            entries: Vec::new(),
            query_count: 0,
            max_queries,
        }
    }

    /// Count one more query against the session budget, failing once the
    /// budget is spent. Failed queries still count.
    pub fn reserve_query(&mut self) -> Result<()> {
        if self.query_count >= self.max_queries {
            return Err(AssistantError::QuotaExceeded(QUOTA_MESSAGE.to_string()));
        }
        self.query_count += 1;
        Ok(())
    }

    pub fn query_count(&self) -> usize {
        self.query_count
    }

    pub fn remaining_queries(&self) -> usize {
        self.max_queries.saturating_sub(self.query_count)
    }

    pub fn record(
        &mut self,
        title: String,
        question: String,
        sql: String,
        result: QueryResult,
        explanation: ExplainOutcome,
    ) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            id: Uuid::new_v4(),
            title,
            question,
            sql,
            result,
            explanation,
            created_at: Local::now(),
        });
        // Just pushed, so the vector is non-empty
        &self.entries[self.entries.len() - 1]
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
