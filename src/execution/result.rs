//! Query Result - Columns plus fully materialized rows from the store

use crate::error::{AssistantError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell as returned by the relational store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<rusqlite::types::Value> for CellValue {
    fn from(value: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value;
        match value {
            Value::Null => CellValue::Null,
            Value::Integer(i) => CellValue::Integer(i),
            Value::Real(f) => CellValue::Real(f),
            Value::Text(s) => CellValue::Text(s),
            Value::Blob(b) => CellValue::Blob(b),
        }
    }
}

impl CellValue {
    /// Literal-style rendering used in LLM previews: text is quoted.
    pub fn to_literal(&self) -> String {
        match self {
            CellValue::Null => "None".to_string(),
            CellValue::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

pub type Row = Vec<CellValue>;

/// Ordered column names paired with rows aligned to them. Duplicate column
/// names are kept as the store returned them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Build a result, rejecting any row whose width differs from the columns.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(AssistantError::Execution(format!(
                "Row {} has {} values but the result has {} columns",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `limit` rows rendered one per line as tuples, e.g. `(2017, 45101)`.
    pub fn preview(&self, limit: usize) -> String {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                let inner = row.iter().map(CellValue::to_literal).join(", ");
                if row.len() == 1 {
                    format!("({},)", inner)
                } else {
                    format!("({})", inner)
                }
            })
            .join("\n")
    }

    /// Pipe-separated text table: header line then one line per row.
    pub fn to_text_table(&self) -> String {
        let header = self.columns.join(" | ");
        let body = self.rows.iter().map(|row| row.iter().join(" | "));
        std::iter::once(header).chain(body).join("\n")
    }
}
