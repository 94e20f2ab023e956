//! CSV ingestion: builds the SQLite store from a directory of CSV files

use crate::db::schema::quote_ident;
use crate::error::Result;
use csv::ReaderBuilder;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    fn convert(self, cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match self {
            ColumnType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            ColumnType::Real => trimmed
                .parse::<f64>()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            ColumnType::Text => Value::Text(cell.to_string()),
        }
    }
}

/// UTF-8 when valid, otherwise Latin-1.
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn infer_column_type(records: &[Vec<String>], idx: usize) -> ColumnType {
    let mut cells = records
        .iter()
        .filter_map(|r| r.get(idx))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .peekable();

    if cells.peek().is_none() {
        return ColumnType::Text;
    }

    let mut inferred = ColumnType::Integer;
    for cell in cells {
        if inferred == ColumnType::Integer && cell.parse::<i64>().is_err() {
            inferred = ColumnType::Real;
        }
        if inferred == ColumnType::Real && cell.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }
    inferred
}

fn csv_files_in(csv_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(csv_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load one CSV file into `table`, replacing any existing table of that name.
/// Returns the number of rows inserted.
pub fn load_csv_into_table(conn: &mut Connection, table: &str, csv_path: &Path) -> Result<usize> {
    let mut reader = ReaderBuilder::new().from_path(csv_path)?;

    let mut headers: Vec<String> = reader.byte_headers()?.iter().map(decode_cell).collect();
    if let Some(first) = headers.first_mut() {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    if headers.is_empty() {
        warn!("{} has no header row, skipping", csv_path.display());
        return Ok(0);
    }

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.byte_records() {
        records.push(record?.iter().map(decode_cell).collect());
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|idx| infer_column_type(&records, idx))
        .collect();

    let column_defs = headers
        .iter()
        .zip(&types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql_name()))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; headers.len()].join(", ");
    let quoted_table = quote_ident(table);

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted_table), [])?;
    tx.execute(&format!("CREATE TABLE {} ({})", quoted_table, column_defs), [])?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            quoted_table, placeholders
        ))?;
        for record in &records {
            let values: Vec<Value> = types
                .iter()
                .enumerate()
                .map(|(idx, ty)| record.get(idx).map_or(Value::Null, |cell| ty.convert(cell)))
                .collect();
            insert.execute(params_from_iter(values.iter()))?;
        }
    }
    tx.commit()?;

    Ok(records.len())
}

/// Create the database from `csv_dir` when `db_path` does not exist yet.
/// Returns `true` when a database was created. A failed load removes the
/// partial database file.
pub fn initialize_database(db_path: &Path, csv_dir: &Path) -> Result<bool> {
    if db_path.exists() {
        info!("Database {} already exists, skipping ingestion", db_path.display());
        return Ok(false);
    }

    let csv_files = csv_files_in(csv_dir)?;
    info!(
        "Creating database {} from {} CSV file(s)",
        db_path.display(),
        csv_files.len()
    );

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let load = || -> Result<()> {
        let mut conn = Connection::open(db_path)?;
        for csv_path in &csv_files {
            let table = csv_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let rows = load_csv_into_table(&mut conn, &table, csv_path)?;
            info!(table = %table, rows, "Loaded table");
        }
        Ok(())
    };

    if let Err(e) = load() {
        warn!("Ingestion failed, removing partial database: {}", e);
        let _ = fs::remove_file(db_path);
        return Err(e);
    }

    info!("Database creation complete");
    Ok(true)
}
