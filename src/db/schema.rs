//! Schema provider: renders the store's table definitions for prompts

use crate::error::Result;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

fn open_read_only(db_path: &Path) -> Result<Connection> {
    Ok(Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY rowid")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Every table as `"\n-- <name>\n<CREATE statement>\n"`, in catalogue order.
pub fn load_schema(db_path: &Path) -> Result<String> {
    let conn = open_read_only(db_path)?;
    let mut stmt =
        conn.prepare("SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY rowid")?;

    let mut schema_text = String::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let sql: Option<String> = row.get(1)?;
        schema_text.push_str(&format!("\n-- {}\n{}\n", name, sql.unwrap_or_default()));
    }

    Ok(schema_text)
}

/// Row count per table, in catalogue order.
pub fn table_row_counts(db_path: &Path) -> Result<Vec<(String, i64)>> {
    let conn = open_read_only(db_path)?;
    let mut counts = Vec::new();

    for table in table_names(&conn)? {
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&table)),
            [],
            |row| row.get(0),
        )?;
        counts.push((table, count));
    }

    Ok(counts)
}
