//! The `logs` database: schema, location, stats and read-only queries.
//!
//! Keeps only the file path and opens a connection per operation. Async
//! methods run the SQLite work on `spawn_blocking`.
//!
//! **Interaction**: Filled by `parser`; queried by the SQL agent, the doctor
//! and `netlog stats`. `history::RunStore` shares the same file.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::{self, FieldValue, LogRecord, INTEGER_FIELDS, LOG_FIELDS};
use crate::productivity::DurationUnit;

/// File name used when a database is built from a CSV export.
pub const DEFAULT_DB_FILE: &str = "logs.db";

/// Summary of the `logs` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub total_rows: i64,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    /// Distinct `srcname`.
    pub unique_users: i64,
    pub unique_apps: i64,
    pub db_path: String,
}

impl DatabaseStats {
    /// Date range as `min - max`, or `unknown`.
    pub fn date_range(&self) -> String {
        match (&self.min_date, &self.max_date) {
            (Some(min), Some(max)) => format!("{min} - {max}"),
            _ => "unknown".to_string(),
        }
    }

    /// Short description used in agent prompts.
    pub fn describe(&self) -> String {
        format!(
            "{} records, dates {}, {} users, {} applications",
            self.total_rows,
            self.date_range(),
            self.unique_users,
            self.unique_apps
        )
    }
}

/// Column names and rows of a query, cells as JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Numeric cells of column `idx`, skipping NULL and text.
    pub fn numeric_column(&self, idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.get(idx).and_then(Value::as_f64))
            .collect()
    }

    /// Plain-text table with at most `max_rows` rows, then `... and K more rows`.
    pub fn render_table(&self, max_rows: usize) -> String {
        if self.columns.is_empty() {
            return "(no columns)".to_string();
        }
        let mut out = self.columns.join(" | ");
        out.push('\n');
        out.push_str(
            &self
                .columns
                .iter()
                .map(|c| "-".repeat(c.chars().count().max(3)))
                .collect::<Vec<_>>()
                .join("-|-"),
        );
        out.push('\n');
        for row in self.rows.iter().take(max_rows) {
            let cells: Vec<String> = row.iter().map(display_cell).collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        if self.rows.len() > max_rows {
            out.push_str(&format!("... and {} more rows\n", self.rows.len() - max_rows));
        }
        if self.rows.is_empty() {
            out.push_str("(no rows)\n");
        }
        out
    }
}

/// Renders one cell the way it appears in tables and reports.
pub fn display_cell(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Positive `duration` values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationProfile {
    pub max: f64,
    pub avg: f64,
    pub min: f64,
    pub count: i64,
    pub unit: DurationUnit,
}

impl DurationProfile {
    pub fn total_seconds(&self) -> f64 {
        self.unit.to_seconds(self.avg * self.count as f64)
    }
}

/// One row of `top_apps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppUsage {
    pub app: String,
    pub sessions: i64,
    pub total_duration: i64,
}

/// Column of the `logs` table as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
}

/// Handle to a logs database file.
#[derive(Debug, Clone)]
pub struct LogDatabase {
    path: PathBuf,
}

impl LogDatabase {
    /// Opens (or creates) the database and ensures the `logs` table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(&create_table_sql())?;
        debug!(path = %path.display(), "logs database opened");
        Ok(Self { path })
    }

    /// Finds the database to use, building one from a CSV export if needed.
    ///
    /// Order: `config.db_path`, then the first existing search path, then a
    /// `*.csv` in the working directory whose name contains `logi`.
    pub fn locate(config: &Config) -> Result<Self> {
        Self::locate_in(config, Path::new("."))
    }

    /// Like [LogDatabase::locate] with `dir` as the working directory for the
    /// CSV fallback.
    pub fn locate_in(config: &Config, dir: &Path) -> Result<Self> {
        if let Some(path) = &config.db_path {
            return Self::open(path);
        }
        if let Some(found) = config.db_search_paths.iter().find(|p| p.is_file()) {
            info!(path = %found.display(), "using logs database");
            return Self::open(found);
        }
        if let Some(csv_path) = find_logs_csv(dir)? {
            let db_path = dir.join(DEFAULT_DB_FILE);
            info!(
                csv = %csv_path.display(),
                db = %db_path.display(),
                "no database found, building one from CSV"
            );
            let db = Self::open(&db_path)?;
            parser::import_csv(&csv_path, &db)?;
            return Ok(db);
        }
        let searched = config
            .db_search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::DatabaseNotFound { searched })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A new read-write connection.
    pub fn connection(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    fn read_only_connection(&self) -> Result<Connection> {
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }

    /// Runs `f` with a fresh read-only connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.read_only_connection()?;
            f(&conn)
        })
        .await?
    }

    /// Inserts parsed records in one transaction; returns how many.
    pub fn insert_records(&self, records: &[LogRecord]) -> Result<usize> {
        let mut conn = self.connection()?;
        Self::insert_records_with(&mut conn, records)
    }

    pub(crate) fn insert_records_with(conn: &mut Connection, records: &[LogRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT INTO logs ({}, timestamp) VALUES ({})",
            LOG_FIELDS.join(", "),
            vec!["?"; LOG_FIELDS.len() + 1].join(", ")
        );
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for rec in records {
                let mut values: Vec<Option<FieldValue>> =
                    rec.values().into_iter().map(|v| v.cloned()).collect();
                values.push(rec.timestamp_text().map(FieldValue::Text));
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Column names of `logs`, in table order.
    pub fn column_names(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        Ok(schema_with(&conn)?.into_iter().map(|c| c.name).collect())
    }

    pub async fn table_schema(&self) -> Result<Vec<ColumnInfo>> {
        self.with_conn(schema_with).await
    }

    /// Whether the `logs` table exists.
    pub async fn has_logs_table(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'logs'",
                [],
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
        .await
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        let db_path = self.path.display().to_string();
        self.with_conn(move |conn| {
            let total_rows: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |r| r.get(0))?;
            let (min_date, max_date): (Option<String>, Option<String>) = conn.query_row(
                "SELECT MIN(date), MAX(date) FROM logs",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            let unique_users: i64 =
                conn.query_row("SELECT COUNT(DISTINCT srcname) FROM logs", [], |r| r.get(0))?;
            let unique_apps: i64 =
                conn.query_row("SELECT COUNT(DISTINCT app) FROM logs", [], |r| r.get(0))?;
            Ok(DatabaseStats {
                total_rows,
                min_date,
                max_date,
                unique_users,
                unique_apps,
                db_path,
            })
        })
        .await
    }

    /// Executes one read-only statement (`SELECT` / `WITH`).
    ///
    /// Anything else fails with `Error::ReadOnlyViolation` before touching
    /// the database; the connection itself is opened read-only as well.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        let sql = ensure_read_only(sql)?;
        self.with_conn(move |conn| query_with(conn, &sql)).await
    }

    /// Max/avg/min/count of positive durations; `None` when there are none.
    pub async fn duration_profile(&self) -> Result<Option<DurationProfile>> {
        self.with_conn(|conn| {
            let row: (Option<f64>, Option<f64>, Option<f64>, i64) = conn.query_row(
                "SELECT MAX(duration), AVG(duration), MIN(duration), COUNT(duration) \
                 FROM logs WHERE duration > 0",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )?;
            Ok(match row {
                (Some(max), Some(avg), Some(min), count) if count > 0 => Some(DurationProfile {
                    max,
                    avg,
                    min,
                    count,
                    unit: DurationUnit::detect(avg),
                }),
                _ => None,
            })
        })
        .await
    }

    /// The `n` applications with the largest total duration.
    pub async fn top_apps(&self, n: usize) -> Result<Vec<AppUsage>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT app, COUNT(*) AS sessions, COALESCE(SUM(duration), 0) AS total_duration \
                 FROM logs WHERE app IS NOT NULL \
                 GROUP BY app ORDER BY total_duration DESC, sessions DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![n as i64], |r| {
                Ok(AppUsage {
                    app: r.get(0)?,
                    sessions: r.get(1)?,
                    total_duration: r.get(2)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    pub async fn sample_rows(&self, n: usize) -> Result<QueryResult> {
        self.with_conn(move |conn| {
            query_with(conn, &format!("SELECT * FROM logs LIMIT {n}"))
        })
        .await
    }
}

fn create_table_sql() -> String {
    let columns: Vec<String> = LOG_FIELDS
        .iter()
        .map(|f| {
            let ty = if INTEGER_FIELDS.contains(f) { "INTEGER" } else { "TEXT" };
            format!("    {f} {ty}")
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS logs (\n{},\n    timestamp TEXT\n)",
        columns.join(",\n")
    )
}

fn schema_with(conn: &Connection) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare("PRAGMA table_info(logs)")?;
    let rows = stmt.query_map([], |r| {
        Ok(ColumnInfo {
            name: r.get(1)?,
            sql_type: r.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_with(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(Error::ReadOnlyViolation(sql.to_string()));
    }
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            cells.push(json_cell(row.get_ref(i)?));
        }
        out.push(cells);
    }
    Ok(QueryResult { columns, rows: out })
}

fn json_cell(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

/// Drops comments, trims trailing `;` and checks the text is a single `SELECT` / `WITH`.
pub fn ensure_read_only(sql: &str) -> Result<String> {
    let code = strip_comments(sql);
    let trimmed = code.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if !(first == "SELECT" || first == "WITH") || has_statement_separator(trimmed) {
        return Err(Error::ReadOnlyViolation(sql.trim().to_string()));
    }
    Ok(trimmed.to_string())
}

/// `sql` without `--` and `/* */` comments; string literals are kept intact.
fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), _) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '-') if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            (None, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            (None, _) => out.push(c),
        }
    }
    out
}

/// `;` outside of string literals.
fn has_statement_separator(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => return true,
            _ => {}
        }
    }
    false
}

fn find_logs_csv(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            let is_csv = p
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            is_csv && name.contains("logi")
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}
