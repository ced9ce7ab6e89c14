//! File import (raw logs, CSV) and CSV-style dump of the `logs` table.
//!
//! All functions here block; async callers wrap them in `spawn_blocking`.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use rayon::prelude::*;
use rusqlite::types::ValueRef;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::LogDatabase;
use crate::error::Result;

use super::line::{parse_line, ParseOptions};
use super::record::LogRecord;

/// Lines parsed and inserted per transaction.
pub const BATCH_SIZE: usize = 1000;

/// Outcome of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Non-empty lines (raw logs) or data rows (CSV) seen.
    pub lines_read: usize,
    pub imported: usize,
    /// Lines dropped by the `appcat` filter or without an `appcat`.
    pub skipped: usize,
}

/// Imports a raw `key=value` log file into `db`.
///
/// Lines are read in batches of [BATCH_SIZE]; each batch is parsed in
/// parallel and inserted in one transaction.
pub fn import_log_file(
    path: &Path,
    db: &LogDatabase,
    options: &ParseOptions,
) -> Result<ImportReport> {
    let reader = BufReader::new(File::open(path)?);
    let mut conn = db.connection()?;
    let mut report = ImportReport::default();
    let mut batch: Vec<String> = Vec::with_capacity(BATCH_SIZE);

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        batch.push(line.to_string());
        if batch.len() >= BATCH_SIZE {
            flush_batch(&mut conn, &batch, options, &mut report)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        flush_batch(&mut conn, &batch, options, &mut report)?;
    }

    info!(
        path = %path.display(),
        lines = report.lines_read,
        imported = report.imported,
        skipped = report.skipped,
        "log import finished"
    );
    Ok(report)
}

fn flush_batch(
    conn: &mut rusqlite::Connection,
    batch: &[String],
    options: &ParseOptions,
    report: &mut ImportReport,
) -> Result<()> {
    let records: Vec<LogRecord> = batch
        .par_iter()
        .filter_map(|line| parse_line(line, options))
        .collect();
    let inserted = LogDatabase::insert_records_with(conn, &records)?;
    report.lines_read += batch.len();
    report.imported += inserted;
    report.skipped += batch.len() - records.len();
    debug!(batch = batch.len(), inserted, "batch imported");
    Ok(())
}

/// Imports a CSV export with a header row into `db`.
///
/// Empty cells become NULL. Headers that are not `logs` columns are ignored.
pub fn import_csv(path: &Path, db: &LogDatabase) -> Result<ImportReport> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let known = db.column_names()?;

    let mut keep: Vec<(usize, String)> = Vec::new();
    for (i, h) in headers.iter().enumerate() {
        let name = h.trim();
        if known.iter().any(|k| k == name) {
            keep.push((i, name.to_string()));
        } else {
            warn!(column = name, "CSV column not in logs table, ignored");
        }
    }
    let mut report = ImportReport::default();
    if keep.is_empty() {
        warn!(path = %path.display(), "CSV has no columns matching the logs table");
        return Ok(report);
    }

    let columns: Vec<&str> = keep.iter().map(|(_, n)| n.as_str()).collect();
    let sql = format!(
        "INSERT INTO logs ({}) VALUES ({})",
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let mut conn = db.connection()?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for row in reader.records() {
            let row = row?;
            report.lines_read += 1;
            let values: Vec<Option<&str>> = keep
                .iter()
                .map(|(i, _)| row.get(*i).filter(|v| !v.is_empty()))
                .collect();
            stmt.execute(rusqlite::params_from_iter(values))?;
            report.imported += 1;
        }
    }
    tx.commit()?;

    info!(path = %path.display(), rows = report.imported, "CSV import finished");
    Ok(report)
}

/// Writes column names, then every row of `logs`, comma-separated.
pub fn dump(db: &LogDatabase, out: &mut impl Write) -> Result<usize> {
    let conn = db.connection()?;
    let columns = db.column_names()?;
    writeln!(out, "{}", columns.join(", "))?;

    let mut stmt = conn.prepare("SELECT * FROM logs")?;
    let mut rows = stmt.query([])?;
    let mut count = 0usize;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            cells.push(match row.get_ref(i)? {
                ValueRef::Null => "None".to_string(),
                ValueRef::Integer(n) => n.to_string(),
                ValueRef::Real(f) => f.to_string(),
                ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
                ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
            });
        }
        writeln!(out, "{}", cells.join(", "))?;
        count += 1;
    }
    Ok(count)
}
