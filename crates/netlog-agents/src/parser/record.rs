//! One parsed log line: the retained fields plus a derived timestamp.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::Serialize;

/// Columns kept from a raw log line, in `logs` table order.
pub const LOG_FIELDS: [&str; 26] = [
    "date",
    "time",
    "eventtime",
    "logid",
    "srcip",
    "srcname",
    "srcport",
    "dstip",
    "dstport",
    "proto",
    "action",
    "policyname",
    "service",
    "transport",
    "appid",
    "app",
    "appcat",
    "apprisk",
    "duration",
    "sentbyte",
    "rcvdbyte",
    "sentpkt",
    "rcvdpkt",
    "shapersentname",
    "osname",
    "mastersrcmac",
];

/// Columns declared `INTEGER` in the `logs` schema; the rest are `TEXT`.
pub const INTEGER_FIELDS: [&str; 8] = [
    "srcport", "dstport", "proto", "duration", "sentbyte", "rcvdbyte", "sentpkt", "rcvdpkt",
];

/// A field value after type conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Digit-only values become integers, other float-parsable values become
    /// reals, everything else stays text.
    pub fn convert(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Self::Integer(n);
            }
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Self::Real(f),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Real(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Integer(n) => ToSqlOutput::Owned(Value::Integer(*n)),
            Self::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
        })
    }
}

/// Parsed log line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogRecord {
    pub fields: BTreeMap<&'static str, FieldValue>,
    /// `date` + `time`, when both are present and parse.
    pub timestamp: Option<NaiveDateTime>,
}

impl LogRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Values in `LOG_FIELDS` order, `None` for missing fields.
    pub fn values(&self) -> Vec<Option<&FieldValue>> {
        LOG_FIELDS.iter().map(|f| self.fields.get(f)).collect()
    }

    /// Timestamp as stored in the `timestamp` column.
    pub fn timestamp_text(&self) -> Option<String> {
        self.timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
