//! Raw firewall log ingestion into the `logs` table.
//!
//! `line` turns one `key=value` log line into a [LogRecord]; `import` streams
//! whole files (raw logs or CSV exports) into a [crate::db::LogDatabase].

mod import;
mod line;
mod record;

pub use import::{dump, import_csv, import_log_file, ImportReport, BATCH_SIZE};
pub use line::{parse_line, ParseOptions, DEFAULT_APPCATS};
pub use record::{FieldValue, LogRecord, INTEGER_FIELDS, LOG_FIELDS};
