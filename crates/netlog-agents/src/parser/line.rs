//! `key=value` log line parsing and the `appcat` filter.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::record::{FieldValue, LogRecord, LOG_FIELDS};

/// Application categories imported by default.
pub const DEFAULT_APPCATS: [&str; 4] = ["Social.Media", "Video.Audio", "Game", "Adult"];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

/// Which lines to keep.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Lines whose `appcat` is not in this set are dropped. Empty keeps every
    /// line that has an `appcat`.
    pub allowed_appcats: HashSet<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allowed_appcats: DEFAULT_APPCATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ParseOptions {
    pub fn all_categories() -> Self {
        Self {
            allowed_appcats: HashSet::new(),
        }
    }

    fn accepts(&self, appcat: &FieldValue) -> bool {
        self.allowed_appcats.is_empty() || self.allowed_appcats.contains(&appcat.as_text())
    }
}

fn pair_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)=("[^"]*"|\S+)"#).expect("static regex"))
}

/// Parses one raw log line.
///
/// Returns `None` when `appcat` is missing or filtered out.
pub fn parse_line(line: &str, options: &ParseOptions) -> Option<LogRecord> {
    let mut fields = BTreeMap::new();
    for caps in pair_regex().captures_iter(line) {
        let key = &caps[1];
        let Some(field) = LOG_FIELDS.iter().find(|f| **f == key) else {
            continue;
        };
        let clean = caps[2].trim_matches('"');
        fields.insert(*field, FieldValue::convert(clean));
    }

    let appcat = fields.get("appcat")?;
    if !options.accepts(appcat) {
        return None;
    }

    let timestamp = match (fields.get("date"), fields.get("time")) {
        (Some(d), Some(t)) => parse_timestamp(&d.as_text(), &t.as_text()),
        _ => None,
    };
    Some(LogRecord { fields, timestamp })
}

fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let joined = format!("{date} {time}");
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"date=2024-05-01 time=10:15:30 eventtime=1714551330 logid="0000000013" srcip=10.0.0.5 srcname="jan-laptop" srcport=51514 dstip=157.240.1.35 dstport=443 proto=6 action="accept" policyname="LAN-WAN" service="HTTPS" app="Facebook" appcat="Social.Media" apprisk="medium" duration=125 sentbyte=2048 rcvdbyte=40960 devname="fw01" osname="Windows""#;

    #[test]
    fn keeps_known_fields_and_converts_types() {
        let rec = parse_line(LINE, &ParseOptions::default()).unwrap();
        assert_eq!(rec.get("srcname"), Some(&FieldValue::Text("jan-laptop".into())));
        assert_eq!(rec.get("dstport"), Some(&FieldValue::Integer(443)));
        assert_eq!(rec.get("logid"), Some(&FieldValue::Integer(13)));
        assert_eq!(rec.get("srcip"), Some(&FieldValue::Text("10.0.0.5".into())));
        assert!(rec.get("devname").is_none());
        assert_eq!(rec.timestamp_text().as_deref(), Some("2024-05-01 10:15:30"));
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let rec = parse_line(
            r#"appcat="Game" app="Steam Client" date=2024-05-01"#,
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(rec.get("app"), Some(&FieldValue::Text("Steam Client".into())));
        assert!(rec.timestamp.is_none());
    }

    #[test]
    fn filters_on_appcat() {
        let line = r#"app="Office365" appcat="Collaboration" duration=10"#;
        assert!(parse_line(line, &ParseOptions::default()).is_none());
        assert!(parse_line(line, &ParseOptions::all_categories()).is_some());
        assert!(parse_line("app=x duration=1", &ParseOptions::all_categories()).is_none());
    }
}
