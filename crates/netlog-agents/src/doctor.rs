//! Setup diagnostics: environment, database contents, and an optional live
//! run through the agents.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::config::{ApiKeyStatus, Config};
use crate::db::{display_cell, LogDatabase};
use crate::system::MultiAgentSystem;

/// Question used by the live agent check.
pub const TEST_QUERY: &str = "Show me the 5 most used applications";

/// Outcome of one check, with the lines to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub name: &'static str,
    pub passed: bool,
    pub lines: Vec<String>,
}

impl CheckReport {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            passed: true,
            lines: Vec::new(),
        }
    }

    fn ok(&mut self, line: impl Into<String>) {
        self.lines.push(format!("✅ {}", line.into()));
    }

    fn info(&mut self, line: impl Into<String>) {
        self.lines.push(format!("   {}", line.into()));
    }

    fn fail(mut self, line: impl Into<String>) -> Self {
        self.lines.push(format!("❌ {}", line.into()));
        self.passed = false;
        self
    }
}

/// All checks that were run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<CheckReport>,
}

impl DoctorReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Every check's lines followed by a summary.
    pub fn render(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = String::new();
        for check in &self.checks {
            let _ = writeln!(out, "{rule}\n🔍 {}", check.name);
            for line in &check.lines {
                let _ = writeln!(out, "{line}");
            }
        }
        let _ = writeln!(out, "{rule}\n📊 SUMMARY\n{rule}");
        for check in &self.checks {
            let status = if check.passed { "✅ OK" } else { "❌ FAILED" };
            let _ = writeln!(out, "{}: {}", check.name, status);
        }
        if self.passed() {
            let _ = writeln!(out, "\n✅ Everything works. Try: netlog ask \"{TEST_QUERY}\"");
        } else {
            let _ = writeln!(out, "\n❌ Problems found, fix them before running the agents");
        }
        out
    }
}

/// `.env` present and a real API key configured.
pub fn check_env(env_file: &Path, config: &Config) -> CheckReport {
    let mut report = CheckReport::new("Environment");
    if env_file.is_file() {
        report.ok(format!("{} exists", env_file.display()));
    } else {
        report.info(format!(
            "{} not found (run `netlog setup`); using process environment",
            env_file.display()
        ));
    }
    match config.api_key_status() {
        ApiKeyStatus::Present => {
            report.ok("API key configured");
            report
        }
        ApiKeyStatus::Placeholder => {
            report.fail("API key is still the placeholder; set OPENAI_API_KEY_TEG=sk-...")
        }
        ApiKeyStatus::Missing => report.fail("no API key; set OPENAI_API_KEY_TEG=sk-..."),
    }
}

/// Database found, `logs` table present and non-empty, plus a short profile.
pub async fn check_database(config: &Config) -> CheckReport {
    let report = CheckReport::new("Database");
    let db = match LogDatabase::locate(config) {
        Ok(db) => db,
        Err(e) => return report.fail(e.to_string()),
    };
    inspect_database(&db, report).await
}

async fn inspect_database(db: &LogDatabase, mut report: CheckReport) -> CheckReport {
    report.ok(format!("found database: {}", db.path().display()));
    match db.has_logs_table().await {
        Ok(true) => report.ok("table 'logs' exists"),
        Ok(false) => return report.fail("no 'logs' table in the database"),
        Err(e) => return report.fail(format!("cannot read database: {e}")),
    }
    let stats = match db.stats().await {
        Ok(stats) => stats,
        Err(e) => return report.fail(format!("cannot read stats: {e}")),
    };
    report.ok(format!("records: {}", stats.total_rows));
    if stats.total_rows == 0 {
        return report.fail("the 'logs' table is empty");
    }

    if let Ok(schema) = db.table_schema().await {
        let columns: Vec<String> = schema
            .iter()
            .map(|c| format!("{} ({})", c.name, c.sql_type))
            .collect();
        report.ok(format!("columns: {}", columns.join(", ")));
    }
    if let Ok(sample) = db.sample_rows(3).await {
        report.info("sample rows:");
        for row in &sample.rows {
            let cells: Vec<String> = row.iter().map(display_cell).collect();
            report.info(format!("  {}", cells.join(", ")));
        }
    }
    report.info(format!("users: {}", stats.unique_users));
    report.info(format!("applications: {}", stats.unique_apps));
    report.info(format!("dates: {}", stats.date_range()));

    let unit = match db.duration_profile().await {
        Ok(Some(profile)) => {
            report.info(format!(
                "duration: max {:.0}, avg {:.0}, min {:.0} ({})",
                profile.max,
                profile.avg,
                profile.min,
                profile.unit.as_str()
            ));
            Some(profile.unit)
        }
        _ => None,
    };
    if let Ok(apps) = db.top_apps(5).await {
        report.info("🏆 top 5 applications:");
        for app in apps {
            let time = match unit {
                Some(u) => format!("{:.0} s", u.to_seconds(app.total_duration as f64)),
                None => format!("{} duration", app.total_duration),
            };
            report.info(format!("  {}: {} sessions, {}", app.app, app.sessions, time));
        }
    }
    report
}

/// Runs [TEST_QUERY] through the agents.
pub async fn check_agents(system: &MultiAgentSystem) -> CheckReport {
    let mut report = CheckReport::new("Agents");
    report.ok("system created");
    report.info(format!("test query: {TEST_QUERY}"));
    match system.process(TEST_QUERY).await {
        Ok(state) => {
            let answer = MultiAgentSystem::final_answer(&state);
            let preview: String = answer.chars().take(200).collect();
            report.ok("system answered");
            report.info(format!("answer: {preview}..."));
            report
        }
        Err(e) => report.fail(format!("agent run failed: {e}")),
    }
}
