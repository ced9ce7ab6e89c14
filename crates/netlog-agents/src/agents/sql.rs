//! SQL Agent: turns the question into one read-only SQLite query and runs it.
//!
//! Failed queries are retried with the database error fed back to the model,
//! up to `max_iterations` attempts.

use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{AgentError, ChatMessage, ChatRequest, LlmClient, Next, Node};
use tracing::{debug, info, warn};

use super::state::{AgentKind, AgentState, Route, SqlResult};
use crate::db::LogDatabase;
use crate::productivity::DurationUnit;

/// Rows shown in the agent's message.
const PREVIEW_ROWS: usize = 10;

/// Question fragments that ask for analysis rather than a plain listing.
const ANALYSIS_KEYWORDS: [&str; 4] = ["analiz", "statyst", "analy", "statistic"];

fn system_prompt(unit: DurationUnit) -> String {
    let (seconds, note) = match unit {
        DurationUnit::Milliseconds => (
            "duration/1000.0",
            "duration is in MILLISECONDS: use duration/1000.0 for seconds, duration/1000.0/3600 for hours.",
        ),
        DurationUnit::Seconds => (
            "duration",
            "duration is in SECONDS: use duration/3600.0 for hours.",
        ),
    };
    format!(
        "You are an SQL expert for a SQLite database. You turn questions into SQL queries.

TABLE: logs

COLUMNS:
- date (TEXT): YYYY-MM-DD
- time (TEXT): HH:MM:SS
- timestamp (TEXT): YYYY-MM-DD HH:MM:SS
- srcname (TEXT): user / device name (e.g. \"Dawid-s-S23\", \"iPhone\")
- srcip, dstip (TEXT), srcport, dstport, proto (INTEGER)
- app (TEXT): application name (e.g. \"Facebook\", \"Instagram\", \"YouTube\")
- appcat (TEXT): category (Social.Media, Game, Video.Audio, Adult)
- apprisk (TEXT), action (TEXT), service (TEXT), osname (TEXT)
- duration (INTEGER): session length
- sentbyte, rcvdbyte, sentpkt, rcvdpkt (INTEGER): traffic

IMPORTANT: {note}

EXAMPLES:
- \"time spent on Facebook\" -> SELECT srcname, SUM({seconds}) AS seconds FROM logs WHERE app LIKE '%Facebook%' GROUP BY srcname
- \"who plays the most\" -> SELECT srcname, SUM({seconds})/3600 AS hours FROM logs WHERE appcat = 'Game' GROUP BY srcname ORDER BY hours DESC

Only SELECT (or WITH ... SELECT) statements are allowed.
Return ONLY the SQL query."
    )
}

/// Strips markdown fences and a trailing `;` from a model reply.
pub fn clean_sql(reply: &str) -> String {
    let text = reply.trim();
    let body = match text.find("```") {
        Some(start) => {
            let after = &text[start + 3..];
            let end = after.find("```").unwrap_or(after.len());
            let block = &after[..end];
            strip_language_tag(block)
        }
        None => text,
    };
    body.trim().trim_end_matches(';').trim().to_string()
}

/// Fence info strings dropped before the query, compared case-insensitively.
const FENCE_TAGS: [&str; 6] = ["sql", "sqlite", "sqlite3", "mysql", "postgresql", "postgres"];

fn strip_language_tag(block: &str) -> &str {
    let block = block.trim_start();
    let first = block.split_whitespace().next().unwrap_or_default();
    if FENCE_TAGS.iter().any(|t| first.eq_ignore_ascii_case(t)) {
        &block[first.len()..]
    } else {
        block
    }
}

/// SQL Agent node.
///
/// **Interaction**: Reads the latest user question from `AgentState`, pushes
/// one `SqlResult` per run.
pub struct SqlAgent {
    llm: Arc<dyn LlmClient>,
    db: LogDatabase,
    max_iterations: usize,
    temperature: f32,
    duration_unit: DurationUnit,
}

impl SqlAgent {
    pub fn new(llm: Arc<dyn LlmClient>, db: LogDatabase, max_iterations: usize, temperature: f32) -> Self {
        Self {
            llm,
            db,
            max_iterations: max_iterations.max(1),
            temperature,
            duration_unit: DurationUnit::Milliseconds,
        }
    }

    /// Unit the prompt tells the model `duration` is stored in.
    pub fn with_duration_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    /// Generates and runs SQL for `question`, retrying on errors.
    pub async fn answer(&self, question: &str) -> SqlResult {
        let mut request = ChatRequest::with_system(system_prompt(self.duration_unit), question)
            .temperature(self.temperature);
        let mut last_sql: Option<String> = None;
        let mut last_error = String::from("no query attempted");

        for attempt in 1..=self.max_iterations {
            let reply = match self.llm.chat(request.clone()).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(attempt, error = %e, "SQL generation failed");
                    return SqlResult::failure(question, last_sql, format!("LLM error: {e}"), attempt);
                }
            };
            let sql = clean_sql(&reply.content);
            debug!(attempt, sql = %sql, "executing generated SQL");

            match self.db.query(&sql).await {
                Ok(data) => {
                    info!(attempt, rows = data.row_count(), "SQL succeeded");
                    return SqlResult::success(question, sql, data, attempt);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "SQL failed");
                    last_error = e.to_string();
                    request = request
                        .push(ChatMessage::assistant(sql.clone()))
                        .push(ChatMessage::user(format!(
                            "That query failed with: {last_error}\nReturn a corrected SQLite query only."
                        )));
                    last_sql = Some(sql);
                }
            }
        }
        SqlResult::failure(question, last_sql, last_error, self.max_iterations)
    }
}

fn wants_analysis(question: &str) -> bool {
    let q = question.to_lowercase();
    ANALYSIS_KEYWORDS.iter().any(|k| q.contains(k))
}

#[async_trait]
impl Node<AgentState> for SqlAgent {
    fn id(&self) -> &str {
        AgentKind::SqlAgent.id()
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let Some(question) = state.latest_question().map(str::to_string) else {
            return Ok(state.finish(
                AgentKind::SqlAgent,
                "I did not find a question to run.",
                AgentKind::Supervisor.into(),
            ));
        };

        let result = self.answer(&question).await;
        let (route, message) = match (&result.error, &result.sql) {
            (None, Some(sql)) => {
                let route = if wants_analysis(&question) {
                    AgentKind::Analyst
                } else {
                    AgentKind::ReportWriter
                };
                let next_step = match route {
                    AgentKind::Analyst => "Passing on for analysis...",
                    _ => "Passing on to write the report...",
                };
                (
                    Route::Agent(route),
                    format!(
                        "Fetched data from the logs database ({} rows):\n```sql\n{}\n```\n{}\n{}",
                        result.row_count,
                        sql,
                        result.data.render_table(PREVIEW_ROWS),
                        next_step
                    ),
                )
            }
            (err, _) => (
                Route::Agent(AgentKind::Supervisor),
                format!(
                    "A problem occurred: {}",
                    err.as_deref().unwrap_or("no SQL generated")
                ),
            ),
        };

        let mut state = state;
        state.sql_results.push(result);
        Ok(state.finish(AgentKind::SqlAgent, message, route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_semicolons() {
        assert_eq!(clean_sql("```sql\nSELECT 1;\n```"), "SELECT 1");
        assert_eq!(clean_sql("  SELECT app FROM logs;  "), "SELECT app FROM logs");
        assert_eq!(
            clean_sql("Here you go:\n```\nSELECT COUNT(*) FROM logs\n```\nDone."),
            "SELECT COUNT(*) FROM logs"
        );
        assert_eq!(clean_sql("```SQLite\nSELECT app FROM logs;\n```"), "SELECT app FROM logs");
        assert_eq!(clean_sql("```Sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn prompt_follows_duration_unit() {
        assert!(system_prompt(DurationUnit::Milliseconds).contains("MILLISECONDS"));
        assert!(system_prompt(DurationUnit::Seconds).contains("duration/3600.0"));
    }

    #[test]
    fn analysis_wording() {
        assert!(wants_analysis("Analyze trends in network usage"));
        assert!(wants_analysis("Pokaż statystyki"));
        assert!(!wants_analysis("Which applications use the most data?"));
    }
}
