//! State passed between the agents, and the agent/route identifiers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use langgraph::{Message, Next, END};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisResults;
use crate::db::QueryResult;

/// The four agents. `id()` is the graph node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Supervisor,
    SqlAgent,
    Analyst,
    ReportWriter,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Supervisor,
        AgentKind::SqlAgent,
        AgentKind::Analyst,
        AgentKind::ReportWriter,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Supervisor => "supervisor",
            Self::SqlAgent => "sql_agent",
            Self::Analyst => "analyst",
            Self::ReportWriter => "report_writer",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Supervisor => "Supervisor",
            Self::SqlAgent => "SQL Agent",
            Self::Analyst => "Data Analyst",
            Self::ReportWriter => "Report Writer",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Supervisor => "🎯",
            Self::SqlAgent => "🗄️",
            Self::Analyst => "📊",
            Self::ReportWriter => "📝",
        }
    }
}

/// Where control goes after an agent finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Agent(AgentKind),
    End,
}

impl Route {
    /// Graph node id, `END` for [Route::End].
    pub fn node_id(self) -> &'static str {
        match self {
            Self::Agent(kind) => kind.id(),
            Self::End => END,
        }
    }

    pub fn to_next(self) -> Next {
        Next::to(self.node_id())
    }
}

impl From<AgentKind> for Route {
    fn from(kind: AgentKind) -> Self {
        Self::Agent(kind)
    }
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Agent(AgentKind),
}

impl Speaker {
    /// Role name shown in conversation history.
    pub fn role(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent(kind) => kind.id(),
        }
    }
}

/// One message with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub content: String,
}

/// Outcome of one SQL agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlResult {
    pub question: String,
    /// Last SQL tried; `None` when no query could be generated.
    pub sql: Option<String>,
    #[serde(flatten)]
    pub data: QueryResult,
    pub row_count: usize,
    /// Set when every attempt failed.
    pub error: Option<String>,
    pub attempts: usize,
    pub timestamp: DateTime<Utc>,
}

impl SqlResult {
    pub fn success(question: &str, sql: String, data: QueryResult, attempts: usize) -> Self {
        Self {
            question: question.to_string(),
            sql: Some(sql),
            row_count: data.row_count(),
            data,
            error: None,
            attempts,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(question: &str, sql: Option<String>, error: String, attempts: usize) -> Self {
        Self {
            question: question.to_string(),
            sql,
            data: QueryResult::default(),
            row_count: 0,
            error: Some(error),
            attempts,
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Shared state of one question's run through the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    /// Chat history as sent to the model.
    pub messages: Vec<Message>,
    /// Same messages, tagged with their author.
    pub transcript: Vec<TranscriptEntry>,
    pub current_agent: Option<AgentKind>,
    /// Free-form values shared between agents (database summary, etc.).
    pub context: BTreeMap<String, serde_json::Value>,
    pub sql_results: Vec<SqlResult>,
    pub analysis_results: Option<AnalysisResults>,
    pub next_agent: Option<Route>,
}

impl AgentState {
    /// State holding just the user's question.
    pub fn new(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            messages: vec![Message::user(question.clone())],
            transcript: vec![TranscriptEntry {
                speaker: Speaker::User,
                content: question,
            }],
            ..Default::default()
        }
    }

    /// Appends an agent message and marks `agent` as current.
    pub fn record(&mut self, agent: AgentKind, content: impl Into<String>) {
        let content = content.into();
        self.messages.push(Message::assistant(content.clone()));
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Agent(agent),
            content,
        });
        self.current_agent = Some(agent);
    }

    /// Records the message, stores the route and returns the graph step.
    pub fn finish(mut self, agent: AgentKind, content: impl Into<String>, route: Route) -> (Self, Next) {
        self.record(agent, content);
        self.next_agent = Some(route);
        (self, route.to_next())
    }

    /// Latest user message.
    pub fn latest_question(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::User(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn successful_sql_results(&self) -> impl Iterator<Item = &SqlResult> {
        self.sql_results.iter().filter(|r| r.is_success())
    }

    /// At least one SQL run succeeded.
    pub fn has_sql_results(&self) -> bool {
        self.successful_sql_results().next().is_some()
    }

    /// SQL ran at least once and never succeeded.
    pub fn sql_failed(&self) -> bool {
        !self.sql_results.is_empty() && !self.has_sql_results()
    }

    pub fn last_sql_error(&self) -> Option<&str> {
        self.sql_results.iter().rev().find_map(|r| r.error.as_deref())
    }

    /// The report writer has produced its message.
    pub fn report_written(&self) -> bool {
        self.transcript
            .iter()
            .any(|e| e.speaker == Speaker::Agent(AgentKind::ReportWriter))
    }

    /// Latest message written by `agent`.
    pub fn last_message_from(&self, agent: AgentKind) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|e| e.speaker == Speaker::Agent(agent))
            .map(|e| e.content.as_str())
    }

    /// Latest agent message of any kind.
    pub fn last_agent_message(&self) -> Option<&TranscriptEntry> {
        self.transcript
            .iter()
            .rev()
            .find(|e| matches!(e.speaker, Speaker::Agent(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(AgentKind::from_id("nobody"), None);
        assert_eq!(Route::End.node_id(), END);
    }

    #[test]
    fn record_tags_transcript_and_messages() {
        let mut state = AgentState::new("Which apps use most data?");
        state.record(AgentKind::Supervisor, "routing to SQL");
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.current_agent, Some(AgentKind::Supervisor));
        assert_eq!(state.transcript[1].speaker, Speaker::Agent(AgentKind::Supervisor));
        assert_eq!(state.latest_question(), Some("Which apps use most data?"));
        assert!(!state.report_written());
    }

    #[test]
    fn sql_failure_tracking() {
        let mut state = AgentState::new("q");
        assert!(!state.sql_failed());
        state
            .sql_results
            .push(SqlResult::failure("q", None, "no such column".into(), 3));
        assert!(state.sql_failed());
        assert_eq!(state.last_sql_error(), Some("no such column"));
        state.sql_results.push(SqlResult::success(
            "q",
            "SELECT 1".into(),
            QueryResult::default(),
            1,
        ));
        assert!(state.has_sql_results());
        assert!(!state.sql_failed());
    }

    #[test]
    fn finish_sets_route_and_next() {
        let (state, next) = AgentState::new("q").finish(
            AgentKind::SqlAgent,
            "done",
            Route::Agent(AgentKind::Analyst),
        );
        assert_eq!(state.next_agent, Some(Route::Agent(AgentKind::Analyst)));
        assert_eq!(next, Next::to("analyst"));
        let (_, next) = state.finish(AgentKind::ReportWriter, "r", Route::End);
        assert_eq!(next, Next::End);
    }
}
