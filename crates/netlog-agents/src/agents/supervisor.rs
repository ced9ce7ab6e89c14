//! Supervisor: decides which agent runs next.
//!
//! Routing is rule-based; the model is consulted only when no rule applies.

use std::sync::Arc;

use async_trait::async_trait;
use langgraph::{AgentError, ChatMessage, ChatRequest, LlmClient, Next, Node};
use tracing::{debug, info};

use super::state::{AgentKind, AgentState, Route};

/// Question fragments that mean "this needs data from the database".
pub const DATA_KEYWORDS: [&str; 16] = [
    "raport",
    "analiz",
    "statyst",
    "pokaż",
    "wykorzyst",
    "aktywn",
    "użytkown",
    "aplikacj",
    "report",
    "analy",
    "statistic",
    "show",
    "usage",
    "activity",
    "user",
    "application",
];

const SYSTEM_PROMPT: &str = "You are the supervisor of a team of agents analysing network traffic logs.

DATABASE CONTEXT:
The `logs` table holds network activity:
- date, time: when the activity happened
- srcname: user / device name
- app: application name (Facebook, Teams, YouTube, ...)
- appcat: application category (Social.Media, Video.Audio, Game, ...)
- duration: session length
- sentbyte / rcvdbyte: data transferred

YOUR AGENTS:
1. SQL Agent: ALWAYS first whenever any data from the database is needed
2. Data Analyst: analyses data fetched by the SQL Agent, computes statistics
3. Report Writer: writes reports ONLY from SQL data and analysis

RULES:
- Start with the SQL Agent when the user asks about data, reports or analyses
- Never route to the Report Writer before data has been fetched
- For reports, analyses and statistics the order is SQL -> Analyst -> Report Writer

Answer with the name of the next agent (sql, analyst, report) or, when no agent is needed, answer the user directly.";

/// Outcome of a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A rule applied.
    Route(Route, String),
    /// No rule applied; ask the model.
    AskModel,
}

/// Rule-based routing. Rules are tried in order:
///
/// 1. report written → end
/// 2. SQL attempted, every attempt failed → end with the last error
/// 3. no SQL data and the question needs data → SQL agent
/// 4. SQL data, no analysis → analyst
/// 5. SQL data and analysis → report writer
pub fn decide(state: &AgentState) -> Decision {
    if state.report_written() {
        return Decision::Route(Route::End, "The report has been created. Finishing.".into());
    }
    if state.sql_failed() {
        let err = state.last_sql_error().unwrap_or("unknown error");
        return Decision::Route(
            Route::End,
            format!("Could not fetch data from the logs database: {err}"),
        );
    }
    let has_data = state.has_sql_results();
    let question = state.latest_question().unwrap_or_default().to_lowercase();
    if !has_data && needs_data(&question) {
        return Decision::Route(
            AgentKind::SqlAgent.into(),
            "This needs data from the network logs. Handing over to the SQL Agent.".into(),
        );
    }
    match (has_data, state.analysis_results.is_some()) {
        (true, false) => Decision::Route(
            AgentKind::Analyst.into(),
            "Data is available. Handing it to the Data Analyst.".into(),
        ),
        (true, true) => Decision::Route(
            AgentKind::ReportWriter.into(),
            "Data fetched and analysed. Handing over to the Report Writer.".into(),
        ),
        _ => Decision::AskModel,
    }
}

pub fn needs_data(question: &str) -> bool {
    let q = question.to_lowercase();
    DATA_KEYWORDS.iter().any(|k| q.contains(k))
}

/// Routes on the model's free-text reply.
pub fn route_from_reply(reply: &str, has_data: bool) -> (Route, String) {
    let lower = reply.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if mentions(&["sql", "data", "database", "dane", "baz"]) {
        (AgentKind::SqlAgent.into(), reply.to_string())
    } else if mentions(&["analy", "analiz", "statistic", "statyst"]) {
        (AgentKind::Analyst.into(), reply.to_string())
    } else if mentions(&["report", "summary", "raport", "podsumow"]) {
        if has_data {
            (AgentKind::ReportWriter.into(), reply.to_string())
        } else {
            (
                AgentKind::SqlAgent.into(),
                "A report needs data first. Handing over to the SQL Agent.".to_string(),
            )
        }
    } else {
        (Route::End, reply.to_string())
    }
}

/// Supervisor node.
///
/// **Interaction**: Entry point of the graph built by `graph_builder`.
pub struct SupervisorAgent {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
}

impl SupervisorAgent {
    pub fn new(llm: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    fn request(&self, state: &AgentState) -> ChatRequest {
        let context = serde_json::to_string(&state.context).unwrap_or_default();
        let system = format!(
            "{SYSTEM_PROMPT}\n\nCurrent context: {context}\nSQL results available: {}",
            state.has_sql_results()
        );
        ChatRequest::from_history(system, &state.messages)
            .push(ChatMessage::user("Decide which agent should handle this next."))
            .temperature(self.temperature)
    }
}

#[async_trait]
impl Node<AgentState> for SupervisorAgent {
    fn id(&self) -> &str {
        AgentKind::Supervisor.id()
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let (route, message) = match decide(&state) {
            Decision::Route(route, message) => (route, message),
            Decision::AskModel => {
                debug!("no routing rule applied, asking the model");
                let reply = self
                    .llm
                    .chat(self.request(&state))
                    .await
                    .map_err(|e| AgentError::ExecutionFailed(format!("supervisor: {e}")))?;
                route_from_reply(&reply.content, state.has_sql_results())
            }
        };
        info!(next = route.node_id(), "supervisor routed");
        Ok(state.finish(AgentKind::Supervisor, message, route))
    }
}

#[cfg(test)]
mod tests {
    use langgraph::MockLlmClient;

    use super::*;
    use crate::agents::state::SqlResult;
    use crate::db::QueryResult;

    fn with_data(question: &str) -> AgentState {
        let mut state = AgentState::new(question);
        state.sql_results.push(SqlResult::success(
            question,
            "SELECT 1".into(),
            QueryResult::default(),
            1,
        ));
        state
    }

    #[test]
    fn data_question_goes_to_sql_first() {
        let state = AgentState::new("Show me the 5 most used applications");
        assert!(matches!(
            decide(&state),
            Decision::Route(Route::Agent(AgentKind::SqlAgent), _)
        ));
        let state = AgentState::new("Pokaż raport aktywności");
        assert!(matches!(
            decide(&state),
            Decision::Route(Route::Agent(AgentKind::SqlAgent), _)
        ));
    }

    #[test]
    fn data_then_analysis_then_report_then_end() {
        let mut state = with_data("Which apps?");
        assert!(matches!(
            decide(&state),
            Decision::Route(Route::Agent(AgentKind::Analyst), _)
        ));
        state.analysis_results = Some(crate::agents::analysis::AnalysisResults {
            model: Default::default(),
            statistics: Default::default(),
            analysis: Some("ok".into()),
            data_points: 1,
            data_completeness: 1.0,
            processing_time_ms: 0,
            timestamp: chrono::Utc::now(),
        });
        assert!(matches!(
            decide(&state),
            Decision::Route(Route::Agent(AgentKind::ReportWriter), _)
        ));
        state.record(AgentKind::ReportWriter, "# Report");
        assert!(matches!(decide(&state), Decision::Route(Route::End, _)));
    }

    #[test]
    fn failed_sql_ends_with_error() {
        let mut state = AgentState::new("Show users");
        state
            .sql_results
            .push(SqlResult::failure("Show users", None, "no such table: logs".into(), 10));
        match decide(&state) {
            Decision::Route(Route::End, msg) => assert!(msg.contains("no such table")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn small_talk_asks_the_model() {
        assert_eq!(decide(&AgentState::new("hello there")), Decision::AskModel);
    }

    #[test]
    fn reply_routing() {
        assert_eq!(route_from_reply("Use the SQL agent", false).0, Route::Agent(AgentKind::SqlAgent));
        assert_eq!(route_from_reply("needs analysis", true).0, Route::Agent(AgentKind::Analyst));
        assert_eq!(route_from_reply("write a report", false).0, Route::Agent(AgentKind::SqlAgent));
        assert_eq!(route_from_reply("write a report", true).0, Route::Agent(AgentKind::ReportWriter));
        assert_eq!(route_from_reply("Hi! How can I help?", false).0, Route::End);
    }

    #[tokio::test]
    async fn fallback_reply_becomes_the_answer() {
        let llm = Arc::new(MockLlmClient::new("Hello! Ask me about network usage."));
        let agent = SupervisorAgent::new(llm.clone(), 0.0);
        let (state, next) = agent.run(AgentState::new("hello there")).await.unwrap();
        assert_eq!(next, Next::End);
        assert_eq!(
            state.last_message_from(AgentKind::Supervisor),
            Some("Hello! Ask me about network usage.")
        );
        assert_eq!(llm.call_count(), 1);
        let req = &llm.requests()[0];
        assert!(req.messages[0].content.contains("SQL results available: false"));
    }

    #[tokio::test]
    async fn rule_routing_does_not_call_the_model() {
        let llm = Arc::new(MockLlmClient::new("unused"));
        let agent = SupervisorAgent::new(llm.clone(), 0.0);
        let (_, next) = agent
            .run(AgentState::new("Show application usage"))
            .await
            .unwrap();
        assert_eq!(next, Next::to("sql_agent"));
        assert_eq!(llm.call_count(), 0);
    }
}
