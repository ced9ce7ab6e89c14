//! Wires the four agents into a state graph.
//!
//! Entry is the supervisor; every transition is a conditional edge, so a
//! route an agent is not allowed to take fails the run.

use std::sync::Arc;

use langgraph::{CompiledStateGraph, LlmClient, StateGraph, END};

use crate::agents::{AgentKind, AgentState, AnalystAgent, ReportWriterAgent, SqlAgent, SupervisorAgent};
use crate::config::Config;
use crate::db::LogDatabase;
use crate::error::Result;
use crate::productivity::DurationUnit;

/// Allowed targets per agent.
pub fn routes(from: AgentKind) -> Vec<&'static str> {
    let (supervisor, sql, analyst, report) = (
        AgentKind::Supervisor.id(),
        AgentKind::SqlAgent.id(),
        AgentKind::Analyst.id(),
        AgentKind::ReportWriter.id(),
    );
    match from {
        AgentKind::Supervisor => vec![sql, analyst, report, END],
        AgentKind::SqlAgent => vec![supervisor, analyst, report, END],
        AgentKind::Analyst => vec![supervisor, sql, report, END],
        AgentKind::ReportWriter => vec![supervisor, END],
    }
}

/// Builds and compiles the agent graph.
///
/// `duration_unit` is the unit detected for the `duration` column; it is
/// passed to the SQL prompt and the analyst's cost figures.
pub fn build_graph(
    llm: Arc<dyn LlmClient>,
    db: LogDatabase,
    config: &Config,
    duration_unit: DurationUnit,
) -> Result<CompiledStateGraph<AgentState>> {
    let mut graph = StateGraph::<AgentState>::new();
    graph
        .add_node(
            AgentKind::Supervisor.id(),
            Box::new(SupervisorAgent::new(llm.clone(), config.temperature)),
        )
        .add_node(
            AgentKind::SqlAgent.id(),
            Box::new(
                SqlAgent::new(llm.clone(), db, config.max_iterations, config.temperature)
                    .with_duration_unit(duration_unit),
            ),
        )
        .add_node(
            AgentKind::Analyst.id(),
            Box::new(
                AnalystAgent::new(llm, config.temperature, config.rates.clone())
                    .with_duration_unit(duration_unit),
            ),
        )
        .add_node(AgentKind::ReportWriter.id(), Box::new(ReportWriterAgent))
        .set_entry_point(AgentKind::Supervisor.id())
        .with_recursion_limit(config.recursion_limit);
    for kind in AgentKind::ALL {
        graph.add_conditional_edges(kind.id(), routes(kind));
    }
    Ok(graph.compile()?)
}

#[cfg(test)]
mod tests {
    use langgraph::{MockLlmClient, START};

    use super::*;

    #[test]
    fn graph_has_every_declared_route() {
        let dir = tempfile::tempdir().unwrap();
        let db = LogDatabase::open(dir.path().join("logs.db")).unwrap();
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new("SELECT 1"));
        let graph = build_graph(llm, db, &Config::default(), DurationUnit::Seconds).unwrap();

        assert_eq!(graph.entry_point(), "supervisor");
        assert_eq!(graph.recursion_limit(), 25);
        let edges = graph.edges();
        assert!(edges.contains(&(START.to_string(), "supervisor".to_string(), false)));
        assert!(edges.contains(&("report_writer".to_string(), END.to_string(), true)));
        assert!(edges.contains(&("analyst".to_string(), "sql_agent".to_string(), true)));
        assert!(!edges.contains(&("report_writer".to_string(), "analyst".to_string(), true)));
        // START edge + 4 + 4 + 4 + 2 conditional edges.
        assert_eq!(edges.len(), 15);
    }
}
