//! Mermaid diagram of the agent graph.

use std::sync::Arc;

use langgraph::{CompiledStateGraph, MockLlmClient, END, START};
use tracing::warn;

use crate::agents::{AgentKind, AgentState};
use crate::config::Config;
use crate::db::LogDatabase;
use crate::graph_builder::build_graph;
use crate::productivity::DurationUnit;

/// Fill colour per diagram node.
fn color(id: &str) -> &'static str {
    match AgentKind::from_id(id) {
        Some(AgentKind::Supervisor) => "#ff6b6b",
        Some(AgentKind::SqlAgent) => "#4ecdc4",
        Some(AgentKind::Analyst) => "#45b7d1",
        Some(AgentKind::ReportWriter) => "#96ceb4",
        None if id == START => "#ffa07a",
        None => "#dda0dd",
    }
}

fn label(id: &str) -> String {
    match (id, AgentKind::from_id(id)) {
        (_, Some(kind)) => format!("{} {}", kind.emoji(), kind.display_name()),
        (START, None) => "🚀 START".to_string(),
        (END, None) => "🏁 END".to_string(),
        (other, None) => other.to_string(),
    }
}

fn mermaid_id(id: &str) -> &str {
    match id {
        START => "start",
        END => "end_node",
        other => other,
    }
}

/// Diagram used when the graph exposes no edges.
pub fn fallback_diagram() -> String {
    let mut out = String::from(
        "graph TD\n    start([🚀 START]) --> supervisor[\"🎯 Supervisor\"]\n    supervisor -.-> sql_agent[\"🗄️ SQL Agent\"]\n    sql_agent -.-> analyst[\"📊 Data Analyst\"]\n    analyst -.-> report_writer[\"📝 Report Writer\"]\n    report_writer -.-> end_node([🏁 END])\n",
    );
    out.push_str(&styles(
        [START, END]
            .into_iter()
            .chain(AgentKind::ALL.iter().map(|k| k.id())),
    ));
    out
}

fn styles<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    ids.map(|id| {
        format!(
            "    style {} fill:{},stroke:#333,stroke-width:2px,color:#fff\n",
            mermaid_id(id),
            color(id)
        )
    })
    .collect()
}

/// Mermaid `graph TD` of `graph` with emoji labels and per-agent colours.
pub fn to_mermaid(graph: &CompiledStateGraph<AgentState>) -> String {
    let edges = graph.edges();
    if edges.is_empty() {
        return fallback_diagram();
    }
    let mut ids: Vec<&str> = Vec::new();
    for (from, to, _) in &edges {
        for id in [from.as_str(), to.as_str()] {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    let mut out = graph.to_mermaid(label);
    out.push_str(&styles(ids.into_iter()));
    out
}

/// Diagram of the graph `config` would build. Nodes never run, so no model
/// or API key is needed; a missing database gives [fallback_diagram].
pub fn diagram(config: &Config) -> String {
    let graph = LogDatabase::locate(config).and_then(|db| {
        build_graph(
            Arc::new(MockLlmClient::new("")),
            db,
            config,
            DurationUnit::Seconds,
        )
    });
    match graph {
        Ok(graph) => to_mermaid(&graph),
        Err(e) => {
            warn!(error = %e, "agent graph unavailable, drawing the fallback diagram");
            fallback_diagram()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_lists_all_agents_with_colours() {
        let d = fallback_diagram();
        assert!(d.starts_with("graph TD\n"));
        for kind in AgentKind::ALL {
            assert!(d.contains(kind.display_name()));
        }
        assert!(d.contains("style supervisor fill:#ff6b6b"));
        assert!(d.contains("style start fill:#ffa07a"));
        assert!(d.contains("style end_node fill:#dda0dd"));
    }

    #[test]
    fn diagram_needs_no_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            api_key: None,
            db_path: Some(dir.path().join("logs.db")),
            ..Default::default()
        };
        assert!(config.require_api_key().is_err());

        let d = diagram(&config);
        assert!(d.starts_with("graph TD"));
        assert_ne!(d, fallback_diagram());
        assert!(d.contains("report_writer"));
        assert!(d.contains("style sql_agent fill:#4ecdc4"));
    }

    #[test]
    fn diagram_without_database_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_search_paths: vec![dir.path().join("missing.db")],
            ..Default::default()
        };
        assert_eq!(diagram(&config), fallback_diagram());
    }

    #[test]
    fn labels() {
        assert_eq!(label("sql_agent"), "🗄️ SQL Agent");
        assert_eq!(label(END), "🏁 END");
        assert_eq!(color("analyst"), "#45b7d1");
    }
}
