//! The assembled multi-agent system: config, model client, database, graph.

use std::sync::Arc;

use langgraph::{CompiledStateGraph, LlmClient, OpenAiClient, OpenAiConfig};
use serde_json::json;
use tracing::{info, warn};

use crate::agents::{AgentKind, AgentState};
use crate::config::Config;
use crate::conversation::{ConversationHistory, HistoryEntry};
use crate::db::{DatabaseStats, LogDatabase};
use crate::error::Result;
use crate::graph_builder::build_graph;
use crate::history::{RunRecord, RunStore};
use crate::productivity::DurationUnit;

/// Owns everything needed to answer questions about the logs.
///
/// **Interaction**: Built by the CLI (`ask`, `chat`, `graph`, `doctor --live`);
/// tests build it with `with_llm` and a `MockLlmClient`.
pub struct MultiAgentSystem {
    config: Config,
    db: LogDatabase,
    graph: CompiledStateGraph<AgentState>,
    runs: RunStore,
    duration_unit: DurationUnit,
}

impl MultiAgentSystem {
    /// Builds the system with the OpenAI-compatible client and the located database.
    pub async fn new(config: Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let llm = OpenAiClient::new(
            OpenAiConfig::new(api_key, config.model.clone())
                .with_base_url(config.api_base.clone())
                .with_temperature(config.temperature),
        );
        let db = LogDatabase::locate(&config)?;
        Self::with_llm(config, Arc::new(llm), db).await
    }

    /// Builds the system around a given model client and database.
    pub async fn with_llm(config: Config, llm: Arc<dyn LlmClient>, db: LogDatabase) -> Result<Self> {
        let duration_unit = match db.duration_profile().await {
            Ok(Some(profile)) => profile.unit,
            Ok(None) => DurationUnit::Milliseconds,
            Err(e) => {
                warn!(error = %e, "could not profile durations, assuming milliseconds");
                DurationUnit::Milliseconds
            }
        };
        let graph = build_graph(llm, db.clone(), &config, duration_unit)?;
        let runs = RunStore::new(db.path())?;
        info!(
            db = %db.path().display(),
            model = %config.model,
            duration_unit = duration_unit.as_str(),
            "multi-agent system ready"
        );
        Ok(Self {
            config,
            db,
            graph,
            runs,
            duration_unit,
        })
    }

    /// Runs one question through the graph and stores the run.
    pub async fn process(&self, question: &str) -> Result<AgentState> {
        let mut state = AgentState::new(question);
        match self.db.stats().await {
            Ok(stats) => {
                state.context.insert("database".into(), json!(stats.describe()));
            }
            Err(e) => warn!(error = %e, "database stats unavailable"),
        }
        state
            .context
            .insert("duration_unit".into(), json!(self.duration_unit.as_str()));

        info!(question, "processing question");
        let state = self.graph.invoke(state).await?;
        let answer = Self::final_answer(&state);
        let run = RunRecord::new(question, &answer, ConversationHistory::from_state(&state));
        if let Err(e) = self.runs.save(&run).await {
            warn!(error = %e, "failed to save run history");
        }
        Ok(state)
    }

    pub async fn database_stats(&self) -> Result<DatabaseStats> {
        self.db.stats().await
    }

    /// The report if one was written, otherwise the last agent message.
    pub fn final_answer(state: &AgentState) -> String {
        state
            .last_message_from(AgentKind::ReportWriter)
            .or_else(|| state.last_agent_message().map(|e| e.content.as_str()))
            .unwrap_or("No answer was produced.")
            .to_string()
    }

    pub fn conversation_history(state: &AgentState) -> Vec<HistoryEntry> {
        ConversationHistory::from_state(state)
    }

    pub fn graph(&self) -> &CompiledStateGraph<AgentState> {
        &self.graph
    }

    pub fn database(&self) -> &LogDatabase {
        &self.db
    }

    pub fn runs(&self) -> &RunStore {
        &self.runs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn duration_unit(&self) -> DurationUnit {
        self.duration_unit
    }
}
