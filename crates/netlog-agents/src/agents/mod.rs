//! The four agents and the state they share.
//!
//! Each agent implements `langgraph::Node<AgentState>` and reports where
//! control goes next with a [Route].

pub mod analysis;
mod analyst;
mod report_writer;
mod sql;
mod state;
mod supervisor;

pub use analysis::AnalysisResults;
pub use analyst::{compute_statistics, parse_model_analysis, AnalystAgent};
pub use report_writer::{render as render_report, ReportWriterAgent, AGENT_VERSION};
pub use sql::{clean_sql, SqlAgent};
pub use state::{AgentKind, AgentState, Route, Speaker, SqlResult, TranscriptEntry};
pub use supervisor::{decide, needs_data, route_from_reply, Decision, SupervisorAgent, DATA_KEYWORDS};
