//! Multi-agent question answering over a SQLite table of network-traffic logs.
//!
//! Four agents run on a `langgraph` state graph:
//! Supervisor → SQL Agent → Data Analyst → Report Writer.
//! The supervisor routes, the SQL agent turns the question into a read-only
//! query, the analyst derives statistics and insights, the report writer
//! renders a markdown report.
//!
//! Raw firewall logs and CSV exports are loaded into the `logs` table by the
//! `parser` module.

pub mod agents;
pub mod config;
pub mod conversation;
pub mod db;
pub mod doctor;
pub mod error;
pub mod graph_builder;
pub mod history;
pub mod logging;
pub mod parser;
pub mod productivity;
pub mod system;
pub mod visualization;

pub use agents::{AgentKind, AgentState, AnalysisResults, Route, SqlResult};
pub use config::Config;
pub use conversation::{ConversationHistory, HistoryEntry};
pub use db::{DatabaseStats, LogDatabase, QueryResult};
pub use error::{Error, Result};
pub use system::MultiAgentSystem;
