//! Error type for the netlog agents crate.

use langgraph::{AgentError, CompilationError, LlmError};
use thiserror::Error;

/// Errors from database access, log import, configuration and the agent graph.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("agent graph: {0}")]
    Agent(#[from] AgentError),

    #[error("graph compilation: {0}")]
    Compilation(#[from] CompilationError),

    /// No database on the search paths and no CSV to build one from.
    #[error("no logs database found (searched: {searched}); import logs first or put a CSV whose name contains 'logi' in the working directory")]
    DatabaseNotFound { searched: String },

    /// The SQL handed to `LogDatabase::query` is not a single read-only statement.
    #[error("only a single read-only SELECT statement is allowed, got: {0}")]
    ReadOnlyViolation(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
