//! Graph compilation error.
//!
//! Returned by `StateGraph::compile` when the graph references unknown nodes
//! or has nowhere to start.

use thiserror::Error;

/// Error when compiling a state graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompilationError {
    /// An edge, entry point or conditional target was not registered via `add_node`.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Neither `set_entry_point` nor `add_edge` was called.
    #[error("graph has no entry point")]
    MissingEntryPoint,
}
