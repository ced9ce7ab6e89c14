//! Errors raised while running a compiled graph.

use thiserror::Error;

/// Error returned by `Node::run` and `CompiledStateGraph::invoke`.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A node failed; carries the reason.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The run took more node steps than the graph allows.
    #[error("recursion limit of {0} steps reached without hitting END")]
    RecursionLimit(usize),

    /// A node jumped to a target its conditional edges do not declare.
    #[error("route not allowed: {from} -> {to}")]
    RouteNotAllowed { from: String, to: String },

    /// A node jumped to an id that is not registered.
    #[error("node not found: {0}")]
    NodeNotFound(String),
}
