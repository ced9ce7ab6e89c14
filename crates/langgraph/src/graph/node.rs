//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S`, returns updated `S` and `Next` (continue, jump, or end).
//! Aligns with LangGraph node `(state) -> partial`, except the full state is
//! returned together with the routing decision.

use async_trait::async_trait;

use crate::error::AgentError;

use super::Next;

/// One step in a graph: state in, (state out, next step).
///
/// **Interaction**: Registered with `StateGraph::add_node`; driven by
/// `CompiledStateGraph::invoke`, which checks the returned `Next` against the
/// node's conditional edges.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Node id (e.g. `"supervisor"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    async fn run(&self, state: S) -> Result<(S, Next), AgentError>;
}
