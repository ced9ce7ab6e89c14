//! State graph: nodes, linear and conditional edges, compile and invoke.
//!
//! Aligns with LangGraph `StateGraph`: add nodes and edges, set the entry
//! point, compile, then invoke with state.

mod compile_error;
mod compiled;
mod next;
mod node;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use next::Next;
pub use node::Node;
pub use state_graph::StateGraph;

/// Virtual source node used when listing edges and drawing diagrams.
pub const START: &str = "__start__";

/// Virtual sink node: a conditional target meaning "stop the run".
pub const END: &str = "__end__";

/// Default number of node steps before `invoke` gives up (LangGraph default).
pub const DEFAULT_RECURSION_LIMIT: usize = 25;
