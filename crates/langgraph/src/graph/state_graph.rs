//! State graph builder: nodes, linear edge order, entry point, conditional edges.
//!
//! Add nodes with `add_node`, define the chain with `add_edge` and/or routing
//! with `set_entry_point` + `add_conditional_edges`, then `compile`.

use std::collections::HashMap;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::node::Node;
use crate::graph::{DEFAULT_RECURSION_LIMIT, END};

/// State graph: nodes plus linear edge order and optional conditional edges.
///
/// Generic over state type `S`. Build with `add_node` / `add_edge` /
/// `add_conditional_edges`, then `compile()` to obtain an executable graph.
///
/// **Interaction**: Accepts `Box<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Box<dyn Node<S>>>,
    /// Linear chain: [id1, id2, ...] => START -> id1 -> id2 -> ... -> END
    edge_order: Vec<String>,
    entry_point: Option<String>,
    /// Source node -> the only targets it may jump to. Insertion ordered.
    conditional: Vec<(String, Vec<String>)>,
    recursion_limit: usize,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edge_order: Vec::new(),
            entry_point: None,
            conditional: Vec::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Adds a node; id must be unique. Replaces if same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Box<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Appends an edge from the current chain end to this node.
    ///
    /// Order of `add_edge` calls defines the chain: first is START→id, last
    /// leads to END.
    pub fn add_edge(&mut self, to_id: impl Into<String>) -> &mut Self {
        self.edge_order.push(to_id.into());
        self
    }

    /// Sets the node the run starts at. Without it the first linear edge is used.
    pub fn set_entry_point(&mut self, id: impl Into<String>) -> &mut Self {
        self.entry_point = Some(id.into());
        self
    }

    /// Declares the targets `from` may jump to via `Next::Node` / `Next::End`.
    ///
    /// Use `END` among the targets to allow stopping. Calling again for the
    /// same source replaces its targets.
    pub fn add_conditional_edges<I, T>(&mut self, from: impl Into<String>, targets: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let from = from.into();
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        match self.conditional.iter_mut().find(|(src, _)| *src == from) {
            Some((_, existing)) => *existing = targets,
            None => self.conditional.push((from, targets)),
        }
        self
    }

    /// Maximum number of node steps per `invoke`.
    pub fn with_recursion_limit(&mut self, limit: usize) -> &mut Self {
        self.recursion_limit = limit;
        self
    }

    /// Builds the executable graph after validating every referenced id.
    ///
    /// Returns `CompilationError::NodeNotFound(id)` for the first edge, entry
    /// point, conditional source or conditional target (other than `END`) that
    /// is not a registered node.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        for id in &self.edge_order {
            self.require(id)?;
        }
        let entry = match (&self.entry_point, self.edge_order.first()) {
            (Some(id), _) => id.clone(),
            (None, Some(first)) => first.clone(),
            (None, None) => return Err(CompilationError::MissingEntryPoint),
        };
        self.require(&entry)?;
        for (from, targets) in &self.conditional {
            self.require(from)?;
            for t in targets.iter().filter(|t| t.as_str() != END) {
                self.require(t)?;
            }
        }
        Ok(CompiledStateGraph {
            nodes: self.nodes,
            edge_order: self.edge_order,
            entry,
            conditional: self.conditional,
            recursion_limit: self.recursion_limit,
        })
    }

    fn require(&self, id: &str) -> Result<(), CompilationError> {
        if self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(CompilationError::NodeNotFound(id.to_string()))
        }
    }
}
