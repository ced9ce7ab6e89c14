//! Compiled state graph: immutable, supports invoke and inspection.
//!
//! Built by `StateGraph::compile`. Holds nodes, linear edge order, entry point
//! and conditional edges. Conditional targets are enforced at run time.

use std::collections::HashMap;

use tracing::debug;

use crate::error::AgentError;

use super::{Next, Node, END, START};

/// Compiled graph: immutable structure, supports invoke only.
///
/// Runs from the entry point; uses each node's returned `Next` to choose the
/// next node (Continue = linear order, Node(id) = jump, End = stop).
///
/// **Interaction**: Built from `StateGraph`; callers use `invoke(state)` to
/// execute and `edges` / `to_mermaid` to inspect.
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Box<dyn Node<S>>>,
    pub(super) edge_order: Vec<String>,
    pub(super) entry: String,
    pub(super) conditional: Vec<(String, Vec<String>)>,
    pub(super) recursion_limit: usize,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Runs the graph with the given state until a node ends it.
    ///
    /// - `Next::Continue`: run the next node in edge order, or end if there is none.
    /// - `Next::Node(id)`: run `id` next; must be a declared conditional target
    ///   when the current node has conditional edges.
    /// - `Next::End`: stop and return current state.
    ///
    /// Fails with `AgentError::RecursionLimit` after `recursion_limit` steps.
    pub async fn invoke(&self, state: S) -> Result<S, AgentError> {
        let mut state = state;
        let mut current_id = self.entry.clone();
        let mut steps = 0usize;

        loop {
            if steps >= self.recursion_limit {
                return Err(AgentError::RecursionLimit(self.recursion_limit));
            }
            steps += 1;

            let node = self
                .nodes
                .get(&current_id)
                .ok_or_else(|| AgentError::NodeNotFound(current_id.clone()))?;
            debug!(node = %current_id, step = steps, "running node");
            let (new_state, next) = node.run(state).await?;
            state = new_state;
            self.check_route(&current_id, &next)?;
            debug!(node = %current_id, next = ?next, "node finished");

            match next {
                Next::End => return Ok(state),
                Next::Node(id) => current_id = id,
                Next::Continue => match self.linear_successor(&current_id) {
                    Some(id) => current_id = id.to_string(),
                    None => return Ok(state),
                },
            }
        }
    }

    /// Id of the node the run starts at.
    pub fn entry_point(&self) -> &str {
        &self.entry
    }

    /// Number of node steps allowed per `invoke`.
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// All edges as `(source, target, conditional)`, with `START` and `END` as virtual nodes.
    pub fn edges(&self) -> Vec<(String, String, bool)> {
        let mut edges: Vec<(String, String, bool)> = Vec::new();
        let mut push = |from: &str, to: &str, conditional: bool| {
            if !edges.iter().any(|(f, t, _)| f == from && t == to) {
                edges.push((from.to_string(), to.to_string(), conditional));
            }
        };
        push(START, &self.entry, false);
        for pair in self.edge_order.windows(2) {
            push(&pair[0], &pair[1], false);
        }
        if let Some(last) = self.edge_order.last() {
            if !self.has_conditional(last) {
                push(last, END, false);
            }
        }
        for (from, targets) in &self.conditional {
            for to in targets {
                push(from, to, true);
            }
        }
        edges
    }

    /// Renders the graph as a Mermaid `graph TD` diagram.
    ///
    /// `label` maps a node id (including `START` / `END`) to its display text.
    /// Conditional edges are drawn dotted.
    pub fn to_mermaid(&self, label: impl Fn(&str) -> String) -> String {
        let edges = self.edges();
        let mut ids: Vec<&str> = Vec::new();
        for (from, to, _) in &edges {
            for id in [from.as_str(), to.as_str()] {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        let mut out = String::from("graph TD\n");
        for id in &ids {
            let shape = match *id {
                START | END => format!("([{}])", label(id)),
                _ => format!("[\"{}\"]", label(id)),
            };
            out.push_str(&format!("    {}{}\n", mermaid_id(id), shape));
        }
        for (from, to, conditional) in &edges {
            let arrow = if *conditional { "-.->" } else { "-->" };
            out.push_str(&format!(
                "    {} {} {}\n",
                mermaid_id(from),
                arrow,
                mermaid_id(to)
            ));
        }
        out
    }

    fn has_conditional(&self, id: &str) -> bool {
        self.conditional.iter().any(|(from, _)| from == id)
    }

    fn check_route(&self, from: &str, next: &Next) -> Result<(), AgentError> {
        let Some(target) = next.target() else {
            return Ok(());
        };
        let Some((_, allowed)) = self.conditional.iter().find(|(src, _)| src == from) else {
            return Ok(());
        };
        if allowed.iter().any(|t| t == target) {
            Ok(())
        } else {
            Err(AgentError::RouteNotAllowed {
                from: from.to_string(),
                to: target.to_string(),
            })
        }
    }

    fn linear_successor(&self, id: &str) -> Option<&str> {
        let pos = self.edge_order.iter().position(|x| x == id)?;
        self.edge_order.get(pos + 1).map(String::as_str)
    }
}

/// Mermaid reserves `end`; virtual nodes get plain ids.
fn mermaid_id(id: &str) -> &str {
    match id {
        START => "start",
        END => "end_node",
        other => other,
    }
}
