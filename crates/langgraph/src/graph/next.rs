//! Next-step result from a graph node: continue linear chain, jump to a node, or end.

use super::END;

/// Next step after running a node.
///
/// - **Continue**: follow the linear edge order (next node in chain, or END if last).
/// - **Node(id)**: jump to the given node; must be declared by `add_conditional_edges`
///   when the source node has conditional edges.
/// - **End**: stop; return current state as final result.
///
/// **Interaction**: Returned by `Node::run`; consumed by `CompiledStateGraph::invoke`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    /// Follow linear edge order; if current node is last, equivalent to End.
    Continue,
    /// Run the node with the given id next.
    Node(String),
    /// Stop and return the current state.
    End,
}

impl Next {
    /// Jump to `id`; the `END` id maps to `Next::End`.
    pub fn to(id: impl Into<String>) -> Self {
        let id = id.into();
        if id == END {
            Self::End
        } else {
            Self::Node(id)
        }
    }

    /// Target id as seen by conditional edges (`END` for `Next::End`).
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Continue => None,
            Self::Node(id) => Some(id),
            Self::End => Some(END),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_end_id_is_end() {
        assert_eq!(Next::to(END), Next::End);
        assert_eq!(Next::to("analyst"), Next::Node("analyst".into()));
    }

    #[test]
    fn target_of_continue_is_none() {
        assert_eq!(Next::Continue.target(), None);
        assert_eq!(Next::End.target(), Some(END));
    }
}
