//! Integration tests for StateGraph: compile validation, routing and invoke.

use async_trait::async_trait;
use langgraph::{AgentError, CompilationError, Message, Next, Node, StateGraph, END, START};

#[derive(Debug, Clone, Default)]
struct ChatState {
    messages: Vec<Message>,
    visits: Vec<String>,
}

/// Echoes the last user message and continues along the chain.
struct EchoNode;

#[async_trait]
impl Node<ChatState> for EchoNode {
    fn id(&self) -> &str {
        "echo"
    }

    async fn run(&self, state: ChatState) -> Result<(ChatState, Next), AgentError> {
        let mut state = state;
        if let Some(Message::User(s)) = state.messages.last() {
            let reply = Message::Assistant(s.clone());
            state.messages.push(reply);
        }
        state.visits.push("echo".into());
        Ok((state, Next::Continue))
    }
}

/// Always returns the same routing decision.
struct FixedRoute {
    id: &'static str,
    next: Next,
}

#[async_trait]
impl Node<ChatState> for FixedRoute {
    fn id(&self) -> &str {
        self.id
    }

    async fn run(&self, state: ChatState) -> Result<(ChatState, Next), AgentError> {
        let mut state = state;
        state.visits.push(self.id.into());
        Ok((state, self.next.clone()))
    }
}

/// Jumps to `worker` until it has been visited twice, then ends.
struct Router;

#[async_trait]
impl Node<ChatState> for Router {
    fn id(&self) -> &str {
        "router"
    }

    async fn run(&self, state: ChatState) -> Result<(ChatState, Next), AgentError> {
        let mut state = state;
        let worker_runs = state.visits.iter().filter(|v| *v == "worker").count();
        state.visits.push("router".into());
        let next = if worker_runs < 2 {
            Next::to("worker")
        } else {
            Next::to(END)
        };
        Ok((state, next))
    }
}

fn route(id: &'static str, next: Next) -> Box<FixedRoute> {
    Box::new(FixedRoute { id, next })
}

#[tokio::test]
async fn compile_fails_when_edge_refers_to_unknown_node() {
    let mut graph = StateGraph::<ChatState>::new();
    graph.add_node("echo", Box::new(EchoNode));
    graph.add_edge("echo");
    graph.add_edge("missing");

    match graph.compile() {
        Err(CompilationError::NodeNotFound(id)) => assert_eq!(id, "missing"),
        _ => panic!("expected NodeNotFound"),
    }
}

#[tokio::test]
async fn compile_fails_without_entry_point() {
    let mut graph = StateGraph::<ChatState>::new();
    graph.add_node("echo", Box::new(EchoNode));
    assert!(matches!(graph.compile(), Err(CompilationError::MissingEntryPoint)));
}

#[tokio::test]
async fn compile_fails_when_conditional_target_is_unknown() {
    let mut graph = StateGraph::<ChatState>::new();
    graph
        .add_node("router", Box::new(Router))
        .set_entry_point("router")
        .add_conditional_edges("router", ["worker", END]);
    match graph.compile() {
        Err(CompilationError::NodeNotFound(id)) => assert_eq!(id, "worker"),
        _ => panic!("expected NodeNotFound"),
    }
}

#[tokio::test]
async fn invoke_single_node_chain() {
    let mut graph = StateGraph::<ChatState>::new();
    graph.add_node("echo", Box::new(EchoNode)).add_edge("echo");

    let compiled = graph.compile().unwrap();
    let mut state = ChatState::default();
    state.messages.push(Message::user("hi"));

    let state = compiled.invoke(state).await.unwrap();
    let last = state.messages.last().unwrap();
    assert!(matches!(last, Message::Assistant(s) if s == "hi"));
}

#[tokio::test]
async fn conditional_loop_runs_until_end() {
    let mut graph = StateGraph::<ChatState>::new();
    graph
        .add_node("router", Box::new(Router))
        .add_node("worker", route("worker", Next::to("router")))
        .set_entry_point("router")
        .add_conditional_edges("router", ["worker", END])
        .add_conditional_edges("worker", ["router"]);

    let out = graph.compile().unwrap().invoke(ChatState::default()).await.unwrap();
    assert_eq!(
        out.visits,
        vec!["router", "worker", "router", "worker", "router"]
    );
}

#[tokio::test]
async fn undeclared_jump_is_rejected() {
    let mut graph = StateGraph::<ChatState>::new();
    graph
        .add_node("a", route("a", Next::to("c")))
        .add_node("b", route("b", Next::End))
        .add_node("c", route("c", Next::End))
        .set_entry_point("a")
        .add_conditional_edges("a", ["b", END]);

    let err = graph.compile().unwrap().invoke(ChatState::default()).await.unwrap_err();
    match err {
        AgentError::RouteNotAllowed { from, to } => {
            assert_eq!(from, "a");
            assert_eq!(to, "c");
        }
        other => panic!("expected RouteNotAllowed, got {other:?}"),
    }
}

#[tokio::test]
async fn endless_loop_hits_recursion_limit() {
    let mut graph = StateGraph::<ChatState>::new();
    graph
        .add_node("ping", route("ping", Next::to("pong")))
        .add_node("pong", route("pong", Next::to("ping")))
        .set_entry_point("ping")
        .with_recursion_limit(5);

    let err = graph.compile().unwrap().invoke(ChatState::default()).await.unwrap_err();
    assert!(matches!(err, AgentError::RecursionLimit(5)));
}

#[tokio::test]
async fn edges_and_mermaid_include_virtual_nodes() {
    let mut graph = StateGraph::<ChatState>::new();
    graph
        .add_node("router", Box::new(Router))
        .add_node("worker", route("worker", Next::to("router")))
        .set_entry_point("router")
        .add_conditional_edges("router", ["worker", END])
        .add_conditional_edges("worker", ["router"]);
    let compiled = graph.compile().unwrap();

    let edges = compiled.edges();
    assert_eq!(edges[0], (START.to_string(), "router".to_string(), false));
    assert!(edges.contains(&("router".to_string(), END.to_string(), true)));

    let mermaid = compiled.to_mermaid(|id| id.to_uppercase());
    assert!(mermaid.starts_with("graph TD\n"));
    assert!(mermaid.contains("start --> router"));
    assert!(mermaid.contains("router -.-> end_node"));
    assert!(mermaid.contains("worker[\"WORKER\"]"));
}
