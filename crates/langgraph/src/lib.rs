//! LangGraph-style state graph in Rust: state-in, state-out.
//!
//! One state type per graph, one node per step. Nodes return `Next` to
//! continue the linear chain, jump to a declared target, or end.
//! Concrete agents and state types live in the crates that use the runtime.

pub mod error;
pub mod graph;
pub mod llm;
pub mod message;

pub use error::AgentError;
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, END, START};
pub use llm::{
    ChatMessage, ChatRequest, ChatResponse, LlmClient, LlmError, MessageRole, MockLlmClient,
    Usage,
};
#[cfg(feature = "openai")]
pub use llm::{OpenAiClient, OpenAiConfig};
pub use message::Message;
