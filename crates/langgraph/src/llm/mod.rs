//! LLM client and request/response types.
//!
//! - `LlmClient`: async chat interface
//! - `ChatRequest` / `ChatResponse` / `Usage`: request, response and token usage
//! - `LlmError`: call failures
//! - `OpenAiClient`: OpenAI-compatible Chat Completions over HTTP (feature `openai`)
//! - `MockLlmClient`: scripted replies for tests

mod client;
mod error;
mod mock;
#[cfg(feature = "openai")]
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use mock::MockLlmClient;
#[cfg(feature = "openai")]
pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{ChatMessage, ChatRequest, ChatResponse, MessageRole, Usage};
