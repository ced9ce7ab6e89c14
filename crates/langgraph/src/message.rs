//! Minimal message types for graph state.
//!
//! Aligns with LangGraph/LangChain: System (usually first in the list), User, Assistant.

use serde::{Deserialize, Serialize};

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "snake_case")]
pub enum Message {
    /// System prompt; typically placed first in the message list.
    System(String),
    /// User input.
    User(String),
    /// Model/agent reply.
    Assistant(String),
}

impl Message {
    /// Builds a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    /// Builds a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    /// Builds an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    /// Text of the message regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Self::System(s) | Self::User(s) | Self::Assistant(s) => s,
        }
    }
}
