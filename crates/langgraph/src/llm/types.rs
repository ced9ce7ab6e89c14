//! LLM request/response and usage types.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Role of a single chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Wire name used by OpenAI-compatible APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(m: &Message) -> Self {
        let role = match m {
            Message::System(_) => MessageRole::System,
            Message::User(_) => MessageRole::User,
            Message::Assistant(_) => MessageRole::Assistant,
        };
        Self {
            role,
            content: m.content().to_string(),
        }
    }
}

/// Chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Messages in order.
    pub messages: Vec<ChatMessage>,
    /// Temperature; the client default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Single-turn request with no system prompt.
    pub fn single_turn(user_content: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(user_content)],
            ..Default::default()
        }
    }

    /// System prompt followed by one user message.
    pub fn with_system(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_content),
            ],
            ..Default::default()
        }
    }

    /// System prompt followed by a conversation history.
    pub fn from_history(system_prompt: impl Into<String>, history: &[Message]) -> Self {
        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(history.iter().map(ChatMessage::from));
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Appends one message.
    pub fn push(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Token usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply text.
    pub content: String,
    #[serde(default)]
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_with_system() {
        let req = ChatRequest::with_system("you are a helper", "hello");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, MessageRole::System);
        assert_eq!(req.messages[1].role, MessageRole::User);
        assert_eq!(req.temperature, None);
    }

    #[test]
    fn from_history_keeps_roles_in_order() {
        let history = vec![Message::user("q"), Message::assistant("a")];
        let req = ChatRequest::from_history("sys", &history).temperature(0.0);
        let roles: Vec<MessageRole> = req.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        assert_eq!(req.temperature, Some(0.0));
    }

    #[test]
    fn usage_default_is_zero() {
        let u = Usage::default();
        assert_eq!(u.prompt_tokens, 0);
        assert_eq!(u.completion_tokens, 0);
    }
}
