use async_trait::async_trait;

use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse};

/// Async chat interface implemented by hosted and mock models.
///
/// **Interaction**: Held as `Arc<dyn LlmClient>` by graph nodes that need a model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends the conversation and returns the assistant reply.
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError>;
}
