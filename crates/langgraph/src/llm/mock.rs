//! Mock LLM for tests and offline runs.
//!
//! Returns scripted replies in order, then a fixed fallback reply. Every
//! request is recorded so tests can assert on prompts.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::client::LlmClient;
use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse, Usage};

/// Mock LLM: scripted replies (or errors), then a fallback.
///
/// **Interaction**: Implements `LlmClient`; stands in for `OpenAiClient` in tests.
pub struct MockLlmClient {
    scripted: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockLlmClient {
    /// Mock that always answers `fallback`.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mock that answers each of `replies` once, in order, then the last reply forever.
    pub fn with_replies<I, T>(replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let replies: VecDeque<Result<String, LlmError>> =
            replies.into_iter().map(|r| Ok(r.into())).collect();
        let fallback = match replies.back() {
            Some(Ok(last)) => last.clone(),
            _ => String::new(),
        };
        Self {
            scripted: Mutex::new(replies),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues one more reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.scripted).push_back(Ok(reply.into()));
    }

    /// Queues a failure for the next call.
    pub fn push_error(&self, err: LlmError) {
        lock(&self.scripted).push_back(Err(err));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        lock(&self.requests).push(req);
        let next = lock(&self.scripted).pop_front();
        let content = match next {
            Some(reply) => reply?,
            None => self.fallback.clone(),
        };
        Ok(ChatResponse {
            content,
            usage: Usage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_last_forever() {
        let llm = MockLlmClient::with_replies(["one", "two"]);
        let a = llm.chat(ChatRequest::single_turn("a")).await.unwrap();
        let b = llm.chat(ChatRequest::single_turn("b")).await.unwrap();
        let c = llm.chat(ChatRequest::single_turn("c")).await.unwrap();
        assert_eq!(a.content, "one");
        assert_eq!(b.content, "two");
        assert_eq!(c.content, "two");
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.requests()[1].messages[0].content, "b");
    }

    #[tokio::test]
    async fn scripted_error_is_returned_once() {
        let llm = MockLlmClient::new("ok");
        llm.push_error(LlmError::RateLimit("slow down".into()));
        assert!(matches!(
            llm.chat(ChatRequest::single_turn("x")).await,
            Err(LlmError::RateLimit(_))
        ));
        assert_eq!(llm.chat(ChatRequest::single_turn("x")).await.unwrap().content, "ok");
    }
}
