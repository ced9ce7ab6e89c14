//! LLM call errors.

use thiserror::Error;

/// Errors from an `LlmClient::chat` call.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// API returned an error (5xx or a business error).
    #[error("api error: {0}")]
    ApiError(String),

    /// Rate limited (429).
    #[error("rate limit: {0}")]
    RateLimit(String),

    /// Authentication failed (401/403) or no key configured.
    #[error("auth failed: {0}")]
    Auth(String),

    /// Request rejected as invalid (other 4xx).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be parsed.
    #[error("parsing failed: {0}")]
    Parsing(String),
}

impl LlmError {
    /// Maps a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            429 => Self::RateLimit(body),
            400..=499 => Self::InvalidRequest(body),
            _ => Self::ApiError(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(LlmError::from_status(401, String::new()), LlmError::Auth(_)));
        assert!(matches!(LlmError::from_status(403, String::new()), LlmError::Auth(_)));
        assert!(matches!(LlmError::from_status(429, String::new()), LlmError::RateLimit(_)));
        assert!(matches!(
            LlmError::from_status(422, String::new()),
            LlmError::InvalidRequest(_)
        ));
        assert!(matches!(LlmError::from_status(503, String::new()), LlmError::ApiError(_)));
    }
}
