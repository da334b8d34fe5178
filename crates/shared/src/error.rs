//! Error taxonomy for a chat completion round trip.

use thiserror::Error;

/// Everything that can go wrong between "send" and "assistant message committed".
///
/// `Cancelled` is not a failure: callers check [`ChatError::is_cancelled`] and
/// swallow it silently. `Parse` only ever describes a single stream record and
/// never aborts a stream on its own.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    /// Missing or unusable configuration (no API key).
    #[error("{0}")]
    Config(String),

    /// The completion endpoint answered with a non-2xx status.
    #[error("API request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    /// Transport failure while connecting or reading the body.
    #[error("Network error: {0}")]
    Network(String),

    /// User-initiated abort.
    #[error("Request cancelled")]
    Cancelled,

    /// One stream record could not be decoded.
    #[error("Failed to parse stream record: {0}")]
    Parse(String),
}

impl ChatError {
    pub fn missing_api_key() -> Self {
        ChatError::Config(
            "OpenRouter API key is not set. Please add your API key in settings.".to_string(),
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }

    /// Text shown inline in the transcript for failures the user should see.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Config(msg) => msg.clone(),
            ChatError::Request { message, .. } => format!("Error: {}", message),
            ChatError::Network(msg) => format!("Error: Network error: {}", msg),
            ChatError::Cancelled => String::new(),
            ChatError::Parse(msg) => format!("Error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_distinguished() {
        assert!(ChatError::Cancelled.is_cancelled());
        assert!(!ChatError::Network("reset".into()).is_cancelled());
        assert!(ChatError::Cancelled.user_message().is_empty());
    }

    #[test]
    fn test_request_error_display_carries_status() {
        let err = ChatError::Request {
            status: 401,
            message: "No auth credentials found".into(),
        };
        assert!(err.to_string().contains("401"));
        assert_eq!(err.user_message(), "Error: No auth credentials found");
    }
}
