pub mod catalog;
pub mod conversation;
pub mod error;
pub mod events;
pub mod settings;

pub use error::ChatError;

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    use crate::conversation::{Message, Usage};
    use crate::error::ChatError;

    /// One entry of the `messages` array sent to the completion endpoint.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String, // "system" | "user" | "assistant"
        pub content: String,
    }

    impl ChatMessage {
        pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
            Self {
                role: role.into(),
                content: content.into(),
            }
        }
    }

    impl From<&Message> for ChatMessage {
        fn from(m: &Message) -> Self {
            Self::new(m.role.as_str(), m.content.clone())
        }
    }

    /// Outcome of a finished (not cancelled) completion.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CompletionResult {
        pub full_content: String,
        pub cost: Option<f64>,
        pub usage: Option<Usage>,
        pub request_id: Option<String>,
        pub generation: Option<serde_json::Value>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamEvent {
        Delta(String),
        CostEstimate(f64),
        Finished(CompletionResult),
        Failed(ChatError),
        Cancelled,
    }

    /// A stream event tagged with the request it belongs to.
    #[derive(Debug, Clone, PartialEq)]
    pub struct StreamUpdate {
        pub seq: u64,
        pub event: StreamEvent,
    }
}
