//! Conversation and message records, persisted one JSON document per conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

pub const NEW_CONVERSATION_TITLE: &str = "New Conversation";
const TITLE_CHARS: usize = 50;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Token accounting as reported by the completion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, alias = "tokens_prompt")]
    pub prompt_tokens: u64,
    #[serde(default, alias = "tokens_completion")]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, rename = "hiddenFromLLM")]
    pub hidden_from_llm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<serde_json::Value>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            hidden_from_llm: false,
            model_id: None,
            model_name: None,
            cost: None,
            usage: None,
            request_id: None,
            generation: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// An inline error line: shown in the transcript, never sent to the model.
    pub fn notice(content: impl Into<String>) -> Self {
        Self {
            hidden_from_llm: true,
            ..Self::plain(Role::System, content)
        }
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    pub model: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

fn default_title() -> String {
    NEW_CONVERSATION_TITLE.to_string()
}

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Epoch milliseconds as a string, bumped when two calls land in the same millisecond.
pub fn next_conversation_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut prev = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST_ID.compare_exchange(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => prev = actual,
        }
    }
}

/// First 50 characters of `text`, with "..." when it was cut.
pub fn derive_title(text: &str) -> String {
    truncate_chars(text.trim(), TITLE_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl Conversation {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: next_conversation_id(),
            title: default_title(),
            model: model.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.messages.iter().filter_map(|m| m.cost).sum()
    }

    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// Titles the conversation from its only user message. No-op otherwise.
    pub fn auto_title(&mut self) -> bool {
        if self.user_message_count() != 1 {
            return false;
        }
        let Some(first) = self.messages.iter().find(|m| m.role == Role::User) else {
            return false;
        };
        self.title = derive_title(&first.content);
        true
    }

    /// Flips `hiddenFromLLM` on one message. Content is never touched.
    pub fn toggle_hidden(&mut self, index: usize) -> Option<bool> {
        let msg = self.messages.get_mut(index)?;
        msg.hidden_from_llm = !msg.hidden_from_llm;
        Some(msg.hidden_from_llm)
    }

    pub fn remove_message(&mut self, index: usize) -> Option<Message> {
        (index < self.messages.len()).then(|| self.messages.remove(index))
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        if self.title.to_lowercase().contains(&query) {
            return true;
        }
        let joined = self
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        joined.to_lowercase().contains(&query)
    }

    pub fn summary(&self) -> ConversationSummary {
        let preview = self
            .messages
            .first()
            .map(|m| truncate_chars(&m.content, PREVIEW_CHARS))
            .unwrap_or_default();
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            model: self.model.clone(),
            preview,
            created_at: self.created_at,
            total_cost: self.total_cost(),
            message_count: self.messages.len(),
        }
    }
}

/// One sidebar row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub model: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub total_cost: f64,
    pub message_count: usize,
}

/// Newest first, then narrowed by `query`.
pub fn summarize<'a>(
    conversations: impl IntoIterator<Item = &'a Conversation>,
    query: &str,
) -> Vec<ConversationSummary> {
    let mut rows: Vec<_> = conversations
        .into_iter()
        .filter(|c| c.matches(query))
        .map(Conversation::summary)
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}
