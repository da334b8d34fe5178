//! Builds the `messages` array for a completion request from a transcript.
//!
//! Three steps, always in this order:
//! 1. drop messages hidden from the model and project to `{role, content}`
//! 2. either window by word budget, or keep everything and prefix user turns
//! 3. inject the system prompt according to the configured mode
//!
//! The word budget counts whitespace-separated words, not model tokens.

use shared::agent_api::ChatMessage;
use shared::conversation::Message;
use shared::settings::{Settings, SystemPromptMode};

/// The settings that shape the outgoing array.
#[derive(Debug, Clone, Copy)]
pub struct ComposeOptions<'a> {
    /// Active prompt text. `None` or empty disables every kind of injection.
    pub system_prompt: Option<&'a str>,
    pub mode: SystemPromptMode,
    pub include_previous_messages: bool,
    pub context_window_words: usize,
}

impl<'a> ComposeOptions<'a> {
    pub fn from_settings(settings: &'a Settings) -> Self {
        Self {
            system_prompt: settings.active_prompt().map(|p| p.content.as_str()),
            mode: settings.system_prompt_mode,
            include_previous_messages: settings.include_previous_messages_in_context,
            context_window_words: settings.previous_messages_context_window,
        }
    }

    fn prompt(&self) -> Option<&'a str> {
        self.system_prompt.filter(|p| !p.is_empty())
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn with_prefix(prompt: &str, content: &str) -> String {
    format!("{}\n\n{}", prompt, content)
}

/// Newest-first walk that stops at the first message over budget.
fn window(messages: Vec<ChatMessage>, budget: usize) -> Vec<ChatMessage> {
    let mut used = 0;
    let mut kept = 0;
    for msg in messages.iter().rev() {
        let words = word_count(&msg.content);
        if used + words > budget {
            break;
        }
        used += words;
        kept += 1;
    }
    let start = messages.len() - kept;
    messages.into_iter().skip(start).collect()
}

pub fn compose(messages: &[Message], opts: &ComposeOptions<'_>) -> Vec<ChatMessage> {
    let visible: Vec<ChatMessage> = messages
        .iter()
        .filter(|m| !m.hidden_from_llm)
        .map(ChatMessage::from)
        .collect();
    let prompt = opts.prompt();

    if !opts.include_previous_messages {
        let Some(prompt) = prompt else {
            return visible;
        };
        return visible
            .into_iter()
            .map(|mut m| {
                if m.role == "user" {
                    m.content = with_prefix(prompt, &m.content);
                }
                m
            })
            .collect();
    }

    let mut out = window(visible, opts.context_window_words);
    let Some(prompt) = prompt else {
        return out;
    };

    match opts.mode {
        SystemPromptMode::Once => {
            if out.first().map(|m| m.role.as_str()) != Some("system") {
                out.insert(0, ChatMessage::new("system", prompt));
            }
        }
        SystemPromptMode::Always => {
            if let Some(last) = out.last_mut().filter(|m| m.role == "user") {
                last.content = with_prefix(prompt, &last.content);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "Be brief.";

    fn opts(mode: SystemPromptMode) -> ComposeOptions<'static> {
        ComposeOptions {
            system_prompt: Some(PROMPT),
            mode,
            include_previous_messages: true,
            context_window_words: 2000,
        }
    }

    fn contents(out: &[ChatMessage]) -> Vec<&str> {
        out.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_once_inserts_leading_system_message() {
        let msgs = vec![Message::user("hi"), Message::assistant("hello"), Message::user("again")];
        let out = compose(&msgs, &opts(SystemPromptMode::Once));
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], ChatMessage::new("system", PROMPT));
        assert_eq!(out[3].content, "again");
    }

    #[test]
    fn test_once_keeps_existing_system_lead() {
        let msgs = vec![Message::system("Custom"), Message::user("hi")];
        let out = compose(&msgs, &opts(SystemPromptMode::Once));
        assert_eq!(contents(&out), vec!["Custom", "hi"]);
    }

    #[test]
    fn test_always_prefixes_last_user_turn_only() {
        let msgs = vec![Message::user("first"), Message::assistant("a"), Message::user("second")];
        let out = compose(&msgs, &opts(SystemPromptMode::Always));
        assert_eq!(contents(&out), vec!["first", "a", "Be brief.\n\nsecond"]);
        assert!(out.iter().all(|m| m.role != "system"));

        let msgs = vec![Message::user("first"), Message::assistant("last")];
        let out = compose(&msgs, &opts(SystemPromptMode::Always));
        assert_eq!(contents(&out), vec!["first", "last"]);
    }

    #[test]
    fn test_hidden_messages_are_dropped() {
        let mut hidden = Message::user("secret words");
        hidden.hidden_from_llm = true;
        let msgs = vec![hidden, Message::notice("Error: boom"), Message::user("visible")];
        let out = compose(&msgs, &opts(SystemPromptMode::Once));
        assert_eq!(contents(&out), vec![PROMPT, "visible"]);
    }

    #[test]
    fn test_window_keeps_newest_that_fit_in_order() {
        let msgs = vec![
            Message::user("one two three four five"),
            Message::assistant("six seven eight nine ten"),
            Message::user("a b c d e"),
        ];
        let mut o = opts(SystemPromptMode::Once);
        o.system_prompt = None;

        o.context_window_words = 12;
        let out = compose(&msgs, &o);
        assert_eq!(contents(&out), vec!["six seven eight nine ten", "a b c d e"]);

        o.context_window_words = 8;
        let out = compose(&msgs, &o);
        assert_eq!(contents(&out), vec!["a b c d e"]);

        o.context_window_words = 15;
        assert_eq!(compose(&msgs, &o).len(), 3);
    }

    #[test]
    fn test_window_stops_at_first_overflow() {
        // The oldest message would fit on its own, but the walk has already stopped.
        let msgs = vec![
            Message::user("tiny"),
            Message::assistant("a very long reply of many words here"),
            Message::user("short question"),
        ];
        let mut o = opts(SystemPromptMode::Once);
        o.system_prompt = None;
        o.context_window_words = 4;
        let out = compose(&msgs, &o);
        assert_eq!(contents(&out), vec!["short question"]);
    }

    #[test]
    fn test_without_history_policy_every_user_turn_is_prefixed() {
        let msgs = vec![Message::user("q1"), Message::assistant("a1"), Message::user("q2")];
        let mut o = opts(SystemPromptMode::Once);
        o.include_previous_messages = false;
        o.context_window_words = 1;
        let out = compose(&msgs, &o);
        assert_eq!(
            contents(&out),
            vec!["Be brief.\n\nq1", "a1", "Be brief.\n\nq2"]
        );
        assert!(out.iter().all(|m| m.role != "system"));
    }

    #[test]
    fn test_empty_prompt_injects_nothing() {
        let msgs = vec![Message::user("hi")];
        for mode in [SystemPromptMode::Once, SystemPromptMode::Always] {
            let mut o = opts(mode);
            o.system_prompt = Some("");
            assert_eq!(contents(&compose(&msgs, &o)), vec!["hi"]);
            o.include_previous_messages = false;
            assert_eq!(contents(&compose(&msgs, &o)), vec!["hi"]);
        }
    }

    #[test]
    fn test_options_follow_settings() {
        let settings = Settings::default();
        let o = ComposeOptions::from_settings(&settings);
        assert_eq!(o.system_prompt, Some("You are a helpful AI assistant."));
        assert_eq!(o.context_window_words, 2000);
        assert!(o.include_previous_messages);
    }
}
