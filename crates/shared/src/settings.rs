use serde::{Deserialize, Serialize};

pub const DEFAULT_PROMPT_ID: &str = "default";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// A reusable instruction prepended to conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPrompt {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub is_default: bool,
}

impl SystemPrompt {
    pub fn builtin() -> Self {
        Self {
            id: DEFAULT_PROMPT_ID.to_string(),
            name: "Default".to_string(),
            content: "You are a helpful AI assistant.".to_string(),
            is_default: true,
        }
    }
}

/// How the active system prompt is applied to outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemPromptMode {
    /// Leading system message, once per request.
    #[default]
    Once,
    /// Prefixed onto the latest user turn.
    Always,
}

impl SystemPromptMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            SystemPromptMode::Once => "Once (leading system message)",
            SystemPromptMode::Always => "Always (prefix every user turn)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Google,
    Kagi,
    Duckduckgo,
    Bing,
}

impl SearchEngine {
    pub fn all() -> [SearchEngine; 4] {
        [
            SearchEngine::Google,
            SearchEngine::Kagi,
            SearchEngine::Duckduckgo,
            SearchEngine::Bing,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SearchEngine::Google => "Google",
            SearchEngine::Kagi => "Kagi",
            SearchEngine::Duckduckgo => "DuckDuckGo",
            SearchEngine::Bing => "Bing",
        }
    }

    /// Search URL for `query` on this engine. The query is percent-encoded.
    pub fn search_url(&self, query: &str) -> String {
        let q = urlencoding::encode(query.trim());
        match self {
            SearchEngine::Google => format!("https://www.google.com/search?q={}", q),
            SearchEngine::Kagi => format!("https://kagi.com/search?q={}", q),
            SearchEngine::Duckduckgo => format!("https://duckduckgo.com/?q={}", q),
            SearchEngine::Bing => format!("https://www.bing.com/search?q={}", q),
        }
    }
}

pub fn wikipedia_url(query: &str) -> String {
    format!(
        "https://en.wikipedia.org/wiki/Special:Search?search={}",
        urlencoding::encode(query.trim())
    )
}

/// Process-wide configuration, persisted as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub default_model: String,
    pub theme: Theme,
    pub font_size: u32,
    /// Kept so older settings files round-trip; egui text fields have no spell checker.
    pub spell_check: bool,
    pub auto_save: bool,
    pub search_engine: SearchEngine,
    pub system_prompts: Vec<SystemPrompt>,
    pub active_system_prompt_id: Option<String>,
    pub system_prompt_mode: SystemPromptMode,
    pub include_previous_messages_in_context: bool,
    /// Word budget for prior messages (not a token count).
    pub previous_messages_context_window: usize,
    pub selected_models: Vec<String>,
    pub max_tokens: u32,
    pub web_search: bool,
    pub web_search_max_results: u32,
    pub sidebar_width: f32,
    pub sidebar_visible: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_model: "openai/gpt-3.5-turbo".into(),
            theme: Theme::Light,
            font_size: 14,
            spell_check: true,
            auto_save: true,
            search_engine: SearchEngine::Google,
            system_prompts: vec![SystemPrompt::builtin()],
            active_system_prompt_id: Some(DEFAULT_PROMPT_ID.to_string()),
            system_prompt_mode: SystemPromptMode::Once,
            include_previous_messages_in_context: true,
            previous_messages_context_window: 2000,
            selected_models: Vec::new(),
            max_tokens: 2048,
            web_search: false,
            web_search_max_results: 5,
            sidebar_width: 300.0,
            sidebar_visible: true,
        }
    }
}

impl Settings {
    /// API key from settings, falling back to `OPENROUTER_API_KEY`.
    pub fn effective_api_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// The prompt selected by `active_system_prompt_id`, if it still exists.
    pub fn active_prompt(&self) -> Option<&SystemPrompt> {
        let id = self.active_system_prompt_id.as_deref()?;
        self.system_prompts.iter().find(|p| p.id == id)
    }

    /// Model for a fresh conversation: the default when it is enabled,
    /// else the first enabled model, else the default anyway.
    pub fn initial_model(&self) -> String {
        if self.selected_models.is_empty()
            || self.selected_models.iter().any(|m| m == &self.default_model)
        {
            return self.default_model.clone();
        }
        self.selected_models[0].clone()
    }

    pub fn web_search_results(&self) -> Option<u32> {
        self.web_search.then_some(self.web_search_max_results)
    }
}
