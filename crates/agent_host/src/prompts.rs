//! System prompt library: the user's saved instructions and which one is active.

use chrono::Utc;
use shared::settings::{Settings, SystemPrompt, DEFAULT_PROMPT_ID};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("no system prompt with id {0}")]
    NotFound(String),
    #[error("the built-in default prompt cannot be deleted")]
    BuiltinUndeletable,
}

fn find_mut<'a>(settings: &'a mut Settings, id: &str) -> Result<&'a mut SystemPrompt, PromptError> {
    settings
        .system_prompts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| PromptError::NotFound(id.to_string()))
}

/// Append an empty "New Prompt" and return its id.
pub fn add_prompt(settings: &mut Settings) -> String {
    let mut millis = Utc::now().timestamp_millis();
    let mut id = format!("prompt_{}", millis);
    while settings.system_prompts.iter().any(|p| p.id == id) {
        millis += 1;
        id = format!("prompt_{}", millis);
    }
    settings.system_prompts.push(SystemPrompt {
        id: id.clone(),
        name: "New Prompt".to_string(),
        content: String::new(),
        is_default: false,
    });
    id
}

pub fn rename_prompt(settings: &mut Settings, id: &str, name: &str) -> Result<(), PromptError> {
    find_mut(settings, id)?.name = name.to_string();
    Ok(())
}

pub fn set_prompt_content(settings: &mut Settings, id: &str, content: &str) -> Result<(), PromptError> {
    find_mut(settings, id)?.content = content.to_string();
    Ok(())
}

/// Make `id` the only default prompt. The active selection follows it.
pub fn set_default_prompt(settings: &mut Settings, id: &str) -> Result<(), PromptError> {
    find_mut(settings, id)?;
    for prompt in &mut settings.system_prompts {
        prompt.is_default = prompt.id == id;
    }
    settings.active_system_prompt_id = Some(id.to_string());
    Ok(())
}

pub fn select_prompt(settings: &mut Settings, id: &str) -> Result<(), PromptError> {
    find_mut(settings, id)?;
    settings.active_system_prompt_id = Some(id.to_string());
    Ok(())
}

/// Remove a prompt. Deleting the active one falls back to the default-flagged
/// prompt, then to the first remaining prompt.
pub fn delete_prompt(settings: &mut Settings, id: &str) -> Result<(), PromptError> {
    if id == DEFAULT_PROMPT_ID {
        return Err(PromptError::BuiltinUndeletable);
    }
    let before = settings.system_prompts.len();
    settings.system_prompts.retain(|p| p.id != id);
    if settings.system_prompts.len() == before {
        return Err(PromptError::NotFound(id.to_string()));
    }

    if settings.active_system_prompt_id.as_deref() == Some(id) {
        settings.active_system_prompt_id = settings
            .system_prompts
            .iter()
            .find(|p| p.is_default)
            .or_else(|| settings.system_prompts.first())
            .map(|p| p.id.clone());
        info!(
            "active system prompt deleted, now {:?}",
            settings.active_system_prompt_id
        );
    }
    Ok(())
}
