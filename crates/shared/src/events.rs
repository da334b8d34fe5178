//! Typed commands emitted by the front end and consumed by the chat controller.

use std::path::PathBuf;

use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    NewConversation,
    OpenConversation(String),
    DeleteConversation(String),
    SaveConversation,
    ExportConversation(PathBuf),
    ImportConversation(PathBuf),
    SendMessage(String),
    StopGeneration,
    ToggleHidden(usize),
    DeleteMessage(usize),
    SelectModel(String),
    SelectSystemPrompt(String),
    SaveSettings(Box<Settings>),
    SetSearchQuery(String),
    /// Resized sidebar, in points.
    SetSidebarWidth(f32),
    RefreshModels,
    /// Look up selected transcript text on the web.
    SearchSelection { text: String, wikipedia: bool },
}
