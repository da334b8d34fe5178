//! UI-side state for the LLM UI app
//!
//! Everything the conversation model owns lives in the [`ChatController`].
//! This struct only adds what the widgets need between frames: input buffers,
//! the settings draft, and the receivers for background work.

use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

use agent_host::{ChatController, CommandOutcome};
use providers::ModelCatalog;
use services::{ConversationStore, SettingsStore};
use shared::agent_api::StreamUpdate;
use shared::catalog::ModelCatalogEntry;
use shared::events::UiCommand;
use shared::settings::Settings;
use tracing::{info, warn};

use crate::state::{run_catalog_refresh, run_completion};

/// What a click on a transcript message asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageAction {
    ToggleHidden(usize),
    Delete(usize),
    Search { text: String, wikipedia: bool },
}

pub struct UiState {
    pub controller: ChatController,
    pub catalog: Arc<ModelCatalog>,
    pub input_text: String,
    pub search_text: String,
    pub show_settings: bool,
    /// Edited copy of the settings; committed on Save.
    pub settings_draft: Settings,
    pub model_filter: String,
    pub stream_rx: Option<Receiver<StreamUpdate>>,
    pub models_rx: Option<Receiver<Vec<ModelCatalogEntry>>>,
}

impl UiState {
    pub fn new() -> Self {
        let controller = ChatController::new(
            SettingsStore::default_location(),
            ConversationStore::default_location(),
        );
        let settings = controller.state().settings.clone();
        let mut state = Self {
            controller,
            catalog: Arc::new(ModelCatalog::new()),
            input_text: String::new(),
            search_text: String::new(),
            show_settings: settings.effective_api_key().is_none(),
            settings_draft: settings,
            model_filter: String::new(),
            stream_rx: None,
            models_rx: None,
        };
        state.dispatch(UiCommand::RefreshModels);
        state
    }

    pub fn settings(&self) -> &Settings {
        &self.controller.state().settings
    }

    pub fn is_streaming(&self) -> bool {
        self.controller.is_streaming()
    }

    pub fn dispatch(&mut self, command: UiCommand) {
        let stop = command == UiCommand::StopGeneration;
        let outcome = self.controller.dispatch(command);
        if stop {
            self.stream_rx = None;
        }
        self.handle(outcome);
    }

    fn handle(&mut self, outcome: CommandOutcome) {
        match outcome {
            CommandOutcome::Nothing => {}
            CommandOutcome::StartCompletion(job) => {
                let (tx, rx) = channel();
                self.stream_rx = Some(rx);
                std::thread::spawn(move || run_completion(job, tx));
            }
            CommandOutcome::RefreshModels(client) => {
                let (tx, rx) = channel();
                self.models_rx = Some(rx);
                let catalog = Arc::clone(&self.catalog);
                std::thread::spawn(move || run_catalog_refresh(catalog, client, tx));
            }
            CommandOutcome::OpenUrl(url) => {
                info!("opening {}", url);
                if let Err(e) = open::that(&url) {
                    warn!("could not open {}: {}", url, e);
                }
            }
        }
    }

    /// Drain stream updates (non-blocking).
    pub fn poll_stream(&mut self) {
        let Some(rx) = &self.stream_rx else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(update) => self.controller.apply_stream_update(update),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.stream_rx = None;
                    break;
                }
            }
        }
    }

    pub fn poll_models(&mut self) {
        let Some(rx) = &self.models_rx else {
            return;
        };
        if let Ok(models) = rx.try_recv() {
            self.models_rx = None;
            self.controller.set_models(models);
        }
    }

    pub fn send_input(&mut self) {
        let text = std::mem::take(&mut self.input_text);
        if text.trim().is_empty() {
            return;
        }
        self.dispatch(UiCommand::SendMessage(text));
    }

    pub fn open_settings(&mut self) {
        self.settings_draft = self.settings().clone();
        self.show_settings = true;
    }

    pub fn save_settings(&mut self) {
        let draft = self.settings_draft.clone();
        self.dispatch(UiCommand::SaveSettings(Box::new(draft)));
        self.show_settings = false;
    }

    /// Sidebar visibility is a persisted setting.
    pub fn toggle_sidebar(&mut self) {
        let mut settings = self.settings().clone();
        settings.sidebar_visible = !settings.sidebar_visible;
        self.settings_draft.sidebar_visible = settings.sidebar_visible;
        self.dispatch(UiCommand::SaveSettings(Box::new(settings)));
    }

    pub fn resize_sidebar(&mut self, width: f32) {
        self.dispatch(UiCommand::SetSidebarWidth(width));
        self.settings_draft.sidebar_width = self.settings().sidebar_width;
    }

    pub fn refresh_models(&mut self) {
        self.catalog.invalidate();
        self.dispatch(UiCommand::RefreshModels);
    }

    pub fn apply_message_action(&mut self, action: MessageAction) {
        let command = match action {
            MessageAction::ToggleHidden(i) => UiCommand::ToggleHidden(i),
            MessageAction::Delete(i) => UiCommand::DeleteMessage(i),
            MessageAction::Search { text, wikipedia } => {
                UiCommand::SearchSelection { text, wikipedia }
            }
        };
        self.dispatch(command);
    }

    pub fn export_conversation(&mut self) {
        let name = format!("conversation-{}.json", self.controller.state().current.id);
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(name)
            .save_file()
        {
            self.dispatch(UiCommand::ExportConversation(path));
        }
    }

    pub fn import_conversation(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.dispatch(UiCommand::ImportConversation(path));
        }
    }
}
