//! The chat controller: sole owner of application state.
//!
//! The front end turns user input into [`UiCommand`]s and hands them to
//! [`ChatController::dispatch`]. Anything that has to leave the UI thread
//! (a completion, a catalog refresh, opening a browser) comes back as a
//! [`CommandOutcome`] for the caller to run. Stream progress is fed back in
//! through [`ChatController::apply_stream_update`]; updates tagged with any
//! sequence number other than the in-flight one are dropped.

use std::path::Path;

use futures::future::{AbortHandle, AbortRegistration};
use providers::{CompletionRequest, OpenRouterClient};
use services::{ConversationStore, SettingsStore};
use shared::agent_api::{CompletionResult, StreamEvent, StreamUpdate};
use shared::catalog::ModelCatalogEntry;
use shared::conversation::{summarize, Conversation, ConversationSummary, Message};
use shared::error::ChatError;
use shared::events::UiCommand;
use shared::settings::{wikipedia_url, Settings};
use tracing::{debug, error, info, warn};

use crate::composer::{compose, ComposeOptions};
use crate::prompts;

/// A completion the caller should start on a background runtime.
pub struct CompletionJob {
    pub seq: u64,
    pub client: OpenRouterClient,
    pub request: CompletionRequest,
    pub abort: AbortRegistration,
}

pub enum CommandOutcome {
    Nothing,
    StartCompletion(CompletionJob),
    RefreshModels(OpenRouterClient),
    OpenUrl(String),
}

/// The request currently streaming into the open conversation.
#[derive(Debug)]
pub struct InFlight {
    pub seq: u64,
    pub conversation_id: String,
    pub model: String,
    pub partial: String,
    pub cost_estimate: Option<f64>,
    abort: AbortHandle,
}

#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,
    pub current: Conversation,
    /// Saved conversations, current one included once it has been written.
    pub conversations: Vec<Conversation>,
    pub models: Vec<ModelCatalogEntry>,
    pub search_query: String,
    pub streaming: Option<InFlight>,
    /// Last persistence or I/O problem worth showing.
    pub status: Option<String>,
}

pub struct ChatController {
    state: AppState,
    settings_store: SettingsStore,
    store: ConversationStore,
    next_seq: u64,
}

impl ChatController {
    /// Load settings and the saved conversations, and start a fresh conversation.
    pub fn new(settings_store: SettingsStore, store: ConversationStore) -> Self {
        let (settings, loaded) = settings_store.load_or_default();
        if !loaded {
            info!("no saved settings at {}", settings_store.path().display());
        }
        let mut status = None;
        let conversations = store.load_all().unwrap_or_else(|e| {
            error!("failed to load conversations: {:#}", e);
            status = Some(format!("Failed to load conversations: {}", e));
            Vec::new()
        });
        info!("loaded {} conversations", conversations.len());

        let current = Conversation::new(settings.initial_model());
        Self {
            state: AppState {
                settings,
                current,
                conversations,
                models: Vec::new(),
                search_query: String::new(),
                streaming: None,
                status,
            },
            settings_store,
            store,
            next_seq: 0,
        }
    }

    /// Both stores rooted at `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self::new(SettingsStore::new(data_dir), ConversationStore::new(data_dir))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state.streaming.is_some()
    }

    pub fn summaries(&self) -> Vec<ConversationSummary> {
        summarize(&self.state.conversations, &self.state.search_query)
    }

    pub fn client(&self) -> OpenRouterClient {
        OpenRouterClient::from_settings(&self.state.settings)
    }

    pub fn set_models(&mut self, models: Vec<ModelCatalogEntry>) {
        debug!("catalog now has {} models", models.len());
        self.state.models = models;
    }

    pub fn dispatch(&mut self, command: UiCommand) -> CommandOutcome {
        match command {
            UiCommand::NewConversation => {
                self.cancel_in_flight();
                self.state.current = Conversation::new(self.state.settings.initial_model());
            }
            UiCommand::OpenConversation(id) => self.open(&id),
            UiCommand::DeleteConversation(id) => self.delete_conversation(&id),
            UiCommand::SaveConversation => self.persist(),
            UiCommand::ExportConversation(path) => {
                match self.store.export(&self.state.current, &path) {
                    Ok(()) => self.state.status = Some(format!("Exported to {}", path.display())),
                    Err(e) => self.report("export failed", e),
                }
            }
            UiCommand::ImportConversation(path) => match self.store.import(&path) {
                Ok(conversation) => {
                    info!("imported conversation {}", conversation.id);
                    self.cancel_in_flight();
                    self.upsert(conversation.clone());
                    self.state.current = conversation;
                }
                Err(e) => self.report("import failed", e),
            },
            UiCommand::SendMessage(text) => return self.begin_send(&text),
            UiCommand::StopGeneration => self.cancel_in_flight(),
            UiCommand::ToggleHidden(index) => {
                if self.state.current.toggle_hidden(index).is_some() {
                    self.autosave();
                }
            }
            UiCommand::DeleteMessage(index) => {
                if self.state.current.remove_message(index).is_some() {
                    self.autosave();
                }
            }
            UiCommand::SelectModel(id) => {
                self.state.current.model = id;
                self.autosave();
            }
            UiCommand::SelectSystemPrompt(id) => {
                match prompts::select_prompt(&mut self.state.settings, &id) {
                    Ok(()) => self.save_settings(),
                    Err(e) => warn!("{}", e),
                }
            }
            UiCommand::SaveSettings(settings) => {
                self.state.settings = *settings;
                self.save_settings();
                return CommandOutcome::RefreshModels(self.client());
            }
            UiCommand::SetSearchQuery(query) => self.state.search_query = query,
            UiCommand::SetSidebarWidth(width) => {
                let width = width.round();
                if width > 0.0 && (width - self.state.settings.sidebar_width).abs() >= 1.0 {
                    self.state.settings.sidebar_width = width;
                    self.save_settings();
                }
            }
            UiCommand::RefreshModels => return CommandOutcome::RefreshModels(self.client()),
            UiCommand::SearchSelection { text, wikipedia } => {
                let text = text.trim();
                if text.is_empty() {
                    return CommandOutcome::Nothing;
                }
                let url = if wikipedia {
                    wikipedia_url(text)
                } else {
                    self.state.settings.search_engine.search_url(text)
                };
                return CommandOutcome::OpenUrl(url);
            }
        }
        CommandOutcome::Nothing
    }

    fn begin_send(&mut self, text: &str) -> CommandOutcome {
        let text = text.trim();
        if text.is_empty() {
            return CommandOutcome::Nothing;
        }
        if self.is_streaming() {
            warn!("send ignored: a reply is still streaming");
            return CommandOutcome::Nothing;
        }

        self.state.current.messages.push(Message::user(text));

        let client = self.client();
        if !client.has_api_key() {
            let err = ChatError::missing_api_key();
            warn!("{}", err);
            self.state.current.messages.push(Message::notice(err.user_message()));
            self.autosave();
            return CommandOutcome::Nothing;
        }
        self.autosave();

        let settings = &self.state.settings;
        let messages = compose(
            &self.state.current.messages,
            &ComposeOptions::from_settings(settings),
        );
        let model = self.state.current.model.clone();
        let pricing = self
            .state
            .models
            .iter()
            .find(|m| m.id == model)
            .and_then(|m| m.pricing);
        let request = CompletionRequest {
            model: model.clone(),
            messages,
            max_tokens: settings.max_tokens,
            web_search_results: settings.web_search_results(),
            pricing,
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        let (abort, registration) = AbortHandle::new_pair();
        info!(
            "sending {} messages to {} (seq {})",
            request.messages.len(),
            model,
            seq
        );
        self.state.streaming = Some(InFlight {
            seq,
            conversation_id: self.state.current.id.clone(),
            model,
            partial: String::new(),
            cost_estimate: None,
            abort,
        });

        CommandOutcome::StartCompletion(CompletionJob {
            seq,
            client,
            request,
            abort: registration,
        })
    }

    /// Apply one event from a background completion.
    pub fn apply_stream_update(&mut self, update: StreamUpdate) {
        let Some(in_flight) = self.state.streaming.as_mut() else {
            debug!("dropping stream update {} with nothing in flight", update.seq);
            return;
        };
        if in_flight.seq != update.seq {
            debug!(
                "dropping stale stream update {} (in flight {})",
                update.seq, in_flight.seq
            );
            return;
        }

        match update.event {
            StreamEvent::Delta(text) => in_flight.partial.push_str(&text),
            StreamEvent::CostEstimate(cost) => in_flight.cost_estimate = Some(cost),
            StreamEvent::Finished(result) => {
                if let Some(in_flight) = self.state.streaming.take() {
                    self.commit_reply(in_flight, result);
                }
            }
            StreamEvent::Failed(err) if err.is_cancelled() => self.state.streaming = None,
            StreamEvent::Failed(err) => {
                self.state.streaming = None;
                warn!("completion failed: {}", err);
                self.state.current.messages.push(Message::notice(err.user_message()));
                self.autosave();
            }
            StreamEvent::Cancelled => self.state.streaming = None,
        }
    }

    fn commit_reply(&mut self, in_flight: InFlight, result: CompletionResult) {
        if in_flight.conversation_id != self.state.current.id {
            warn!("reply for {} arrived after switching away", in_flight.conversation_id);
            return;
        }
        let model_name = self
            .state
            .models
            .iter()
            .find(|m| m.id == in_flight.model)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| in_flight.model.clone());

        let mut reply = Message::assistant(result.full_content);
        reply.model_id = Some(in_flight.model);
        reply.model_name = Some(model_name);
        reply.cost = result.cost;
        reply.usage = result.usage;
        reply.request_id = result.request_id;
        reply.generation = result.generation;

        let conversation = &mut self.state.current;
        conversation.messages.push(reply);
        if conversation.user_message_count() == 1 {
            conversation.auto_title();
        }
        self.autosave();
    }

    /// Abort the in-flight request. Its partial reply is discarded.
    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.state.streaming.take() {
            info!("cancelling request {}", in_flight.seq);
            in_flight.abort.abort();
        }
    }

    fn open(&mut self, id: &str) {
        if self.state.current.id == id {
            return;
        }
        let cached = self.state.conversations.iter().find(|c| c.id == id).cloned();
        let found = match cached {
            Some(c) => Some(c),
            None => match self.store.load(id) {
                Ok(c) => c,
                Err(e) => {
                    self.report("open failed", e);
                    None
                }
            },
        };
        match found {
            Some(conversation) => {
                self.cancel_in_flight();
                self.state.current = conversation;
            }
            None => warn!("conversation {} not found", id),
        }
    }

    fn delete_conversation(&mut self, id: &str) {
        if let Err(e) = self.store.delete(id) {
            self.report("delete failed", e);
            return;
        }
        self.state.conversations.retain(|c| c.id != id);
        if self.state.current.id == id {
            self.cancel_in_flight();
            self.state.current = Conversation::new(self.state.settings.initial_model());
        }
    }

    fn upsert(&mut self, conversation: Conversation) {
        match self
            .state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            Some(existing) => *existing = conversation,
            None => self.state.conversations.push(conversation),
        }
    }

    fn autosave(&mut self) {
        if self.state.settings.auto_save && !self.state.current.messages.is_empty() {
            self.persist();
        }
    }

    fn persist(&mut self) {
        let conversation = self.state.current.clone();
        match self.store.save(&conversation) {
            Ok(()) => self.upsert(conversation),
            Err(e) => self.report("save failed", e),
        }
    }

    fn save_settings(&mut self) {
        if let Err(e) = self.settings_store.save(&self.state.settings) {
            self.report("saving settings failed", e);
        }
    }

    fn report(&mut self, what: &str, e: anyhow::Error) {
        error!("{}: {:#}", what, e);
        self.state.status = Some(format!("{}: {}", what, e));
    }
}
