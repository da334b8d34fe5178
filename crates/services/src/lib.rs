pub mod conversation_store;
pub mod paths;
pub mod settings_store;

pub use conversation_store::ConversationStore;
pub use settings_store::SettingsStore;
