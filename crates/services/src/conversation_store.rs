//! One JSON record per conversation in a `conversations/` directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use shared::conversation::Conversation;
use tracing::{debug, warn};

use crate::paths;

pub const CONVERSATIONS_DIR: &str = "conversations";

pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    /// Store rooted at `<data_dir>/conversations`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join(CONVERSATIONS_DIR),
        }
    }

    pub fn default_location() -> Self {
        Self::new(&paths::data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            bail!("invalid conversation id {:?}", id);
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let path = self.record_path(&conversation.id)?;
        let json = serde_json::to_string_pretty(conversation)?;
        paths::write_atomic(&path, &json)?;
        debug!("saved conversation {}", conversation.id);
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Option<Conversation>> {
        let path = self.record_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_conversation(&path).map(Some)
    }

    /// Every readable record. Unreadable files are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<Conversation>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("listing {}", self.dir.display()));
            }
        };

        let mut conversations = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_conversation(&path) {
                Ok(conv) => conversations.push(conv),
                Err(e) => warn!("skipping {}: {:#}", path.display(), e),
            }
        }
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.record_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("deleting {}", path.display())),
        }
    }

    pub fn export(&self, conversation: &Conversation, dest: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(conversation)?;
        fs::write(dest, json).with_context(|| format!("exporting to {}", dest.display()))?;
        Ok(())
    }

    /// Read a conversation file from anywhere and add it to the store.
    pub fn import(&self, src: &Path) -> Result<Conversation> {
        let conversation = read_conversation(src)?;
        self.save(&conversation)?;
        Ok(conversation)
    }
}

fn read_conversation(path: &Path) -> Result<Conversation> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}
