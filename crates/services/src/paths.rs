use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DATA_DIR_ENV: &str = "LLM_UI_DATA_DIR";

/// Root for settings and conversations: `LLM_UI_DATA_DIR`, else the platform config dir.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("com.local", "LLM UI", "LLMUI")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./llm-ui-data"))
}

/// Write `contents` next to `path` first, then rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents)
        .with_context(|| format!("writing {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
