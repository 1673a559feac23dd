//! Local per-profile key-value store
//!
//! A single JSON object file under the profile directory, mirroring the
//! browser's per-profile string storage. Values are opaque strings; the key
//! pair export lives here under [`crate::local::KEY_PAIR_ITEM`].

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use straton_core::{StratonError, StratonResult};

/// Item key under which the serialized key pair is cached.
pub const KEY_PAIR_ITEM: &str = "straton-keypair";

const STORE_FILE: &str = "local-store.json";

pub struct LocalStore {
    path: PathBuf,
    items: Map<String, Value>,
}

impl LocalStore {
    /// Open (or create) the store file inside a profile directory.
    ///
    /// A corrupt store file is treated as empty rather than fatal: losing
    /// cached items must never block startup, the caller falls back to
    /// recovery or fresh generation.
    pub fn open(profile_dir: &Path) -> StratonResult<Self> {
        let path = profile_dir.join(STORE_FILE);
        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "local store corrupt, starting empty");
                    Map::new()
                }
            }
        } else {
            Map::new()
        };
        Ok(Self { path, items })
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).and_then(|v| v.as_str())
    }

    /// Set an item and flush the store file to disk.
    pub fn set_item(&mut self, key: &str, value: String) -> StratonResult<()> {
        self.items.insert(key.to_string(), Value::String(value));
        self.flush()
    }

    fn flush(&self) -> StratonResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.items)
            .map_err(|e| StratonError::LocalStore(format!("serializing store: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Default profile directory: `$XDG_CONFIG_HOME/straton` (or `~/.config/straton`).
pub fn default_profile_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        })
        .join("straton")
}
