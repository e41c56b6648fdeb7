//! Per-chat settings: interface language, catalog display language, and
//! the originals-only toggle for song searches.
//!
//! Settings are scoped per user in private chats and per chat in groups.
//! The store is a single JSON document loaded at startup and rewritten
//! atomically (tempfile + rename) after every change, so a crash can never
//! leave a half-written file behind.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Catalog display language, forwarded on every catalog request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CatalogLang {
    /// Whatever language the artist intended
    Default,
    Japanese,
    Romaji,
    #[default]
    English,
}

impl CatalogLang {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogLang::Default => "Default",
            CatalogLang::Japanese => "Japanese",
            CatalogLang::Romaji => "Romaji",
            CatalogLang::English => "English",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "Default" => Some(CatalogLang::Default),
            "Japanese" => Some(CatalogLang::Japanese),
            "Romaji" => Some(CatalogLang::Romaji),
            "English" => Some(CatalogLang::English),
            _ => None,
        }
    }

    pub const ALL: [CatalogLang; 4] = [
        CatalogLang::Default,
        CatalogLang::Japanese,
        CatalogLang::Romaji,
        CatalogLang::English,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_interface_lang")]
    pub interface_lang: String,
    #[serde(default)]
    pub catalog_lang: CatalogLang,
    #[serde(default)]
    pub originals_only: bool,
}

fn default_interface_lang() -> String {
    "en".to_string()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            interface_lang: default_interface_lang(),
            catalog_lang: CatalogLang::default(),
            originals_only: false,
        }
    }
}

/// JSON-file-backed settings store, safe for concurrent handler tasks.
pub struct SettingsStore {
    path: PathBuf,
    entries: Mutex<HashMap<i64, UserSettings>>,
}

impl SettingsStore {
    /// Open the store, loading any existing settings file. A missing file
    /// is a fresh start; an unreadable one is logged and treated the same
    /// rather than taking the bot down.
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "settings file unreadable, starting fresh");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        info!(path = %path.display(), "settings store opened");
        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        }
    }

    /// Settings for a scope id, falling back to defaults for new scopes.
    pub fn get(&self, scope: i64) -> UserSettings {
        self.entries
            .lock()
            .unwrap()
            .get(&scope)
            .cloned()
            .unwrap_or_default()
    }

    /// Apply a mutation to one scope's settings and persist the store.
    pub fn update<F>(&self, scope: i64, apply: F) -> Result<UserSettings>
    where
        F: FnOnce(&mut UserSettings),
    {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            let settings = entries.entry(scope).or_default();
            apply(settings);
            let snapshot = settings.clone();
            self.persist(&entries)?;
            snapshot
        };
        Ok(snapshot)
    }

    fn persist(&self, entries: &HashMap<i64, UserSettings>) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("creating temporary settings file")?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .context("replacing settings file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_unknown_scope() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(&dir.path().join("settings.json"));

        let settings = store.get(42);
        assert_eq!(settings.interface_lang, "en");
        assert_eq!(settings.catalog_lang, CatalogLang::English);
        assert!(!settings.originals_only);
    }

    #[test]
    fn test_update_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(&path);
        store
            .update(42, |s| {
                s.catalog_lang = CatalogLang::Romaji;
                s.originals_only = true;
            })
            .unwrap();

        // A fresh store sees the persisted values
        let reloaded = SettingsStore::open(&path);
        let settings = reloaded.get(42);
        assert_eq!(settings.catalog_lang, CatalogLang::Romaji);
        assert!(settings.originals_only);
        // Other scopes untouched
        assert_eq!(reloaded.get(7), UserSettings::default());
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.get(1), UserSettings::default());
    }

    #[test]
    fn test_catalog_lang_round_trip() {
        for lang in CatalogLang::ALL {
            assert_eq!(CatalogLang::from_str(lang.as_str()), Some(lang));
        }
        assert_eq!(CatalogLang::from_str("Klingon"), None);
    }
}
