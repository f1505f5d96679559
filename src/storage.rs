//! Note and settings persistence.
//!
//! The note is stored as a raw string so drafts written by earlier builds of
//! the editor still load. Settings are JSON.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::StorageError;
use crate::settings::Settings;

pub const CONTENT_KEY: &str = "lumina_notes_content";
pub const SETTINGS_KEY: &str = "lumina_notes_settings";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStore;

/// Blocked storage (privacy settings, sandboxed frames) comes back as
/// `Err` or `None`; both are errors, never a panic.
fn storage_handle<S, E: std::fmt::Debug>(lookup: Result<Option<S>, E>) -> Result<S, StorageError> {
    lookup
        .map_err(|err| StorageError::Browser(format!("{err:?}")))?
        .ok_or(StorageError::Unavailable)
}

impl BrowserStore {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window().ok_or(StorageError::Unavailable)?;
        storage_handle(window.local_storage())
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|err| StorageError::Browser(format!("{err:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|err| StorageError::Browser(format!("{err:?}")))
    }
}

/// In-memory store for tests and non-browser hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoteStore<S> {
    store: S,
}

impl<S: KeyValueStore> NoteStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn load_content(&self) -> Result<Option<String>, StorageError> {
        self.store.get(CONTENT_KEY)
    }

    pub fn save_content(&self, text: &str) -> Result<(), StorageError> {
        self.store.set(CONTENT_KEY, text)
    }

    /// Stored settings, or the defaults when nothing usable is stored.
    pub fn load_settings(&self) -> Settings {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Settings::default(),
            Err(err) => {
                tracing::warn!(%err, "could not read settings");
                return Settings::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring malformed settings");
            Settings::default()
        })
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Theme, ViewMode};

    #[test]
    fn content_is_stored_raw() {
        let notes = NoteStore::new(MemoryStore::default());
        assert_eq!(notes.load_content().unwrap(), None);

        notes.save_content("# Note\n$x$").unwrap();
        assert_eq!(notes.store.get(CONTENT_KEY).unwrap().as_deref(), Some("# Note\n$x$"));
        assert_eq!(notes.load_content().unwrap().as_deref(), Some("# Note\n$x$"));
    }

    #[test]
    fn settings_round_trip() {
        let notes = NoteStore::new(MemoryStore::default());
        let settings = Settings {
            theme: Theme::Dark,
            view: ViewMode::Preview,
            editor_width: Some(35.0),
        };
        notes.save_settings(&settings).unwrap();
        assert_eq!(notes.load_settings(), settings);
    }

    #[test]
    fn blocked_local_storage_is_an_error() {
        assert!(matches!(
            storage_handle::<u8, &str>(Ok(None)),
            Err(StorageError::Unavailable)
        ));
        match storage_handle::<u8, &str>(Err("SecurityError")) {
            Err(StorageError::Browser(message)) => assert!(message.contains("SecurityError")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(storage_handle::<u8, &str>(Ok(Some(7))), Ok(7)));
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let notes = NoteStore::new(MemoryStore::default());
        assert_eq!(notes.load_settings(), Settings::default());

        notes.store.set(SETTINGS_KEY, "{not json").unwrap();
        assert_eq!(notes.load_settings(), Settings::default());

        notes.store.set(SETTINGS_KEY, r#"{"theme":"neon"}"#).unwrap();
        assert_eq!(notes.load_settings(), Settings::default());
    }
}
