use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::export::{ExportDocument, ThemeFile};
use crate::storage::{KeyValueStore, StorageError};
use crate::theme::{TokenPatch, TokenRecord};

mod sections;

pub use sections::{SectionId, SectionVisibility};

pub const TOKENS_KEY: &str = "scenestealer-tokens";
pub const SECTIONS_KEY: &str = "scenestealer-sections";
pub const DARK_KEY: &str = "scenestealer-dark";

const DARK_BACKGROUND: &str = "#0a0c10";
const DARK_FOREGROUND: &str = "#ffffff";

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist theme state")]
    Storage(#[from] StorageError),
    #[error("failed to serialize theme state")]
    Serialize(#[from] serde_json::Error),
}

/// Everything the preview renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThemeState {
    pub tokens: TokenRecord,
    pub sections: SectionVisibility,
}

/// Outcome of reading one half of the persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfStatus {
    Missing,
    Restored,
    Corrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub tokens: HalfStatus,
    pub sections: HalfStatus,
}

/// Light colors to put back when the dark override is turned off. Present in
/// storage only while dark mode is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DarkRestore {
    pub bg: String,
    pub fg: String,
}

type RefreshListener = Box<dyn FnMut(&ThemeState)>;

/// Single-writer owner of the current tokens and section flags.
///
/// Every mutation writes through to `storage` and then notifies the refresh
/// listeners.
pub struct TokenStore<S: KeyValueStore> {
    storage: S,
    state: ThemeState,
    dark_restore: Option<DarkRestore>,
    listeners: Vec<RefreshListener>,
}

impl<S: KeyValueStore> std::fmt::Debug for TokenStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("state", &self.state)
            .field("dark_restore", &self.dark_restore)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S: KeyValueStore> TokenStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            state: ThemeState::default(),
            dark_restore: None,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &ThemeState {
        &self.state
    }

    pub fn tokens(&self) -> &TokenRecord {
        &self.state.tokens
    }

    pub fn sections(&self) -> &SectionVisibility {
        &self.state.sections
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_restore.is_some()
    }

    pub fn on_refresh(&mut self, listener: impl FnMut(&ThemeState) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Restore the persisted snapshot over the in-memory state. Each half is
    /// read on its own; a missing or corrupt half leaves that half untouched.
    pub fn load(&mut self) -> LoadReport {
        let tokens = match self.read_half(TOKENS_KEY) {
            Some(Ok(value)) if value.is_object() => {
                self.state.tokens.merge(&TokenPatch::from_value(&value));
                HalfStatus::Restored
            }
            Some(_) => HalfStatus::Corrupt,
            None => HalfStatus::Missing,
        };

        let sections = match self.read_half(SECTIONS_KEY) {
            Some(Ok(value)) if self.state.sections.merge_value(&value) => HalfStatus::Restored,
            Some(_) => HalfStatus::Corrupt,
            None => HalfStatus::Missing,
        };

        self.dark_restore = match self.read_half(DARK_KEY) {
            Some(Ok(value)) => serde_json::from_value(value)
                .map_err(|err| {
                    tracing::warn!(key = DARK_KEY, ?err, "stored dark override unreadable");
                })
                .ok(),
            _ => None,
        };

        if tokens == HalfStatus::Corrupt {
            tracing::warn!(key = TOKENS_KEY, "stored tokens unreadable; keeping defaults");
        }
        if sections == HalfStatus::Corrupt {
            tracing::warn!(key = SECTIONS_KEY, "stored sections unreadable; keeping defaults");
        }
        tracing::debug!(?tokens, ?sections, dark = self.dark_mode(), "loaded persisted snapshot");

        LoadReport { tokens, sections }
    }

    fn read_half(&self, key: &str) -> Option<Result<Value, ()>> {
        match self.storage.get(key) {
            Ok(Some(serialized)) => Some(serde_json::from_str(&serialized).map_err(|err| {
                tracing::debug!(key, ?err, "stored value is not valid JSON");
            })),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, ?err, "failed to read stored value");
                Some(Err(()))
            }
        }
    }

    /// Merge a full or partial record, persist, refresh.
    pub fn apply(&mut self, patch: &TokenPatch) -> StoreResult<()> {
        self.merge_tokens(patch);
        self.commit()
    }

    /// Explicit bg/fg values replace the pair the dark override would restore.
    fn merge_tokens(&mut self, patch: &TokenPatch) {
        self.state.tokens.merge(patch);
        if let Some(restore) = &mut self.dark_restore {
            if let Some(bg) = &patch.colors.bg {
                restore.bg = bg.clone();
            }
            if let Some(fg) = &patch.colors.fg {
                restore.fg = fg.clone();
            }
        }
    }

    /// Unknown ids are stored as given.
    pub fn set_section_visible(&mut self, id: &str, visible: bool) -> StoreResult<()> {
        if SectionId::parse(id).is_none() {
            tracing::debug!(id, "storing visibility for an unrenderable section");
        }
        self.state.sections.set(id, visible);
        self.commit()
    }

    /// Dark override for background and foreground. Turning it off restores
    /// the light pair, which survives reloads and follows later bg/fg changes.
    pub fn set_dark_mode(&mut self, enabled: bool) -> StoreResult<()> {
        let colors = &mut self.state.tokens.colors;
        if enabled {
            if self.dark_restore.is_none() {
                self.dark_restore = Some(DarkRestore {
                    bg: colors.bg.clone(),
                    fg: colors.fg.clone(),
                });
            }
            colors.bg = DARK_BACKGROUND.to_string();
            colors.fg = DARK_FOREGROUND.to_string();
        } else {
            let Some(restore) = self.dark_restore.take() else {
                return Ok(());
            };
            colors.bg = restore.bg;
            colors.fg = restore.fg;
        }
        self.commit()
    }

    /// Restore an exported `{tokens, sections, ...}` document.
    pub fn import(&mut self, document: &Value) -> StoreResult<()> {
        if let Some(tokens) = document.get("tokens") {
            self.merge_tokens(&TokenPatch::from_value(tokens));
        }
        if let Some(sections) = document.get("sections") {
            if !self.state.sections.merge_value(sections) {
                tracing::warn!("imported sections are not an object; ignoring");
            }
        }
        self.commit()
    }

    pub fn export(&self) -> ExportDocument {
        self.export_at(Utc::now())
    }

    pub fn export_at(&self, at: DateTime<Utc>) -> ExportDocument {
        ExportDocument::new(&self.state.tokens, &self.state.sections, at)
    }

    pub fn theme_file(&self) -> ThemeFile {
        ThemeFile {
            tokens: self.state.tokens.clone(),
        }
    }

    fn commit(&mut self) -> StoreResult<()> {
        let persisted = self.persist();
        if let Err(err) = &persisted {
            tracing::warn!(?err, "could not persist theme state");
        }
        self.refresh();
        persisted
    }

    fn persist(&self) -> StoreResult<()> {
        let tokens = serde_json::to_string(&self.state.tokens)?;
        let sections = serde_json::to_string(&self.state.sections)?;
        self.storage.set(TOKENS_KEY, &tokens)?;
        self.storage.set(SECTIONS_KEY, &sections)?;
        match &self.dark_restore {
            Some(restore) => self.storage.set(DARK_KEY, &serde_json::to_string(restore)?)?,
            None => self.storage.remove(DARK_KEY)?,
        }
        Ok(())
    }

    fn refresh(&mut self) {
        for listener in &mut self.listeners {
            listener(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use crate::theme::{ColorOverrides, ShadowLevel, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
    use serde_json::json;

    fn custom_record() -> TokenRecord {
        let mut record = TokenRecord::default();
        record.colors.primary = "#101010".to_string();
        record.colors.bg = "#202020".to_string();
        record.colors.fg = "#303030".to_string();
        record.colors.accent = "#404040".to_string();
        record.corner_radius = 18;
        record.shadow_level = ShadowLevel::Lg;
        record
    }

    #[test]
    fn load_with_empty_storage_keeps_defaults() {
        let mut store = TokenStore::new(MemoryKeyValueStore::new());
        let report = store.load();

        assert_eq!(report.tokens, HalfStatus::Missing);
        assert_eq!(report.sections, HalfStatus::Missing);
        assert_eq!(store.state(), &ThemeState::default());
    }

    #[test]
    fn corrupt_sections_do_not_discard_valid_tokens() {
        let storage = MemoryKeyValueStore::new();
        let stored_tokens = serde_json::to_string(&custom_record()).unwrap();
        storage.set(TOKENS_KEY, &stored_tokens).unwrap();
        storage.set(SECTIONS_KEY, "{not json").unwrap();

        let mut store = TokenStore::new(&storage);
        let report = store.load();

        assert_eq!(report.tokens, HalfStatus::Restored);
        assert_eq!(report.sections, HalfStatus::Corrupt);
        assert_eq!(store.tokens(), &custom_record());
        assert_eq!(store.sections(), &SectionVisibility::default());
        assert_eq!(
            storage.get(TOKENS_KEY).unwrap().as_deref(),
            Some(stored_tokens.as_str())
        );
    }

    #[test]
    fn corrupt_tokens_do_not_discard_valid_sections() {
        let storage = MemoryKeyValueStore::new();
        storage.set(TOKENS_KEY, "[1,2").unwrap();
        storage
            .set(SECTIONS_KEY, r#"{"pricing": true, "hero": false}"#)
            .unwrap();

        let mut store = TokenStore::new(&storage);
        let report = store.load();

        assert_eq!(report.tokens, HalfStatus::Corrupt);
        assert_eq!(report.sections, HalfStatus::Restored);
        assert_eq!(store.tokens(), &TokenRecord::default());
        assert!(store.sections().is_visible("pricing"));
        assert!(!store.sections().is_visible("hero"));
    }

    #[test]
    fn load_merges_partial_tokens_over_defaults() {
        let storage = MemoryKeyValueStore::new();
        storage
            .set(TOKENS_KEY, r##"{"colors": {"accent": "#abcdef"}, "shadow": "md"}"##)
            .unwrap();

        let mut store = TokenStore::new(&storage);
        store.load();

        assert_eq!(store.tokens().colors.accent, "#abcdef");
        assert_eq!(store.tokens().colors.primary, "#4c8bf5");
        assert_eq!(store.tokens().corner_radius, 10);
        assert_eq!(store.tokens().shadow_level, ShadowLevel::Md);
    }

    #[test]
    fn apply_writes_through_and_refreshes() {
        let storage = MemoryKeyValueStore::new();
        let refreshes = Rc::new(RefCell::new(Vec::new()));
        let mut store = TokenStore::new(&storage);
        let seen = Rc::clone(&refreshes);
        store.on_refresh(move |state| seen.borrow_mut().push(state.tokens.corner_radius));

        store
            .apply(&TokenPatch {
                corner_radius: Some(22),
                ..TokenPatch::default()
            })
            .unwrap();

        assert_eq!(*refreshes.borrow(), vec![22]);
        let persisted: Value =
            serde_json::from_str(&storage.get(TOKENS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted["radii"], json!(22));
        assert!(storage.get(SECTIONS_KEY).unwrap().is_some());
    }

    #[test]
    fn set_section_visible_accepts_unknown_ids() {
        let storage = MemoryKeyValueStore::new();
        let mut store = TokenStore::new(&storage);
        store.set_section_visible("faq", true).unwrap();
        store.set_section_visible("gallery", true).unwrap();

        let mut reloaded = TokenStore::new(&storage);
        reloaded.load();
        assert!(reloaded.sections().is_visible("faq"));
        assert!(reloaded.sections().is_visible("gallery"));
    }

    #[test]
    fn export_then_import_reproduces_tokens() {
        let mut source = TokenStore::new(MemoryKeyValueStore::new());
        source.apply(&TokenPatch::full(&custom_record())).unwrap();
        source.set_section_visible("pricing", true).unwrap();

        let serialized = serde_json::to_string(&source.export()).unwrap();
        let document: Value = serde_json::from_str(&serialized).unwrap();

        let mut target = TokenStore::new(MemoryKeyValueStore::new());
        target.import(&document).unwrap();

        assert_eq!(target.tokens(), &custom_record());
        assert_eq!(target.sections(), source.sections());
    }

    #[test]
    fn dark_mode_toggle_restores_previous_colors() {
        let mut store = TokenStore::new(MemoryKeyValueStore::new());
        store.set_dark_mode(true).unwrap();
        assert_eq!(store.tokens().colors.bg, "#0a0c10");
        assert_eq!(store.tokens().colors.fg, "#ffffff");

        store.set_dark_mode(true).unwrap();
        store.set_dark_mode(false).unwrap();
        assert_eq!(store.tokens().colors.bg, DEFAULT_BACKGROUND);
        assert_eq!(store.tokens().colors.fg, DEFAULT_FOREGROUND);
    }

    #[test]
    fn dark_mode_survives_a_new_session() {
        let storage = MemoryKeyValueStore::new();
        let mut first = TokenStore::new(&storage);
        first.load();
        first.set_dark_mode(true).unwrap();

        let mut second = TokenStore::new(&storage);
        second.load();
        assert!(second.dark_mode());
        assert_eq!(second.tokens().colors.bg, "#0a0c10");

        second.set_dark_mode(false).unwrap();
        assert_eq!(second.tokens().colors.bg, DEFAULT_BACKGROUND);
        assert_eq!(second.tokens().colors.fg, DEFAULT_FOREGROUND);
        assert!(storage.get(DARK_KEY).unwrap().is_none());

        let mut third = TokenStore::new(&storage);
        third.load();
        assert!(!third.dark_mode());
        assert_eq!(third.tokens().colors.bg, DEFAULT_BACKGROUND);
    }

    #[test]
    fn colors_applied_while_dark_are_restored_on_dark_off() {
        let mut store = TokenStore::new(MemoryKeyValueStore::new());
        store.set_dark_mode(true).unwrap();
        store
            .apply(&TokenPatch {
                colors: ColorOverrides {
                    bg: Some("#fafafa".to_string()),
                    fg: Some("#111111".to_string()),
                    ..ColorOverrides::default()
                },
                ..TokenPatch::default()
            })
            .unwrap();

        store.set_dark_mode(false).unwrap();
        assert_eq!(store.tokens().colors.bg, "#fafafa");
        assert_eq!(store.tokens().colors.fg, "#111111");
    }

    #[test]
    fn unreadable_dark_override_is_ignored() {
        let storage = MemoryKeyValueStore::new();
        storage.set(DARK_KEY, r#"{"bg": 3}"#).unwrap();

        let mut store = TokenStore::new(&storage);
        store.load();
        assert!(!store.dark_mode());
        store.set_dark_mode(false).unwrap();
        assert_eq!(store.tokens(), &TokenRecord::default());
    }

    #[test]
    fn theme_file_wraps_current_tokens() {
        let store = TokenStore::new(MemoryKeyValueStore::new());
        let value = serde_json::to_value(store.theme_file()).unwrap();
        assert_eq!(value["tokens"]["shadow"], json!("sm"));
        assert_eq!(value.as_object().unwrap().len(), 1);
    }
}
