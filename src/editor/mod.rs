//! Editor event dispatch.
//!
//! Every user interaction is an [`EditorEvent`]. [`Editor::dispatch`] runs the
//! built-in handler for the event, then the handlers registered for that
//! event kind, one at a time and in registration order.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::export::{self, ExportError, ExportedFiles};
use crate::preset::{PresetError, PresetResolver};
use crate::storage::KeyValueStore;
use crate::store::{LoadReport, StoreError, ThemeState, TokenStore};
use crate::theme::TokenPatch;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    LoadPreset(String),
    ApplyTokens(TokenPatch),
    SetSection { id: String, visible: bool },
    SetDarkMode(bool),
    ExportDesign(PathBuf),
    DownloadTheme(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorEventKind {
    LoadPreset,
    ApplyTokens,
    SetSection,
    SetDarkMode,
    ExportDesign,
    DownloadTheme,
}

impl EditorEvent {
    pub const fn kind(&self) -> EditorEventKind {
        match self {
            Self::LoadPreset(_) => EditorEventKind::LoadPreset,
            Self::ApplyTokens(_) => EditorEventKind::ApplyTokens,
            Self::SetSection { .. } => EditorEventKind::SetSection,
            Self::SetDarkMode(_) => EditorEventKind::SetDarkMode,
            Self::ExportDesign(_) => EditorEventKind::ExportDesign,
            Self::DownloadTheme(_) => EditorEventKind::DownloadTheme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    PresetLoaded { name: String, source: String },
    TokensApplied,
    SectionChanged { id: String, visible: bool },
    DarkModeChanged(bool),
    DesignExported(ExportedFiles),
    ThemeDownloaded(PathBuf),
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

type EventHandler = Box<dyn FnMut(&EditorEvent, &EditorOutcome, &ThemeState)>;

/// The token store plus the resolver the editor loads presets through.
pub struct Editor<S: KeyValueStore> {
    store: TokenStore<S>,
    presets: PresetResolver,
    handlers: HashMap<EditorEventKind, Vec<EventHandler>>,
}

impl<S: KeyValueStore> std::fmt::Debug for Editor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("store", &self.store)
            .field("presets", &self.presets)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<S: KeyValueStore> Editor<S> {
    pub fn new(store: TokenStore<S>, presets: PresetResolver) -> Self {
        Self {
            store,
            presets,
            handlers: HashMap::new(),
        }
    }

    pub fn store(&self) -> &TokenStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TokenStore<S> {
        &mut self.store
    }

    pub fn presets(&self) -> &PresetResolver {
        &self.presets
    }

    /// Restore the persisted snapshot before the first event.
    pub fn start(&mut self) -> LoadReport {
        let report = self.store.load();
        tracing::info!(tokens = ?report.tokens, sections = ?report.sections, "editor started");
        report
    }

    /// Handlers only run for events whose built-in handling succeeded.
    pub fn on(
        &mut self,
        kind: EditorEventKind,
        handler: impl FnMut(&EditorEvent, &EditorOutcome, &ThemeState) + 'static,
    ) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    pub fn dispatch(&mut self, event: EditorEvent) -> EditorResult<EditorOutcome> {
        tracing::debug!(kind = ?event.kind(), "dispatch editor event");
        let outcome = self.handle(&event)?;
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                handler(&event, &outcome, self.store.state());
            }
        }
        Ok(outcome)
    }

    fn handle(&mut self, event: &EditorEvent) -> EditorResult<EditorOutcome> {
        match event {
            EditorEvent::LoadPreset(name) => {
                let resolved = self.presets.resolve(name)?;
                self.store.apply(&resolved.patch)?;
                Ok(EditorOutcome::PresetLoaded {
                    name: resolved.name,
                    source: resolved.source,
                })
            }
            EditorEvent::ApplyTokens(patch) => {
                self.store.apply(patch)?;
                Ok(EditorOutcome::TokensApplied)
            }
            EditorEvent::SetSection { id, visible } => {
                self.store.set_section_visible(id, *visible)?;
                Ok(EditorOutcome::SectionChanged {
                    id: id.clone(),
                    visible: *visible,
                })
            }
            EditorEvent::SetDarkMode(enabled) => {
                self.store.set_dark_mode(*enabled)?;
                Ok(EditorOutcome::DarkModeChanged(*enabled))
            }
            EditorEvent::ExportDesign(dir) => {
                let document = self.store.export();
                let files = export::write_design_bundle(dir, &document)?;
                Ok(EditorOutcome::DesignExported(files))
            }
            EditorEvent::DownloadTheme(dir) => {
                let path = export::write_theme_file(dir, &self.store.theme_file())?;
                tracing::info!(path = %path.display(), "wrote theme file");
                Ok(EditorOutcome::ThemeDownloaded(path))
            }
        }
    }
}
