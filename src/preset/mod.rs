use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::config::PresetDirs;
use crate::theme::{extract_tokens_from_html, TokenPatch};

pub const EXTERNAL_JSON_LABEL: &str = "external-json";
pub const EXTERNAL_HTML_LABEL: &str = "external-html";
pub const BUILTIN_JSON_LABEL: &str = "builtin-json";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset name is empty")]
    EmptyName,
    #[error("invalid preset name: {0}")]
    InvalidName(String),
    #[error("preset not found: {name}")]
    NotFound { name: String, tried: Vec<String> },
}

pub type PresetResult<T> = std::result::Result<T, PresetError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no preset at {path}")]
    Missing { path: PathBuf },
    #[error("failed to read preset: {path}")]
    Read { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Html,
}

impl PayloadFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

/// Raw response from a preset source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetPayload {
    pub format: PayloadFormat,
    pub body: String,
}

pub trait PresetSource {
    fn label(&self) -> &str;
    fn fetch(&self, name: &str) -> Result<PresetPayload, SourceError>;

    /// Preset names this source can serve, when it can enumerate them.
    fn list(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Serves `<dir>/<name>.<ext>` files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    label: String,
    dir: PathBuf,
    format: PayloadFormat,
}

impl DirectorySource {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>, format: PayloadFormat) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.format.extension()))
    }
}

impl PresetSource for DirectorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn fetch(&self, name: &str) -> Result<PresetPayload, SourceError> {
        let path = self.path_for(name);
        match fs::read_to_string(&path) {
            Ok(body) => Ok(PresetPayload {
                format: self.format,
                body,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(SourceError::Missing { path })
            }
            Err(source) => Err(SourceError::Read { path, source }),
        }
    }

    fn list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == self.format.extension())
            })
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect()
    }
}

/// A preset that resolved, with the label of the source that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPreset {
    pub name: String,
    pub source: String,
    pub patch: TokenPatch,
}

/// Tries its sources strictly in order; the first one that responds wins.
#[derive(Default)]
pub struct PresetResolver {
    sources: Vec<Box<dyn PresetSource>>,
}

impl std::fmt::Debug for PresetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|source| source.label()))
            .finish()
    }
}

impl PresetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// External JSON, then external HTML, then built-in JSON.
    pub fn from_dirs(dirs: &PresetDirs) -> Self {
        Self::new()
            .with_source(DirectorySource::new(
                EXTERNAL_JSON_LABEL,
                &dirs.external,
                PayloadFormat::Json,
            ))
            .with_source(DirectorySource::new(
                EXTERNAL_HTML_LABEL,
                &dirs.external,
                PayloadFormat::Html,
            ))
            .with_source(DirectorySource::new(
                BUILTIN_JSON_LABEL,
                &dirs.builtin,
                PayloadFormat::Json,
            ))
    }

    pub fn with_source(mut self, source: impl PresetSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn source_labels(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.label()).collect()
    }

    pub fn resolve(&self, name: &str) -> PresetResult<ResolvedPreset> {
        validate_name(name)?;

        let mut tried = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.fetch(name) {
                Ok(payload) => {
                    let patch = decode_payload(&payload);
                    tracing::info!(preset = name, source = source.label(), "loaded preset");
                    return Ok(ResolvedPreset {
                        name: name.to_string(),
                        source: source.label().to_string(),
                        patch,
                    });
                }
                Err(err) => {
                    tracing::debug!(preset = name, source = source.label(), %err, "preset source unavailable");
                    tried.push(source.label().to_string());
                }
            }
        }

        tracing::warn!(preset = name, ?tried, "preset not found in any source");
        Err(PresetError::NotFound {
            name: name.to_string(),
            tried,
        })
    }

    /// Every preset name any source can enumerate, sorted and de-duplicated.
    pub fn available(&self) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|source| source.list())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn validate_name(name: &str) -> PresetResult<()> {
    if name.trim().is_empty() {
        return Err(PresetError::EmptyName);
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(PresetError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Normalize a fetched payload. JSON documents use their `tokens` field when
/// present; HTML, and JSON bodies that do not parse, go through CSS extraction.
pub fn decode_payload(payload: &PresetPayload) -> TokenPatch {
    match payload.format {
        PayloadFormat::Json => match serde_json::from_str::<Value>(&payload.body) {
            Ok(document) => {
                let tokens = document
                    .get("tokens")
                    .filter(|tokens| !tokens.is_null())
                    .unwrap_or(&document);
                TokenPatch::from_value(tokens)
            }
            Err(err) => {
                tracing::warn!(?err, "preset body is not JSON; extracting tokens from markup");
                TokenPatch::full(&extract_tokens_from_html(&payload.body))
            }
        },
        PayloadFormat::Html => TokenPatch::full(&extract_tokens_from_html(&payload.body)),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::theme::{ShadowLevel, TokenRecord};

    struct FakeSource {
        label: &'static str,
        presets: HashMap<&'static str, PresetPayload>,
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl FakeSource {
        fn new(label: &'static str, calls: &Rc<RefCell<Vec<&'static str>>>) -> Self {
            Self {
                label,
                presets: HashMap::new(),
                calls: Rc::clone(calls),
            }
        }

        fn with(mut self, name: &'static str, format: PayloadFormat, body: &str) -> Self {
            self.presets.insert(
                name,
                PresetPayload {
                    format,
                    body: body.to_string(),
                },
            );
            self
        }
    }

    impl PresetSource for FakeSource {
        fn label(&self) -> &str {
            self.label
        }

        fn fetch(&self, name: &str) -> Result<PresetPayload, SourceError> {
            self.calls.borrow_mut().push(self.label);
            self.presets
                .get(name)
                .cloned()
                .ok_or_else(|| SourceError::Missing {
                    path: PathBuf::from(name),
                })
        }
    }

    fn fixture_root() -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let pid = std::process::id();
        path.push(format!("scenestealer-preset-{pid}-{nanos}"));
        path
    }

    #[test]
    fn first_successful_source_wins_without_mixing() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let resolver = PresetResolver::new()
            .with_source(FakeSource::new("a", &calls))
            .with_source(FakeSource::new("b", &calls).with(
                "linear",
                PayloadFormat::Json,
                r##"{"tokens": {"colors": {"primary": "#bbbbbb"}, "radii": 4}}"##,
            ))
            .with_source(FakeSource::new("c", &calls).with(
                "linear",
                PayloadFormat::Json,
                r##"{"colors": {"primary": "#cccccc", "bg": "#cccccc"}, "shadow": "lg"}"##,
            ));

        let resolved = resolver.resolve("linear").unwrap();

        assert_eq!(resolved.source, "b");
        assert_eq!(resolved.patch.colors.primary.as_deref(), Some("#bbbbbb"));
        assert!(resolved.patch.colors.bg.is_none());
        assert_eq!(resolved.patch.corner_radius, Some(4));
        assert!(resolved.patch.shadow_level.is_none());
        assert_eq!(*calls.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn unwrapped_json_document_is_used_whole() {
        let payload = PresetPayload {
            format: PayloadFormat::Json,
            body: r##"{"colors": {"accent": "#00aa00"}, "shadow": "none"}"##.to_string(),
        };
        let patch = decode_payload(&payload);
        assert_eq!(patch.colors.accent.as_deref(), Some("#00aa00"));
        assert_eq!(patch.shadow_level, Some(ShadowLevel::None));
    }

    #[test]
    fn html_payload_goes_through_extraction() {
        let payload = PresetPayload {
            format: PayloadFormat::Html,
            body: "<style>:root { --color-primary: #ff8800; --radius: 14px; }</style>".to_string(),
        };
        let record = TokenRecord::default().merged(&decode_payload(&payload));
        assert_eq!(record.colors.primary, "#ff8800");
        assert_eq!(record.corner_radius, 14);
        assert_eq!(record.colors.bg, TokenRecord::default().colors.bg);
    }

    #[test]
    fn json_source_serving_html_falls_back_to_extraction() {
        let payload = PresetPayload {
            format: PayloadFormat::Json,
            body: "<!doctype html><style>:root { --shadow: 0 4px 12px rgba(0,0,0,.25); }</style>"
                .to_string(),
        };
        let patch = decode_payload(&payload);
        assert_eq!(patch.shadow_level, Some(ShadowLevel::Md));
    }

    #[test]
    fn exhausting_sources_reports_not_found() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let resolver = PresetResolver::new()
            .with_source(FakeSource::new("a", &calls))
            .with_source(FakeSource::new("b", &calls));

        let err = resolver.resolve("missing").unwrap_err();
        match err {
            PresetError::NotFound { name, tried } => {
                assert_eq!(name, "missing");
                assert_eq!(tried, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_and_path_like_names_are_rejected() {
        let resolver = PresetResolver::new();
        assert!(matches!(resolver.resolve(""), Err(PresetError::EmptyName)));
        assert!(matches!(
            resolver.resolve("../secrets"),
            Err(PresetError::InvalidName(_))
        ));
    }

    #[test]
    fn directory_sources_follow_priority_order() {
        let root = fixture_root();
        let external = root.join("presets");
        let builtin = root.join("builtin");
        fs::create_dir_all(&external).unwrap();
        fs::create_dir_all(&builtin).unwrap();
        fs::write(
            external.join("vibrant.html"),
            "<style>:root { --color-accent: #e11d48; }</style>",
        )
        .unwrap();
        fs::write(
            builtin.join("vibrant.json"),
            r##"{"tokens": {"colors": {"accent": "#000000"}}}"##,
        )
        .unwrap();
        fs::write(builtin.join("minimal.json"), r#"{"radii": 2}"#).unwrap();

        let resolver = PresetResolver::from_dirs(&PresetDirs { external, builtin });

        let vibrant = resolver.resolve("vibrant").unwrap();
        assert_eq!(vibrant.source, EXTERNAL_HTML_LABEL);
        assert_eq!(vibrant.patch.colors.accent.as_deref(), Some("#e11d48"));

        let minimal = resolver.resolve("minimal").unwrap();
        assert_eq!(minimal.source, BUILTIN_JSON_LABEL);
        assert_eq!(minimal.patch.corner_radius, Some(2));

        assert_eq!(resolver.available(), vec!["minimal", "vibrant"]);

        let _ = fs::remove_dir_all(&root);
    }
}
