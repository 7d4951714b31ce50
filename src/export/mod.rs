use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::SectionVisibility;
use crate::theme::TokenRecord;

mod sections;

pub use sections::render_section;

pub const GENERATOR: &str = "Scenestealer Engine";
pub const DESIGN_FILE_NAME: &str = "scenestealer-design.html";
pub const THEME_DOCUMENT_FILE_NAME: &str = "scenestealer-theme.json";
pub const THEME_FILE_NAME: &str = "theme.json";

const FONT_STACK: &str =
    "ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Noto Sans, Helvetica, Arial";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {path}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize export")]
    Serialize(#[from] serde_json::Error),
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// The downloadable `{tokens, sections, exportedAt, generator}` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub tokens: TokenRecord,
    pub sections: SectionVisibility,
    pub exported_at: String,
    pub generator: String,
}

impl ExportDocument {
    pub fn new(tokens: &TokenRecord, sections: &SectionVisibility, at: DateTime<Utc>) -> Self {
        Self {
            tokens: tokens.clone(),
            sections: sections.clone(),
            exported_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            generator: GENERATOR.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> ExportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The bare `{tokens}` theme download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFile {
    pub tokens: TokenRecord,
}

/// Paths written by [`write_design_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub html: PathBuf,
    pub json: PathBuf,
}

fn root_variables(tokens: &TokenRecord) -> String {
    let mut css = String::from(":root {\n");
    for (name, value) in tokens.css_variables() {
        css.push_str(&format!("    {name}: {};\n", css_value(&value)));
    }
    css.push_str(&format!("    --font-body: {FONT_STACK};\n"));
    css.push_str(&format!("    --font-heading: {FONT_STACK};\n"));
    css.push_str("  }");
    css
}

/// Drops the characters that would end the declaration, the rule or the
/// `<style>` element.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>'))
        .collect()
}

/// Markup for every visible known section, in render order.
pub fn render_preview(sections: &SectionVisibility) -> String {
    sections
        .visible_sections()
        .into_iter()
        .map(render_section)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Standalone HTML snapshot with the tokens inlined as `:root` variables.
pub fn render_design_html(tokens: &TokenRecord, sections: &SectionVisibility) -> String {
    format!(
        "<!doctype html>
<html lang=\"en\">
<head>
  <meta charset=\"utf-8\" />
  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />
  <title>Exported Design - Scenestealer Engine</title>
  <style>
  {variables}
{base}
  </style>
</head>
<body>
  <div class=\"container\">
{body}
  </div>
</body>
</html>",
        variables = root_variables(tokens),
        base = BASE_STYLES,
        body = render_preview(sections),
    )
}

/// Write the HTML snapshot and the JSON document into `dir`.
pub fn write_design_bundle(dir: &Path, document: &ExportDocument) -> ExportResult<ExportedFiles> {
    let html_path = dir.join(DESIGN_FILE_NAME);
    let json_path = dir.join(THEME_DOCUMENT_FILE_NAME);

    let html = render_design_html(&document.tokens, &document.sections);
    write_file(&html_path, html.as_bytes())?;
    write_file(&json_path, document.to_json_pretty()?.as_bytes())?;

    tracing::info!(html = %html_path.display(), json = %json_path.display(), "design exported");
    Ok(ExportedFiles {
        html: html_path,
        json: json_path,
    })
}

pub fn write_theme_file(dir: &Path, theme: &ThemeFile) -> ExportResult<PathBuf> {
    let path = dir.join(THEME_FILE_NAME);
    let serialized = serde_json::to_string_pretty(theme)?;
    write_file(&path, serialized.as_bytes())?;
    Ok(path)
}

fn write_file(path: &Path, contents: &[u8]) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

const BASE_STYLES: &str = "  * { box-sizing: border-box; }
  html, body { height: 100%; margin: 0; }
  body {
    background: var(--color-bg);
    color: var(--color-fg);
    font-family: var(--font-body);
    line-height: 1.6;
    padding: 20px;
  }
  .section {
    border: 1px solid rgba(255,255,255,0.1);
    border-radius: var(--radius);
    padding: 20px;
    margin-bottom: 14px;
    background: rgba(255,255,255,0.03);
    box-shadow: var(--shadow);
  }
  .section h3 { margin: 0 0 8px 0; color: var(--color-fg); }
  .hero { padding: 40px; text-align: center; }
  .cta { display: flex; gap: 10px; justify-content: center; margin-top: 14px; }
  .btn {
    background: var(--color-primary);
    color: white;
    border: none;
    border-radius: var(--radius);
    padding: 12px 20px;
    font-weight: 600;
  }
  .grid, .tiers { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 16px; margin-top: 16px; }
  .card, .tier {
    border: 1px solid rgba(255,255,255,0.1);
    border-radius: var(--radius);
    padding: 16px;
    background: rgba(255,255,255,0.05);
  }
  .card strong { color: var(--color-primary); display: block; margin-bottom: 6px; }
  .tier { text-align: center; }
  .tier .name { font-weight: 600; font-size: 18px; margin-bottom: 8px; }
  .tier .price { font-size: 24px; color: var(--color-primary); margin-bottom: 16px; }
  details { margin: 8px 0; }
  summary { cursor: pointer; font-weight: 600; padding: 8px 0; }
  .footer { display: flex; justify-content: space-between; align-items: center; opacity: 0.8; }
  .footer a { color: var(--color-accent); text-decoration: none; }";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ShadowLevel;
    use chrono::TimeZone;

    fn fixture_root() -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let pid = std::process::id();
        path.push(format!("scenestealer-export-{pid}-{nanos}"));
        path
    }

    #[test]
    fn export_document_uses_camel_case_and_iso_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let document =
            ExportDocument::new(&TokenRecord::default(), &SectionVisibility::default(), at);
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["exportedAt"], "2026-10-19T08:30:00.000Z");
        assert_eq!(value["generator"], "Scenestealer Engine");
        assert_eq!(value["tokens"]["radii"], 10);
        assert_eq!(value["sections"]["hero"], true);
    }

    #[test]
    fn design_html_inlines_variables_and_visible_sections() {
        let mut tokens = TokenRecord::default();
        tokens.shadow_level = ShadowLevel::Lg;
        tokens.corner_radius = 6;
        let mut sections = SectionVisibility::default();
        sections.set("features", false);
        sections.set("faq", true);

        let html = render_design_html(&tokens, &sections);

        assert!(html.contains("--radius: 6px;"));
        assert!(html.contains("--shadow: 0 10px 30px rgba(0,0,0,.35);"));
        assert!(html.contains("--color-primary: #4c8bf5;"));
        assert!(html.contains("class=\"section hero\""));
        assert!(html.contains("class=\"section faq\""));
        assert!(!html.contains("class=\"section features\""));
        assert!(!html.contains("class=\"section pricing\""));
    }

    #[test]
    fn exported_html_round_trips_through_extraction() {
        let mut tokens = TokenRecord::default();
        tokens.colors.accent = "#123456".to_string();
        tokens.corner_radius = 3;
        tokens.shadow_level = ShadowLevel::None;

        let html = render_design_html(&tokens, &SectionVisibility::default());
        assert_eq!(crate::theme::extract_tokens_from_html(&html), tokens);
    }

    #[test]
    fn style_breaking_characters_are_dropped_from_token_values() {
        let mut tokens = TokenRecord::default();
        tokens.colors.bg = "#000}</style><script>alert(1)</script>".to_string();
        tokens.colors.accent = "#123456; color: red".to_string();

        let html = render_design_html(&tokens, &SectionVisibility::default());

        assert!(!html.contains("<script>"));
        assert_eq!(html.matches("</style>").count(), 1);
        let extracted = crate::theme::extract_tokens_from_html(&html);
        assert_eq!(extracted.colors.bg, "#000/stylescriptalert(1)/script");
        assert_eq!(extracted.colors.accent, "#123456 color: red");
        assert_eq!(extracted.colors.primary, tokens.colors.primary);
        assert_eq!(extracted.corner_radius, tokens.corner_radius);
    }

    #[test]
    fn write_design_bundle_creates_both_files() {
        let root = fixture_root();
        let document = ExportDocument::new(
            &TokenRecord::default(),
            &SectionVisibility::default(),
            Utc::now(),
        );

        let files = write_design_bundle(&root, &document).unwrap();
        assert!(files.html.ends_with(DESIGN_FILE_NAME));
        let json = fs::read_to_string(&files.json).unwrap();
        let parsed: ExportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, document);

        let theme = write_theme_file(
            &root,
            &ThemeFile {
                tokens: TokenRecord::default(),
            },
        )
        .unwrap();
        assert!(theme.exists());

        let _ = fs::remove_dir_all(&root);
    }
}
