//! "Latest sample" highlight on the site's landing page.

use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::metadata::{escape_html, headline_description, headline_title};
use super::{scan_samples, write_output, ArchiveError, ArchiveResult};

const BLOCK_START: &str = "<!-- latest-sample:start -->";
const BLOCK_END: &str = "<!-- latest-sample:end -->";
const STYLE_MARKER: &str = ".latest-sample{";

static CTA: LazyLock<Regex> = LazyLock::new(|| compile(r#"(?i)<div class="cta">"#));
static HERO_CLOSE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</div>\s*</section>"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestSample {
    pub file_name: String,
    pub title: String,
    pub description: String,
    pub modified: DateTime<Utc>,
}

impl LatestSample {
    pub fn from_html(file_name: impl Into<String>, html: &str, modified: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name.into(),
            title: headline_title(html),
            description: headline_description(html),
            modified,
        }
    }
}

/// The most recently modified sample. A missing or empty directory yields
/// `None`.
pub fn latest_sample(dir: &Path) -> ArchiveResult<Option<LatestSample>> {
    let samples = match scan_samples(dir) {
        Ok(samples) => samples,
        Err(ArchiveError::MissingSamples(_)) => return Ok(None),
        Err(err) => return Err(err),
    };
    let Some(newest) = samples.first() else {
        return Ok(None);
    };

    let path = dir.join(&newest.file_name);
    let html = fs::read_to_string(&path).map_err(|source| ArchiveError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(Some(LatestSample::from_html(
        newest.file_name.clone(),
        &html,
        newest.modified,
    )))
}

/// The highlight block, or a pointer to the archive when there is no sample.
pub fn render_latest_block(latest: Option<&LatestSample>) -> String {
    let body = match latest {
        Some(sample) => {
            let file = escape_html(&sample.file_name);
            format!(
                r#"
      <div class="latest-sample">
        <div class="sample-badge">🆕 Latest Sample</div>
        <h3>{title}</h3>
        <p>{description}</p>
        <div class="sample-actions">
          <a href="samples/{file}" target="_blank" class="btn">Preview</a>
          <a href="editor/?sample={file}" class="btn secondary">Edit</a>
          <a href="archive.html" class="btn secondary">View All</a>
        </div>
        <div class="sample-date">Updated {updated}</div>
      </div>"#,
                title = escape_html(&sample.title),
                description = escape_html(&sample.description),
                updated = sample.modified.format("%B %d, %Y"),
            )
        }
        None => r#"
      <div class="latest-sample">
        <div class="sample-badge">📁 Archive</div>
        <h3>Browse Design Samples</h3>
        <p>Explore our collection of beautiful, ready-to-use design templates.</p>
        <div class="sample-actions">
          <a href="archive.html" class="btn">Browse Archive</a>
          <a href="editor/" class="btn secondary">Open Editor</a>
        </div>
      </div>"#
            .to_string(),
    };
    format!("{BLOCK_START}{body}\n      {BLOCK_END}")
}

/// Put the highlight into `index_html`. A block from an earlier run is
/// replaced in place; otherwise it goes before the call-to-action, or before
/// the hero section closes. The block styles are added once.
pub fn update_index(index_html: &str, latest: Option<&LatestSample>) -> String {
    let block = render_latest_block(latest);
    let mut html = with_latest_styles(index_html);

    if let Some(range) = marked_block(&html) {
        html.replace_range(range, &block);
        return html;
    }

    let cta = CTA.find(&html).map(|found| found.start());
    let hero_close = HERO_CLOSE.find(&html).map(|found| found.start());
    match (cta, hero_close) {
        (Some(at), _) => html.insert_str(at, &format!("\n      {block}\n      ")),
        (None, Some(at)) => html.insert_str(at, &format!("\n      {block}\n    ")),
        (None, None) => {
            tracing::warn!("index has no call-to-action or hero section; highlight skipped");
        }
    }
    html
}

/// Rewrite `index_file` with the newest sample from `samples_dir`.
pub fn update_index_file(
    samples_dir: &Path,
    index_file: &Path,
) -> ArchiveResult<Option<LatestSample>> {
    let latest = latest_sample(samples_dir)?;
    let html = fs::read_to_string(index_file).map_err(|source| ArchiveError::Read {
        path: index_file.to_path_buf(),
        source,
    })?;
    write_output(index_file, &update_index(&html, latest.as_ref()))?;
    Ok(latest)
}

fn marked_block(html: &str) -> Option<Range<usize>> {
    let start = html.find(BLOCK_START)?;
    let end = start + html[start..].find(BLOCK_END)? + BLOCK_END.len();
    Some(start..end)
}

fn with_latest_styles(html: &str) -> String {
    if html.contains(STYLE_MARKER) {
        return html.to_string();
    }
    match html.find("</style>") {
        Some(at) => format!("{}{LATEST_SAMPLE_STYLES}\n{}", &html[..at], &html[at..]),
        None => html.to_string(),
    }
}

const LATEST_SAMPLE_STYLES: &str = "
  .latest-sample{
    background:var(--card); padding:24px; border-radius:var(--radius);
    box-shadow:var(--shadow); border:1px solid var(--border);
    margin:24px 0; text-align:center;
  }
  .sample-badge{
    display:inline-block; padding:4px 12px; background:var(--accent);
    color:white; border-radius:16px; font-size:12px; font-weight:500;
    margin-bottom:16px;
  }
  .latest-sample h3{margin:0 0 12px; color:var(--ink)}
  .latest-sample p{color:var(--muted); margin:0 0 16px}
  .sample-actions{display:flex; gap:12px; justify-content:center; flex-wrap:wrap}
  .sample-date{color:var(--muted); font-size:12px; margin-top:16px}";
