//! Sample gallery, RSS feed, sitemap and landing page highlight for a
//! directory of exported designs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

mod index;
mod metadata;

pub use index::{
    latest_sample, render_latest_block, update_index, update_index_file, LatestSample,
};
pub use metadata::{
    escape_html, extract_description, extract_title, headline_description, headline_title,
};

pub const DEFAULT_BASE_URL: &str = "https://dtslib1979.github.io/scenestealer-engine";
pub const ARCHIVE_FILE_NAME: &str = "archive.html";
pub const RSS_FILE_NAME: &str = "rss.xml";
pub const SITEMAP_FILE_NAME: &str = "sitemap.xml";
pub const RSS_ITEM_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("samples directory does not exist: {0}")]
    MissingSamples(PathBuf),
    #[error("failed to read {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}")]
    Write { path: PathBuf, source: io::Error },
}

pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    pub file_name: String,
    pub title: String,
    pub description: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl SampleInfo {
    pub fn from_html(
        file_name: impl Into<String>,
        html: &str,
        size_bytes: u64,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            title: extract_title(html),
            description: extract_description(html),
            size_bytes,
            modified,
        }
    }

    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }
}

/// Every `*.html` file directly under `dir`, newest first. Files that cannot
/// be read are skipped with a warning.
pub fn scan_samples(dir: &Path) -> ArchiveResult<Vec<SampleInfo>> {
    if !dir.is_dir() {
        return Err(ArchiveError::MissingSamples(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|source| ArchiveError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut samples = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("html") || !path.is_file() {
            continue;
        }
        match read_sample(&path) {
            Ok(sample) => samples.push(sample),
            Err(err) => tracing::warn!(path = %path.display(), %err, "skipping unreadable sample"),
        }
    }
    samples.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    tracing::debug!(dir = %dir.display(), count = samples.len(), "scanned samples");
    Ok(samples)
}

fn read_sample(path: &Path) -> io::Result<SampleInfo> {
    let html = fs::read_to_string(path)?;
    let stat = fs::metadata(path)?;
    let modified = DateTime::<Utc>::from(stat.modified()?);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SampleInfo::from_html(file_name, &html, stat.len(), modified))
}

pub fn render_archive(samples: &[SampleInfo], generated_at: DateTime<Utc>) -> String {
    let mut cards = String::new();
    for sample in samples {
        let file = escape_html(&sample.file_name);
        cards.push_str(&format!(
            r#"
      <div class="sample-card">
        <div class="sample-preview">
          <iframe src="../samples/{file}" loading="lazy"></iframe>
        </div>
        <div class="sample-info">
          <div class="sample-title">{title}</div>
          <div class="sample-description">{description}</div>
          <div class="sample-meta">
            <span>Size: {size}</span>
            <span>Updated: {updated}</span>
          </div>
          <div class="sample-actions">
            <a href="../samples/{file}" target="_blank" class="btn btn-small">Preview</a>
            <a href="../samples/{file}" download class="btn btn-small secondary">Download</a>
            <a href="../editor/?sample={file}" class="btn btn-small accent">Edit</a>
          </div>
        </div>
      </div>"#,
            title = escape_html(&sample.title),
            description = escape_html(&sample.description),
            size = sample.size_label(),
            updated = sample.modified.format("%Y-%m-%d"),
        ));
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>SceneStealer Archive - Design Samples</title>
  <meta name="description" content="Browse and download design samples created with SceneStealer Engine" />
  <style>
{styles}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>SceneStealer Archive</h1>
      <p>Browse design samples · Pick what you like · Edit in the engine</p>
      <div class="stats">
        <div class="stat">
          <div class="stat-number">{count}</div>
          <div class="stat-label">Samples</div>
        </div>
        <div class="stat">
          <div class="stat-number">{year}</div>
          <div class="stat-label">Latest Year</div>
        </div>
      </div>
      <div class="nav">
        <a href="../editor/" class="btn">Open Editor</a>
        <a href="/" class="btn secondary">Back to Home</a>
      </div>
    </div>

    <div class="grid">{cards}
    </div>

    <div class="footer">
      <p>Generated on {generated} • SceneStealer Engine</p>
    </div>
  </div>
</body>
</html>"#,
        styles = ARCHIVE_STYLES,
        count = samples.len(),
        year = generated_at.format("%Y"),
        generated = generated_at.format("%Y-%m-%d %H:%M"),
    )
}

/// RSS 2.0 feed of the most recent samples.
pub fn render_rss(samples: &[SampleInfo], base_url: &str, built_at: DateTime<Utc>) -> String {
    let base = base_url.trim_end_matches('/');
    let mut feed = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>SceneStealer Archive - Design Samples</title>
    <link>{base}</link>
    <description>Latest design samples and templates from SceneStealer Engine</description>
    <language>en-us</language>
    <lastBuildDate>{built}</lastBuildDate>
    <atom:link href="{base}/rss.xml" rel="self" type="application/rss+xml" />
    <generator>SceneStealer Engine Archive Generator</generator>
"#,
        built = built_at.to_rfc2822(),
    );

    for sample in samples.iter().take(RSS_ITEM_LIMIT) {
        let link = format!("{base}/samples/{}", escape_html(&sample.file_name));
        feed.push_str(&format!(
            r#"
    <item>
      <title>{title}</title>
      <link>{link}</link>
      <guid>{link}</guid>
      <description>{description}</description>
      <pubDate>{published}</pubDate>
      <category>Design Sample</category>
      <enclosure url="{link}" type="text/html" length="{length}"/>
    </item>"#,
            title = escape_html(&sample.title),
            description = escape_html(&sample.description),
            published = sample.modified.to_rfc2822(),
            length = sample.size_bytes,
        ));
    }

    feed.push_str("\n  </channel>\n</rss>\n");
    feed
}

pub fn render_sitemap(samples: &[SampleInfo], base_url: &str, today: DateTime<Utc>) -> String {
    let base = base_url.trim_end_matches('/');
    let today = today.format("%Y-%m-%d").to_string();
    let mut sitemap = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">",
    );

    let pages = [
        (format!("{base}/"), "weekly", "1.0"),
        (format!("{base}/{ARCHIVE_FILE_NAME}"), "daily", "0.9"),
        (format!("{base}/editor/"), "monthly", "0.8"),
    ];
    for (loc, frequency, priority) in pages {
        push_url(&mut sitemap, &loc, &today, frequency, priority);
    }
    for sample in samples {
        let loc = format!("{base}/samples/{}", escape_html(&sample.file_name));
        let modified = sample.modified.format("%Y-%m-%d").to_string();
        push_url(&mut sitemap, &loc, &modified, "never", "0.7");
    }

    sitemap.push_str("\n</urlset>\n");
    sitemap
}

fn push_url(out: &mut String, loc: &str, lastmod: &str, frequency: &str, priority: &str) {
    out.push_str(&format!(
        "\n  <url>\n    <loc>{loc}</loc>\n    <lastmod>{lastmod}</lastmod>\n    <changefreq>{frequency}</changefreq>\n    <priority>{priority}</priority>\n  </url>"
    ));
}

pub fn write_output(path: &Path, contents: &str) -> ArchiveResult<()> {
    let write_error = |source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)?;
    tracing::info!(path = %path.display(), "wrote archive output");
    Ok(())
}

const ARCHIVE_STYLES: &str = "    :root {
      --bg: #0b0f16; --ink: #e7ecf5; --muted: #94a3b8; --primary: #4c8bf5; --accent: #8b5cf6;
      --card: #0f1520; --border: #1f2734; --radius: 12px;
      --shadow: 0 4px 12px rgba(0,0,0,.25);
      --glow: 0 10px 40px rgba(76,139,245,.25);
    }
    * { box-sizing: border-box; }
    body { margin: 0; font: 15px/1.6 ui-sans-serif, system-ui, sans-serif; color: var(--ink); background: var(--bg); }
    .container { max-width: 1200px; margin: 0 auto; padding: 0 20px; }
    .header { text-align: center; padding: 60px 0 40px; }
    .header h1 { font-size: 48px; margin: 0 0 16px; }
    .header p { font-size: 20px; color: var(--muted); margin: 0 0 32px; }
    .stats { display: flex; justify-content: center; gap: 40px; margin-bottom: 40px; }
    .stat-number { font-size: 32px; font-weight: bold; color: var(--primary); }
    .stat-label { color: var(--muted); font-size: 14px; }
    .nav { display: flex; justify-content: center; gap: 20px; margin-bottom: 40px; }
    .btn { display: inline-block; padding: 12px 24px; background: var(--primary); color: white; text-decoration: none; border-radius: var(--radius); }
    .btn.secondary { background: transparent; border: 1px solid var(--border); color: var(--ink); }
    .btn.accent { background: var(--accent); }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(400px, 1fr)); gap: 24px; padding: 40px 0; }
    .sample-card { background: var(--card); border-radius: var(--radius); box-shadow: var(--shadow); border: 1px solid var(--border); overflow: hidden; }
    .sample-preview { height: 200px; overflow: hidden; }
    .sample-preview iframe { width: 100%; height: 400px; transform: scale(0.5); transform-origin: top left; border: none; }
    .sample-info { padding: 24px; }
    .sample-title { font-size: 20px; font-weight: 600; margin: 0 0 8px; }
    .sample-description { color: var(--muted); margin: 0 0 16px; }
    .sample-meta { display: flex; justify-content: space-between; color: var(--muted); font-size: 14px; margin-bottom: 16px; }
    .sample-actions { display: flex; gap: 12px; }
    .btn-small { padding: 8px 16px; font-size: 14px; }
    .footer { text-align: center; padding: 60px 0; border-top: 1px solid var(--border); margin-top: 60px; }";
