use std::sync::LazyLock;

use regex::Regex;

pub const UNTITLED_SAMPLE: &str = "Untitled Sample";
pub const DEFAULT_DESCRIPTION: &str = "A beautiful SceneStealer sample design";

pub const LATEST_SAMPLE_TITLE: &str = "Latest Sample";
pub const LATEST_SAMPLE_DESCRIPTION: &str = "Check out our latest design sample";

const DESCRIPTION_LIMIT: usize = 200;
const HEADLINE_LIMIT: usize = 100;
const TITLE_SUFFIX: &str = " - Scenestealer Engine";

static TITLE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<title>(.*?)</title>"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<h1[^>]*>(.*?)</h1>"));
static META_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#)
});
static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<p[^>]*>(.*?)</p>"));
static TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"<[^>]*>"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

fn first_capture<'a>(pattern: &Regex, html: &'a str) -> Option<&'a str> {
    pattern
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str())
}

fn strip_tags(fragment: &str) -> String {
    TAG.replace_all(fragment, "").into_owned()
}

/// `<title>`, else the first `<h1>` without markup.
pub fn extract_title(html: &str) -> String {
    if let Some(title) = first_capture(&TITLE, html) {
        return title.to_string();
    }
    if let Some(heading) = first_capture(&HEADING, html) {
        return strip_tags(heading);
    }
    UNTITLED_SAMPLE.to_string()
}

/// Meta description, else the first paragraph without markup, cut to 200
/// characters.
pub fn extract_description(html: &str) -> String {
    if let Some(description) = first_capture(&META_DESCRIPTION, html) {
        return description.to_string();
    }
    if let Some(paragraph) = first_capture(&PARAGRAPH, html) {
        return truncate(strip_tags(paragraph), DESCRIPTION_LIMIT);
    }
    DEFAULT_DESCRIPTION.to_string()
}

/// `<title>` without the engine suffix, for the landing page highlight.
pub fn headline_title(html: &str) -> String {
    first_capture(&TITLE, html)
        .map(|title| title.replace(TITLE_SUFFIX, ""))
        .unwrap_or_else(|| LATEST_SAMPLE_TITLE.to_string())
}

/// First paragraph without markup, cut to 100 characters.
pub fn headline_description(html: &str) -> String {
    first_capture(&PARAGRAPH, html)
        .map(|paragraph| truncate(strip_tags(paragraph), HEADLINE_LIMIT))
        .unwrap_or_else(|| LATEST_SAMPLE_DESCRIPTION.to_string())
}

fn truncate(text: String, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text;
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_title_tag_then_heading() {
        assert_eq!(
            extract_title("<TITLE>Neon</TITLE><h1>Other</h1>"),
            "Neon"
        );
        assert_eq!(
            extract_title(r#"<h1 class="big">Night <em>Mode</em></h1>"#),
            "Night Mode"
        );
        assert_eq!(extract_title("<p>no heading</p>"), UNTITLED_SAMPLE);
    }

    #[test]
    fn description_prefers_meta_then_first_paragraph() {
        let html = r#"<meta name="description" content="Meta text"><p>Para</p>"#;
        assert_eq!(extract_description(html), "Meta text");
        assert_eq!(
            extract_description("<p class='lead'>A <b>bold</b> idea</p><p>second</p>"),
            "A bold idea"
        );
        assert_eq!(extract_description("<div></div>"), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn long_paragraph_is_truncated_with_ellipsis() {
        let long = "é".repeat(250);
        let description = extract_description(&format!("<p>{long}</p>"));
        assert_eq!(description.chars().count(), 203);
        assert!(description.ends_with("..."));

        let exact = "x".repeat(200);
        assert_eq!(extract_description(&format!("<p>{exact}</p>")), exact);
    }

    #[test]
    fn headline_strips_engine_suffix_and_ignores_meta() {
        let html = r#"<title>Neon Pricing - Scenestealer Engine</title>
<meta name="description" content="Meta text"><p>Hero <em>copy</em></p>"#;
        assert_eq!(headline_title(html), "Neon Pricing");
        assert_eq!(headline_description(html), "Hero copy");

        assert_eq!(headline_title("<h1>Only heading</h1>"), LATEST_SAMPLE_TITLE);
        assert_eq!(headline_description("<div></div>"), LATEST_SAMPLE_DESCRIPTION);

        let long = headline_description(&format!("<p>{}</p>", "y".repeat(101)));
        assert_eq!(long, format!("{}...", "y".repeat(100)));
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
    }
}
