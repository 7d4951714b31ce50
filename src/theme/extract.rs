use std::sync::LazyLock;

use regex::Regex;

use super::{parse_radius, ShadowLevel, TokenRecord, DEFAULT_CORNER_RADIUS};

static ROOT_BLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r":root\s*\{([^}]+)\}"));
static COLOR_PRIMARY: LazyLock<Regex> = LazyLock::new(|| property("--color-primary"));
static COLOR_BG: LazyLock<Regex> = LazyLock::new(|| property("--color-bg"));
static COLOR_FG: LazyLock<Regex> = LazyLock::new(|| property("--color-fg"));
static COLOR_ACCENT: LazyLock<Regex> = LazyLock::new(|| property("--color-accent"));
static RADIUS: LazyLock<Regex> = LazyLock::new(|| property("--radius"));
static SHADOW: LazyLock<Regex> = LazyLock::new(|| property("--shadow"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

fn property(name: &str) -> Regex {
    compile(&format!(r"{}:\s*([^;]+);?", regex::escape(name)))
}

fn capture<'a>(pattern: &Regex, block: &'a str) -> Option<&'a str> {
    pattern
        .captures(block)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().trim())
}

/// Read theme tokens from the first `:root { ... }` block of an HTML document.
///
/// Each custom property is matched on its own; anything absent keeps the
/// default. A document without a root block yields [`TokenRecord::default`].
pub fn extract_tokens_from_html(html: &str) -> TokenRecord {
    let mut tokens = TokenRecord::default();

    let Some(block) = ROOT_BLOCK
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|block| block.as_str())
    else {
        tracing::debug!("no :root block found; using default tokens");
        return tokens;
    };

    if let Some(value) = capture(&COLOR_PRIMARY, block) {
        tokens.colors.primary = value.to_string();
    }
    if let Some(value) = capture(&COLOR_BG, block) {
        tokens.colors.bg = value.to_string();
    }
    if let Some(value) = capture(&COLOR_FG, block) {
        tokens.colors.fg = value.to_string();
    }
    if let Some(value) = capture(&COLOR_ACCENT, block) {
        tokens.colors.accent = value.to_string();
    }
    if let Some(value) = capture(&RADIUS, block) {
        tokens.corner_radius = parse_radius(value).unwrap_or_else(|| {
            tracing::debug!(value, "unparseable --radius; using default");
            DEFAULT_CORNER_RADIUS
        });
    }
    if let Some(value) = capture(&SHADOW, block) {
        match ShadowLevel::from_css(value) {
            Some(level) => tokens.shadow_level = level,
            None => tracing::debug!(value, "unrecognized --shadow expression; keeping default"),
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(root_body: &str) -> String {
        format!(
            "<!doctype html><html><head><style>\n:root {{\n{root_body}\n}}\nbody {{ margin: 0; }}\n</style></head><body></body></html>"
        )
    }

    #[test]
    fn missing_root_block_returns_default_record() {
        let html = "<html><head><style>body { color: red; }</style></head></html>";
        assert_eq!(extract_tokens_from_html(html), TokenRecord::default());
        assert_eq!(extract_tokens_from_html(""), TokenRecord::default());
    }

    #[test]
    fn extracts_all_six_properties() {
        let html = page(
            "--color-primary: #111111;\n--color-bg: #222222;\n--color-fg:#333333;\n--color-accent:  rgb(1, 2, 3) ;\n--radius: 14px;\n--shadow: 0 4px 12px rgba(0,0,0,.25);",
        );
        let tokens = extract_tokens_from_html(&html);

        assert_eq!(tokens.colors.primary, "#111111");
        assert_eq!(tokens.colors.bg, "#222222");
        assert_eq!(tokens.colors.fg, "#333333");
        assert_eq!(tokens.colors.accent, "rgb(1, 2, 3)");
        assert_eq!(tokens.corner_radius, 14);
        assert_eq!(tokens.shadow_level, ShadowLevel::Md);
    }

    #[test]
    fn partial_properties_keep_defaults() {
        let tokens = extract_tokens_from_html(&page("--color-accent: hotpink;"));
        let defaults = TokenRecord::default();

        assert_eq!(tokens.colors.accent, "hotpink");
        assert_eq!(tokens.colors.primary, defaults.colors.primary);
        assert_eq!(tokens.corner_radius, defaults.corner_radius);
        assert_eq!(tokens.shadow_level, defaults.shadow_level);
    }

    #[test]
    fn malformed_radius_defaults_to_ten() {
        let tokens = extract_tokens_from_html(&page("--radius: notanumber;"));
        assert_eq!(tokens.corner_radius, 10);
    }

    #[test]
    fn unknown_shadow_expression_keeps_sm() {
        let tokens = extract_tokens_from_html(&page("--shadow: 0 0 40px gold;"));
        assert_eq!(tokens.shadow_level, ShadowLevel::Sm);

        let tokens = extract_tokens_from_html(&page("--shadow: none;"));
        assert_eq!(tokens.shadow_level, ShadowLevel::None);
    }

    #[test]
    fn only_first_root_block_is_read() {
        let html = format!(
            "{}<style>:root {{ --color-primary: #abcdef; }}</style>",
            page("--color-primary: #010101;")
        );
        assert_eq!(extract_tokens_from_html(&html).colors.primary, "#010101");
    }
}
