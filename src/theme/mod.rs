use serde::{Deserialize, Serialize};
use serde_json::Value;

mod extract;

pub use extract::extract_tokens_from_html;

pub const DEFAULT_PRIMARY: &str = "#4c8bf5";
pub const DEFAULT_BACKGROUND: &str = "#0f1115";
pub const DEFAULT_FOREGROUND: &str = "#e6e8ee";
pub const DEFAULT_ACCENT: &str = "#8b5cf6";
pub const DEFAULT_CORNER_RADIUS: u32 = 10;

/// Elevation preset; each level maps to one fixed `box-shadow` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ShadowLevel {
    None,
    #[default]
    Sm,
    Md,
    Lg,
}

impl ShadowLevel {
    pub const ALL: [ShadowLevel; 4] = [Self::None, Self::Sm, Self::Md, Self::Lg];

    /// Unknown keys resolve to `sm`.
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "none" => Self::None,
            "sm" => Self::Sm,
            "md" => Self::Md,
            "lg" => Self::Lg,
            other => {
                tracing::debug!(key = other, "unknown shadow level; using sm");
                Self::Sm
            }
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
        }
    }

    pub const fn css(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sm => "0 1px 2px rgba(0,0,0,.25)",
            Self::Md => "0 4px 12px rgba(0,0,0,.25)",
            Self::Lg => "0 10px 30px rgba(0,0,0,.35)",
        }
    }

    /// Reverse lookup of a CSS shadow expression. Only exact matches count.
    pub fn from_css(expression: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.css() == expression)
    }
}

impl From<String> for ShadowLevel {
    fn from(value: String) -> Self {
        Self::from_key(&value)
    }
}

impl std::fmt::Display for ShadowLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTokens {
    pub primary: String,
    pub bg: String,
    pub fg: String,
    pub accent: String,
}

impl Default for ColorTokens {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY.to_string(),
            bg: DEFAULT_BACKGROUND.to_string(),
            fg: DEFAULT_FOREGROUND.to_string(),
            accent: DEFAULT_ACCENT.to_string(),
        }
    }
}

/// The canonical theme: four colors, a corner radius in pixels and a shadow level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub colors: ColorTokens,
    #[serde(rename = "radii")]
    pub corner_radius: u32,
    #[serde(rename = "shadow")]
    pub shadow_level: ShadowLevel,
}

impl Default for TokenRecord {
    fn default() -> Self {
        Self {
            colors: ColorTokens::default(),
            corner_radius: DEFAULT_CORNER_RADIUS,
            shadow_level: ShadowLevel::Sm,
        }
    }
}

impl TokenRecord {
    /// Shallow merge: set fields of `patch` replace ours, the colors sub-object
    /// is merged field by field.
    pub fn merge(&mut self, patch: &TokenPatch) {
        apply_color_overrides(&mut self.colors, &patch.colors);
        if let Some(radius) = patch.corner_radius {
            self.corner_radius = radius;
        }
        if let Some(shadow) = patch.shadow_level {
            self.shadow_level = shadow;
        }
    }

    pub fn merged(mut self, patch: &TokenPatch) -> Self {
        self.merge(patch);
        self
    }

    /// `(name, value)` pairs for the six CSS custom properties.
    pub fn css_variables(&self) -> [(&'static str, String); 6] {
        [
            ("--color-primary", self.colors.primary.clone()),
            ("--color-bg", self.colors.bg.clone()),
            ("--color-fg", self.colors.fg.clone()),
            ("--color-accent", self.colors.accent.clone()),
            ("--radius", format!("{}px", self.corner_radius)),
            ("--shadow", self.shadow_level.css().to_string()),
        ]
    }
}

/// Color overrides; all fields optional for partial override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorOverrides {
    pub primary: Option<String>,
    pub bg: Option<String>,
    pub fg: Option<String>,
    pub accent: Option<String>,
}

impl ColorOverrides {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.bg.is_none() && self.fg.is_none() && self.accent.is_none()
    }
}

/// Validated partial token record. Produced from untyped payloads by
/// [`TokenPatch::from_value`]; nothing reaches a [`TokenRecord`] without it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPatch {
    pub colors: ColorOverrides,
    pub corner_radius: Option<u32>,
    pub shadow_level: Option<ShadowLevel>,
}

impl TokenPatch {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.corner_radius.is_none() && self.shadow_level.is_none()
    }

    /// A patch that sets every field of `record`.
    pub fn full(record: &TokenRecord) -> Self {
        Self {
            colors: ColorOverrides {
                primary: Some(record.colors.primary.clone()),
                bg: Some(record.colors.bg.clone()),
                fg: Some(record.colors.fg.clone()),
                accent: Some(record.colors.accent.clone()),
            },
            corner_radius: Some(record.corner_radius),
            shadow_level: Some(record.shadow_level),
        }
    }

    /// Normalize a duck-typed token payload. Fields with the wrong type are
    /// dropped, unknown keys are ignored, unknown shadow keys become `sm`.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::debug!("token payload is not an object; ignoring");
            return Self::default();
        };

        let mut patch = Self::default();
        if let Some(colors) = object.get("colors").and_then(Value::as_object) {
            let color = |key: &str| colors.get(key).and_then(Value::as_str).map(str::to_string);
            patch.colors = ColorOverrides {
                primary: color("primary"),
                bg: color("bg"),
                fg: color("fg"),
                accent: color("accent"),
            };
        }

        patch.corner_radius = object.get("radii").and_then(radius_from_value);
        patch.shadow_level = object
            .get("shadow")
            .and_then(Value::as_str)
            .map(ShadowLevel::from_key);
        patch
    }
}

fn apply_color_overrides(colors: &mut ColorTokens, overrides: &ColorOverrides) {
    if let Some(ref v) = overrides.primary {
        colors.primary = v.clone();
    }
    if let Some(ref v) = overrides.bg {
        colors.bg = v.clone();
    }
    if let Some(ref v) = overrides.fg {
        colors.fg = v.clone();
    }
    if let Some(ref v) = overrides.accent {
        colors.accent = v.clone();
    }
}

fn radius_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_u64() {
                return u32::try_from(int).ok();
            }
            number
                .as_f64()
                .filter(|float| float.is_finite() && *float >= 0.0 && *float <= f64::from(u32::MAX))
                .map(|float| float.trunc() as u32)
        }
        Value::String(text) => parse_radius(text),
        _ => None,
    }
}

/// Parse a radius such as `14px`, `14` or `14.5px`: the `px` suffix is
/// stripped and leading digits are read. Negative or digitless input yields
/// `None`.
pub fn parse_radius(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    let without_unit = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    let unsigned = without_unit.strip_prefix('+').unwrap_or(without_unit);
    let digits_end = unsigned
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(unsigned.len(), |(index, _)| index);
    if digits_end == 0 {
        return None;
    }
    unsigned[..digits_end].parse().ok()
}
