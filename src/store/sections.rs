use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page sections the preview and the HTML export know how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Hero,
    Features,
    Pricing,
    Faq,
    Footer,
}

impl SectionId {
    /// Render order.
    pub const ALL: [SectionId; 5] = [
        Self::Hero,
        Self::Features,
        Self::Pricing,
        Self::Faq,
        Self::Footer,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Features => "features",
            Self::Pricing => "pricing",
            Self::Faq => "faq",
            Self::Footer => "footer",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.as_str() == id)
    }

    const fn visible_by_default(self) -> bool {
        matches!(self, Self::Hero | Self::Features | Self::Footer)
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section id to visibility. Ids outside [`SectionId`] are kept but never rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionVisibility(BTreeMap<String, bool>);

impl Default for SectionVisibility {
    fn default() -> Self {
        Self(
            SectionId::ALL
                .into_iter()
                .map(|section| (section.as_str().to_string(), section.visible_by_default()))
                .collect(),
        )
    }
}

impl SectionVisibility {
    pub fn is_visible(&self, id: &str) -> bool {
        self.0.get(id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: impl Into<String>, visible: bool) {
        self.0.insert(id.into(), visible);
    }

    /// Known sections currently shown, in render order.
    pub fn visible_sections(&self) -> Vec<SectionId> {
        SectionId::ALL
            .into_iter()
            .filter(|section| self.is_visible(section.as_str()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(id, visible)| (id.as_str(), *visible))
    }

    /// Merge a stored JSON object over `self`. Entries that are not booleans
    /// are skipped; returns `false` when `value` is not an object at all.
    pub fn merge_value(&mut self, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        for (id, visible) in object {
            match visible.as_bool() {
                Some(visible) => self.set(id.clone(), visible),
                None => tracing::debug!(id = %id, "ignoring non-boolean section flag"),
            }
        }
        true
    }
}
