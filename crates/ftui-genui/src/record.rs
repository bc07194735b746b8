//! The component record: the atomic unit of the protocol.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One renderable UI node as emitted by the model.
///
/// Records are derived, never stored: every extraction pass produces a fresh
/// list that supersedes the previous one. `id` is the only identity and is
/// what display layers key on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub id: String,
    /// Raw type tag exactly as the producer wrote it.
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ComponentRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            parent_id: None,
            properties: Map::new(),
            payload: None,
        }
    }

    #[must_use]
    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Typed view of the tag; `None` for tags outside the known set.
    #[must_use]
    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::parse(&self.type_tag)
    }
}

// ---------------------------------------------------------------------------
// Component kinds
// ---------------------------------------------------------------------------

/// The closed set of tags the built-in registry knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Card,
    Chart,
    Table,
    List,
    Code,
    Quote,
    Image,
    Accordion,
    Tabs,
    Progress,
    Badge,
    Button,
    Link,
    Diagram,
    Timeline,
    SlideDeck,
}

impl ComponentKind {
    pub const ALL: [Self; 16] = [
        Self::Card,
        Self::Chart,
        Self::Table,
        Self::List,
        Self::Code,
        Self::Quote,
        Self::Image,
        Self::Accordion,
        Self::Tabs,
        Self::Progress,
        Self::Badge,
        Self::Button,
        Self::Link,
        Self::Diagram,
        Self::Timeline,
        Self::SlideDeck,
    ];

    /// Canonical tag.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Chart => "chart",
            Self::Table => "table",
            Self::List => "list",
            Self::Code => "code",
            Self::Quote => "quote",
            Self::Image => "image",
            Self::Accordion => "accordion",
            Self::Tabs => "tabs",
            Self::Progress => "progress",
            Self::Badge => "badge",
            Self::Button => "button",
            Self::Link => "link",
            Self::Diagram => "diagram",
            Self::Timeline => "timeline",
            Self::SlideDeck => "slide-deck",
        }
    }

    /// Parse a producer tag, tolerating case, `_`/space separators and the
    /// few aliases models commonly emit.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = normalize_tag(tag);
        match normalized.as_str() {
            "mindmap" | "mind-map" => return Some(Self::Diagram),
            "slides" | "slideshow" | "slidedeck" | "deck" => return Some(Self::SlideDeck),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_tag() == normalized)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Lowercase, trim, and map `_`/space to `-`.
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
