//! Visual primitives produced by renderers.
//!
//! A [`View`] is plain data: it says *what* to show, not how to style it.
//! Display layers (the text painter in [`crate::paint`], a web bridge, a
//! FrankenTUI widget tree) mount it however they like.

use serde::Serialize;

use crate::renderers::chart::ChartView;
use crate::renderers::mindmap::MindmapLayout;

/// Semantic emphasis derived from a record's `variant` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    #[default]
    Neutral,
    Accent,
    Success,
    Warning,
    Danger,
    Muted,
}

impl Tone {
    /// Map the variant names producers use onto a tone.
    #[must_use]
    pub fn from_variant(variant: Option<&str>) -> Self {
        let Some(variant) = variant else {
            return Self::Neutral;
        };
        match variant.trim().to_ascii_lowercase().as_str() {
            "primary" | "info" | "accent" | "default-primary" => Self::Accent,
            "success" | "positive" | "green" => Self::Success,
            "warning" | "warn" | "caution" => Self::Warning,
            "danger" | "error" | "destructive" | "negative" => Self::Danger,
            "secondary" | "outline" | "ghost" | "muted" | "subtle" => Self::Muted,
            _ => Self::Neutral,
        }
    }
}

/// One titled entry with a body (accordion section, tab, slide).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: View,
}

/// One point on a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub when: Option<String>,
    pub title: String,
    pub detail: Option<String>,
}

/// Why a node shows a placeholder instead of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum PlaceholderKind {
    /// The type tag has no registered renderer.
    UnknownType { type_tag: String },
    /// The renderer failed for this node.
    RenderFailed { type_tag: String, message: String },
}

/// A visual primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "kebab-case")]
pub enum View {
    /// Nothing to show.
    Empty,
    Text {
        text: String,
        tone: Tone,
    },
    Heading {
        text: String,
        level: u8,
    },
    /// Vertical stack.
    Stack {
        items: Vec<View>,
    },
    /// Bordered container with an optional title.
    Panel {
        title: Option<String>,
        tone: Tone,
        body: Box<View>,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List {
        ordered: bool,
        items: Vec<View>,
    },
    Code {
        language: Option<String>,
        source: String,
    },
    Quote {
        text: String,
        attribution: Option<String>,
    },
    Image {
        source: String,
        alt: Option<String>,
        caption: Option<String>,
    },
    /// Horizontal fill gauge, `ratio` in `0.0..=1.0`.
    Gauge {
        label: Option<String>,
        ratio: f64,
    },
    Badge {
        text: String,
        tone: Tone,
    },
    Button {
        label: String,
        action: Option<String>,
        tone: Tone,
    },
    Link {
        text: String,
        href: String,
    },
    /// Collapsible sections; `open` lists the expanded indices.
    Sections {
        sections: Vec<Section>,
        open: Vec<usize>,
    },
    Tabs {
        tabs: Vec<Section>,
        active: usize,
    },
    Deck {
        slides: Vec<Section>,
        current: usize,
    },
    Timeline {
        entries: Vec<TimelineEntry>,
    },
    Chart(ChartView),
    Diagram(MindmapLayout),
    /// Position of the rendered child at this index.
    Slot {
        index: usize,
    },
    Placeholder(PlaceholderKind),
    /// Explicit "nothing here" message (e.g. a chart with no data).
    EmptyState {
        message: String,
    },
}

impl View {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            tone: Tone::Neutral,
        }
    }

    #[must_use]
    pub fn muted(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            tone: Tone::Muted,
        }
    }

    /// Stack the given views, collapsing trivial cases.
    #[must_use]
    pub fn stack(items: Vec<View>) -> Self {
        let mut items: Vec<View> = items
            .into_iter()
            .filter(|v| !matches!(v, View::Empty))
            .collect();
        match items.len() {
            0 => Self::Empty,
            1 => items.remove(0),
            _ => Self::Stack { items },
        }
    }

    /// Slot views for children `0..count`.
    #[must_use]
    pub fn slots(count: usize) -> Vec<View> {
        (0..count).map(|index| View::Slot { index }).collect()
    }

    /// Child indices referenced anywhere inside this view.
    #[must_use]
    pub fn slot_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.visit(&mut |view| {
            if let View::Slot { index } = view {
                out.push(*index);
            }
        });
        out
    }

    /// Depth-first visit of this view and every nested view.
    pub fn visit(&self, f: &mut dyn FnMut(&View)) {
        f(self);
        match self {
            Self::Stack { items } | Self::List { items, .. } => {
                for item in items {
                    item.visit(f);
                }
            }
            Self::Panel { body, .. } => body.visit(f),
            Self::Sections { sections, .. } => {
                for section in sections {
                    section.body.visit(f);
                }
            }
            Self::Tabs { tabs, .. } => {
                for tab in tabs {
                    tab.body.visit(f);
                }
            }
            Self::Deck { slides, .. } => {
                for slide in slides {
                    slide.body.visit(f);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_tones() {
        assert_eq!(Tone::from_variant(Some("Destructive")), Tone::Danger);
        assert_eq!(Tone::from_variant(Some("outline")), Tone::Muted);
        assert_eq!(Tone::from_variant(Some("sparkly")), Tone::Neutral);
        assert_eq!(Tone::from_variant(None), Tone::Neutral);
    }

    #[test]
    fn stack_collapses_empty_and_single() {
        assert_eq!(View::stack(vec![View::Empty]), View::Empty);
        assert_eq!(View::stack(vec![View::text("a")]), View::text("a"));
    }

    #[test]
    fn slot_indices_reach_into_nested_sections() {
        let view = View::Panel {
            title: None,
            tone: Tone::Neutral,
            body: Box::new(View::Tabs {
                tabs: vec![Section {
                    title: "one".into(),
                    body: View::Slot { index: 1 },
                }],
                active: 0,
            }),
        };
        assert_eq!(view.slot_indices(), vec![1]);
    }
}
