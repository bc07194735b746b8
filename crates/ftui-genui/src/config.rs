//! Pipeline configuration.
//!
//! Every field has a default, so a partial TOML/JSON document or a replay
//! profile only needs to mention what it changes.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenUiConfig {
    pub extract: ExtractConfig,
    pub layout: MindmapLayoutConfig,
    pub chart: ChartConfig,
}

impl GenUiConfig {
    #[must_use]
    pub fn extract(mut self, extract: ExtractConfig) -> Self {
        self.extract = extract;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: MindmapLayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn chart(mut self, chart: ChartConfig) -> Self {
        self.chart = chart;
        self
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Which fenced blocks the extractor attempts to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Info tags that mark a fence as structured data (compared
    /// case-insensitively).
    pub fence_hints: Vec<String>,
    /// Whether a fence without any info tag is decoded too.
    pub accept_untagged: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fence_hints: ["json", "ui", "genui", "component", "components"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            accept_untagged: true,
        }
    }
}

impl ExtractConfig {
    #[must_use]
    pub fn accept_untagged(mut self, accept: bool) -> Self {
        self.accept_untagged = accept;
        self
    }

    #[must_use]
    pub fn fence_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fence_hints = hints.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a fence with this info tag carries a directive.
    #[must_use]
    pub fn is_structured_tag(&self, tag: &str) -> bool {
        if tag.is_empty() {
            return self.accept_untagged;
        }
        self.fence_hints
            .iter()
            .any(|hint| hint.eq_ignore_ascii_case(tag))
    }
}

// ---------------------------------------------------------------------------
// Mindmap layout
// ---------------------------------------------------------------------------

/// Constants for the weighted subtree layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindmapLayoutConfig {
    /// Unit weight of a leaf (`H`), in layout units.
    pub min_node_height: f64,
    /// Breathing-room factor applied to the root span.
    pub span_scale: f64,
    /// Horizontal distance between consecutive depths.
    pub depth_step: f64,
    /// Horizontal position of the root.
    pub origin_x: f64,
}

impl Default for MindmapLayoutConfig {
    fn default() -> Self {
        Self {
            min_node_height: 40.0,
            span_scale: 1.2,
            depth_step: 180.0,
            origin_x: 0.0,
        }
    }
}

impl MindmapLayoutConfig {
    #[must_use]
    pub fn min_node_height(mut self, height: f64) -> Self {
        self.min_node_height = height;
        self
    }

    #[must_use]
    pub fn span_scale(mut self, scale: f64) -> Self {
        self.span_scale = scale;
        self
    }

    #[must_use]
    pub fn depth_step(mut self, step: f64) -> Self {
        self.depth_step = step;
        self
    }

    /// Replace non-finite or non-positive constants with the defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let fallback = Self::default();
        let positive = |value: f64, default: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                default
            }
        };
        Self {
            min_node_height: positive(self.min_node_height, fallback.min_node_height),
            span_scale: positive(self.span_scale, fallback.span_scale),
            depth_step: positive(self.depth_step, fallback.depth_step),
            origin_x: if self.origin_x.is_finite() {
                self.origin_x
            } else {
                fallback.origin_x
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Default chart styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Series colours, cycled by series index modulo length.
    pub palette: Vec<String>,
    /// Message shown instead of an empty chart surface.
    pub empty_message: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            palette: [
                "#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#0088fe", "#00c49f", "#ffbb28",
                "#ff8042",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            empty_message: "No data to display".to_string(),
        }
    }
}

impl ChartConfig {
    /// Colour for the series (or slice) at `index`.
    #[must_use]
    pub fn color(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            return "#888888";
        }
        &self.palette[index % self.palette.len()]
    }
}
