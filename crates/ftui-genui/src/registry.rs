//! Component registry and recursive dispatcher.
//!
//! The registry maps a normalised type tag to a [`ComponentRenderer`]. Tags
//! with no entry go to the registry's default renderer, which produces the
//! labelled "unknown type" placeholder; that path is a first-class entry, not
//! a scattered fallback.
//!
//! Dispatch walks a [`ComponentForest`] bottom-up: children are rendered
//! first, then handed to the parent's renderer, which may place them in
//! [`View::Slot`]s. Every renderer call runs inside the per-node
//! [`boundary`](crate::boundary), so a failure replaces only that node.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::boundary;
use crate::config::GenUiConfig;
use crate::error::RenderError;
use crate::record::{ComponentKind, ComponentRecord, normalize_tag};
use crate::renderers;
use crate::tree::{ComponentForest, TreeNode};
use crate::view::{PlaceholderKind, View};

/// Merged renderer input: properties overlaid with the payload.
pub type Props = Map<String, Value>;

/// Everything a renderer sees for one node.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub record: &'a ComponentRecord,
    pub props: &'a Props,
    /// Already-rendered children, in record order.
    pub children: &'a [RenderedNode],
    pub config: &'a GenUiConfig,
}

/// Renders one component type.
pub trait ComponentRenderer: Send + Sync {
    /// Project the merged props (and rendered children) into a view.
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError>;

    /// Key under which a non-object payload is exposed to [`render`](Self::render).
    fn payload_key(&self) -> &'static str {
        "payload"
    }

    /// Every key the renderer accepts its primary input under, in lookup
    /// order. Empty when the renderer has no aliased input.
    fn input_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Short title for outlines and logs.
    fn title(&self, props: &Props) -> Option<String> {
        renderers::text_prop(props, &["title", "label", "name"])
    }
}

struct FnRenderer<F> {
    payload_key: &'static str,
    render: F,
}

impl<F> ComponentRenderer for FnRenderer<F>
where
    F: Fn(&RenderInput<'_>) -> Result<View, RenderError> + Send + Sync,
{
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        (self.render)(input)
    }

    fn payload_key(&self) -> &'static str {
        self.payload_key
    }
}

/// The default entry: a labelled placeholder that keeps any children visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownTypeRenderer;

impl ComponentRenderer for UnknownTypeRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let mut items = vec![View::Placeholder(PlaceholderKind::UnknownType {
            type_tag: input.record.type_tag.clone(),
        })];
        items.extend(View::slots(input.children.len()));
        Ok(View::stack(items))
    }
}

// ---------------------------------------------------------------------------
// Rendered output
// ---------------------------------------------------------------------------

/// How a node's view came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    /// A registered renderer produced the view.
    Rendered,
    /// No renderer is registered for the tag; the view is the unknown-type
    /// placeholder.
    Unknown,
    /// The renderer failed; the view is the render-failed placeholder.
    Failed,
}

/// One rendered component, keyed by its record id.
///
/// Children the view does not place in a [`View::Slot`] are still part of
/// the node and are shown after it by display layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub key: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub view: View,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.status != NodeStatus::Rendered
    }

    /// Indices of children the view does not place itself.
    #[must_use]
    pub fn unplaced_children(&self) -> Vec<usize> {
        let placed = self.view.slot_indices();
        (0..self.children.len())
            .filter(|index| !placed.contains(index))
            .collect()
    }

    /// This node and its descendants, pre-order.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a RenderedNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

/// The downstream product of one dispatch over a batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RenderedTree {
    pub roots: Vec<RenderedNode>,
}

impl RenderedTree {
    /// Every node, pre-order.
    #[must_use]
    pub fn nodes(&self) -> Vec<&RenderedNode> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.walk(&mut out);
        }
        out
    }

    /// Total number of rendered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// First node with this key, pre-order.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&RenderedNode> {
        self.nodes().into_iter().find(|node| node.key == key)
    }

    /// Nodes rendered as unknown-type or failure placeholders.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&RenderedNode> {
        self.nodes()
            .into_iter()
            .filter(|node| node.is_placeholder())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Tag → renderer map plus the default entry.
#[derive(Clone)]
pub struct Registry {
    renderers: HashMap<String, Arc<dyn ComponentRenderer>>,
    fallback: Arc<dyn ComponentRenderer>,
    config: GenUiConfig,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.tags())
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins(GenUiConfig::default())
    }
}

impl Registry {
    /// A registry with no entries; every tag renders the unknown placeholder.
    #[must_use]
    pub fn empty(config: GenUiConfig) -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: Arc::new(UnknownTypeRenderer),
            config,
        }
    }

    /// A registry with a renderer for every [`ComponentKind`].
    #[must_use]
    pub fn with_builtins(config: GenUiConfig) -> Self {
        let mut registry = Self::empty(config);
        renderers::register_builtins(&mut registry);
        registry
    }

    #[must_use]
    pub fn config(&self) -> &GenUiConfig {
        &self.config
    }

    /// Add or replace the renderer for `tag`.
    pub fn register(
        &mut self,
        tag: &str,
        renderer: impl ComponentRenderer + 'static,
    ) -> &mut Self {
        self.renderers.insert(normalize_tag(tag), Arc::new(renderer));
        self
    }

    /// Register a closure as the renderer for `tag`.
    pub fn register_fn<F>(&mut self, tag: &str, payload_key: &'static str, render: F) -> &mut Self
    where
        F: Fn(&RenderInput<'_>) -> Result<View, RenderError> + Send + Sync + 'static,
    {
        self.register(
            tag,
            FnRenderer {
                payload_key,
                render,
            },
        )
    }

    /// Replace the default (unknown type) entry.
    pub fn set_fallback(&mut self, renderer: impl ComponentRenderer + 'static) -> &mut Self {
        self.fallback = Arc::new(renderer);
        self
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Resolve a producer tag: exact normalised match first, then the
    /// canonical tag of a known alias.
    #[must_use]
    pub fn lookup(&self, tag: &str) -> Option<&Arc<dyn ComponentRenderer>> {
        let normalized = normalize_tag(tag);
        self.renderers.get(&normalized).or_else(|| {
            ComponentKind::parse(&normalized).and_then(|kind| self.renderers.get(kind.as_tag()))
        })
    }

    #[must_use]
    pub fn is_known(&self, tag: &str) -> bool {
        self.lookup(tag).is_some()
    }

    /// Render every record reachable from a root.
    #[must_use]
    pub fn render_records(&self, records: &[ComponentRecord]) -> RenderedTree {
        self.render_forest(&ComponentForest::new(records))
    }

    /// Render a forest, one boundary per node.
    #[must_use]
    pub fn render_forest(&self, forest: &ComponentForest<'_>) -> RenderedTree {
        for id in forest.duplicate_ids() {
            tracing::warn!(
                component_id = %id,
                "duplicate component id; children attach to the first occurrence"
            );
        }
        RenderedTree {
            roots: forest
                .materialize()
                .iter()
                .map(|root| self.dispatch(root))
                .collect(),
        }
    }

    /// Render one node after its children.
    #[must_use]
    pub fn dispatch(&self, node: &TreeNode<'_>) -> RenderedNode {
        let children: Vec<RenderedNode> =
            node.children.iter().map(|child| self.dispatch(child)).collect();
        let record = node.record;

        let (renderer, status) = match self.lookup(&record.type_tag) {
            Some(renderer) => (renderer, NodeStatus::Rendered),
            None => (&self.fallback, NodeStatus::Unknown),
        };
        let props = merge_props(record, renderer.as_ref());
        let title = renderer.title(&props);
        let input = RenderInput {
            record,
            props: &props,
            children: &children,
            config: &self.config,
        };

        match boundary::isolate(record, || renderer.render(&input)) {
            Ok(view) => RenderedNode {
                key: record.id.clone(),
                type_tag: record.type_tag.clone(),
                status,
                title,
                view,
                children,
            },
            Err(error) => RenderedNode {
                key: record.id.clone(),
                type_tag: record.type_tag.clone(),
                status: NodeStatus::Failed,
                title,
                view: boundary::failure_view(record, &error, children.len()),
                children,
            },
        }
    }
}

/// Overlay the payload on the properties.
///
/// An object payload wins key by key over the properties; any other payload
/// is exposed under the renderer's `payload_key`, again taking precedence.
/// When the payload supplies the renderer's primary input under any of its
/// [`input_keys`](ComponentRenderer::input_keys), every property spelling of
/// that input is dropped, so properties never shadow payload data.
#[must_use]
pub fn merge_props(record: &ComponentRecord, renderer: &dyn ComponentRenderer) -> Props {
    let mut props = record.properties.clone();
    let input_keys = renderer.input_keys();
    match &record.payload {
        Some(Value::Object(payload)) => {
            if input_keys.iter().any(|key| payload.contains_key(*key)) {
                for key in input_keys {
                    props.shift_remove(*key);
                }
            }
            for (key, value) in payload {
                props.insert(key.clone(), value.clone());
            }
        }
        Some(other) => {
            for key in input_keys {
                props.shift_remove(*key);
            }
            props.insert(renderer.payload_key().to_string(), other.clone());
        }
        None => {}
    }
    props
}
