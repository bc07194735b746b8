//! Mindmap diagrams and the weighted subtree layout.
//!
//! The layout gives every subtree a vertical band proportional to its weight,
//! so sibling subtrees never overlap however unbalanced the tree is:
//!
//! 1. **Weights** (post-order): a leaf weighs `H` (`min_node_height`); an
//!    internal node weighs the sum of its children, floored at `H`.
//! 2. **Placement** (pre-order): the root owns `[0, weight × span_scale]`.
//!    Each child takes a slice of its parent's span proportional to its share
//!    of the sibling weight, laid out contiguously from the parent's start.
//!    The last child is snapped to the parent's end so the slices partition
//!    the span exactly. A node sits at the midpoint of its span, at
//!    `origin_x + depth × depth_step`.
//!
//! Spans are in scaled units: a leaf's span is `H × span_scale`.
//!
//! Both passes run over a flat pre-order arena, so deep trees cannot blow
//! the stack.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{array_prop, text_prop};
use crate::config::MindmapLayoutConfig;
use crate::error::RenderError;
use crate::registry::{ComponentRenderer, Props, RenderInput};
use crate::view::View;

const LABEL_KEYS: &[&str] = &["label", "text", "title", "name", "topic", "id"];

// ---------------------------------------------------------------------------
// Input tree
// ---------------------------------------------------------------------------

/// A labelled node with ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MindmapNode {
    pub label: String,
    pub children: Vec<MindmapNode>,
}

impl Drop for MindmapNode {
    // Iterative, so a deep chain does not recurse on drop.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl MindmapNode {
    #[must_use]
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn child(mut self, child: MindmapNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this tree.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Parse a nested `{label, children}` value; strings are leaves.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(label) => Some(Self::leaf(label.clone())),
            Value::Object(object) => Some(Self::from_object(object)),
            _ => None,
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            label: text_prop(object, LABEL_KEYS).unwrap_or_default(),
            children: array_prop(object, &["children", "nodes", "items"])
                .map(|children| children.iter().filter_map(Self::from_value).collect())
                .unwrap_or_default(),
        }
    }

    /// Build a tree from a flat `[{id, label, parent}]` list.
    ///
    /// Nodes whose parent chain never reaches a root are dropped. Several
    /// roots are gathered under a synthetic root labelled `root_label`.
    pub fn from_flat(nodes: &[Value], root_label: &str) -> Result<Self, RenderError> {
        struct Flat {
            id: String,
            parent: Option<String>,
            label: String,
        }

        struct Frame {
            index: usize,
            cursor: usize,
            node: MindmapNode,
        }

        let flat: Vec<Flat> = nodes
            .iter()
            .filter_map(|value| {
                let object = value.as_object()?;
                let id = text_prop(object, &["id", "key"])?;
                Some(Flat {
                    label: text_prop(object, LABEL_KEYS).unwrap_or_else(|| id.clone()),
                    parent: text_prop(object, &["parent", "parentId", "parent_id"]),
                    id,
                })
            })
            .collect();

        let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, entry) in flat.iter().enumerate() {
            if let Some(parent) = entry.parent.as_deref() {
                children_of.entry(parent).or_default().push(index);
            }
        }

        // Depth-first with an explicit stack; each entry is claimed by the
        // first node that reaches it, so duplicate ids and cycles terminate.
        let mut claimed = vec![false; flat.len()];
        let mut built = Vec::new();
        for root in (0..flat.len()).filter(|index| flat[*index].parent.is_none()) {
            let mut stack = vec![Frame {
                index: root,
                cursor: 0,
                node: MindmapNode::leaf(flat[root].label.clone()),
            }];
            while let Some(frame) = stack.last_mut() {
                let candidates = children_of
                    .get(flat[frame.index].id.as_str())
                    .map_or(&[][..], Vec::as_slice);
                let next = candidates[frame.cursor.min(candidates.len())..]
                    .iter()
                    .position(|child| !claimed[*child]);
                match next {
                    Some(offset) => {
                        let child = candidates[frame.cursor + offset];
                        frame.cursor += offset + 1;
                        claimed[child] = true;
                        stack.push(Frame {
                            index: child,
                            cursor: 0,
                            node: MindmapNode::leaf(flat[child].label.clone()),
                        });
                    }
                    None => {
                        let Some(done) = stack.pop() else { break };
                        match stack.last_mut() {
                            Some(parent) => parent.node.children.push(done.node),
                            None => built.push(done.node),
                        }
                    }
                }
            }
        }

        match built.len() {
            0 => Err(RenderError::invalid("nodes", "no root node")),
            1 => Ok(built.remove(0)),
            _ => Ok(MindmapNode {
                label: root_label.to_string(),
                children: built,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Layout output
// ---------------------------------------------------------------------------

/// A point in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

/// A closed vertical interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutSpan {
    pub start: f64,
    pub end: f64,
}

impl LayoutSpan {
    #[must_use]
    pub fn height(&self) -> f64 {
        self.end - self.start
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        self.start + self.height() / 2.0
    }
}

/// An axis-aligned rectangle in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A positioned node. `index` is its pre-order position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedNode {
    pub index: usize,
    pub parent: Option<usize>,
    pub label: String,
    pub depth: usize,
    pub weight: f64,
    pub span: LayoutSpan,
    pub position: LayoutPoint,
    pub children: Vec<usize>,
}

/// Straight connector between a parent and one child.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connector {
    pub from: usize,
    pub to: usize,
    pub start: LayoutPoint,
    pub end: LayoutPoint,
}

/// Result of [`layout_mindmap`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MindmapLayout {
    /// Nodes in pre-order; the root is at index 0.
    pub nodes: Vec<PlacedNode>,
    pub connectors: Vec<Connector>,
    pub bounds: LayoutRect,
    pub config: MindmapLayoutConfig,
}

impl MindmapLayout {
    #[must_use]
    pub fn root(&self) -> Option<&PlacedNode> {
        self.nodes.first()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Lay out a mindmap with the weighted subtree algorithm.
#[must_use]
pub fn layout_mindmap(root: &MindmapNode, config: &MindmapLayoutConfig) -> MindmapLayout {
    let config = config.sanitized();
    let unit = config.min_node_height;

    // Flatten to pre-order.
    let mut nodes: Vec<PlacedNode> = Vec::with_capacity(root.size());
    let mut stack: Vec<(&MindmapNode, Option<usize>, usize)> = vec![(root, None, 0)];
    while let Some((node, parent, depth)) = stack.pop() {
        let index = nodes.len();
        if let Some(parent) = parent {
            nodes[parent].children.push(index);
        }
        nodes.push(PlacedNode {
            index,
            parent,
            label: node.label.clone(),
            depth,
            weight: unit,
            span: LayoutSpan {
                start: 0.0,
                end: 0.0,
            },
            position: LayoutPoint { x: 0.0, y: 0.0 },
            children: Vec::new(),
        });
        for child in node.children.iter().rev() {
            stack.push((child, Some(index), depth + 1));
        }
    }

    // Weights: children follow parents in pre-order, so a reverse sweep sees
    // every child before its parent.
    for index in (0..nodes.len()).rev() {
        if !nodes[index].children.is_empty() {
            let total: f64 = nodes[index]
                .children
                .iter()
                .map(|child| nodes[*child].weight)
                .sum();
            nodes[index].weight = total.max(unit);
        }
    }

    // Placement.
    nodes[0].span = LayoutSpan {
        start: 0.0,
        end: nodes[0].weight * config.span_scale,
    };
    let mut connectors = Vec::with_capacity(nodes.len().saturating_sub(1));
    for index in 0..nodes.len() {
        let span = nodes[index].span;
        nodes[index].position = LayoutPoint {
            x: config.origin_x + nodes[index].depth as f64 * config.depth_step,
            y: span.midpoint(),
        };
        if let Some(parent) = nodes[index].parent {
            connectors.push(Connector {
                from: parent,
                to: index,
                start: nodes[parent].position,
                end: nodes[index].position,
            });
        }

        let children = nodes[index].children.clone();
        let sibling_weight: f64 = children.iter().map(|child| nodes[*child].weight).sum();
        let mut cursor = span.start;
        for (position, child) in children.iter().enumerate() {
            let end = if position + 1 == children.len() {
                span.end
            } else {
                cursor + span.height() * (nodes[*child].weight / sibling_weight)
            };
            nodes[*child].span = LayoutSpan { start: cursor, end };
            cursor = end;
        }
    }

    let max_depth = nodes.iter().map(|node| node.depth).max().unwrap_or(0);
    let bounds = LayoutRect {
        x: config.origin_x,
        y: nodes[0].span.start,
        width: max_depth as f64 * config.depth_step,
        height: nodes[0].span.height(),
    };

    tracing::debug!(
        message = "genui.mindmap.layout",
        nodes = nodes.len(),
        max_depth,
        height = bounds.height,
    );

    MindmapLayout {
        nodes,
        connectors,
        bounds,
        config,
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Resolve the mindmap tree from merged props.
///
/// Accepted shapes, in order: `root` (nested node or label), the props
/// themselves when they carry `children`, a flat `nodes` list.
pub fn mindmap_tree(props: &Props) -> Result<MindmapNode, RenderError> {
    if let Some(root) = props.get("root").or_else(|| props.get("tree")) {
        return MindmapNode::from_value(root)
            .ok_or_else(|| RenderError::invalid("root", "expected an object or a label"));
    }
    if let Some(Value::Array(_)) = props.get("children") {
        let mut node = MindmapNode::from_object(props);
        if node.label.is_empty() {
            node.label = text_prop(props, &["central", "center"]).unwrap_or_default();
        }
        return Ok(node);
    }
    if let Some(nodes) = array_prop(props, &["nodes"]) {
        let root_label = text_prop(props, &["title", "label"]).unwrap_or_else(|| "Mindmap".into());
        return MindmapNode::from_flat(nodes, &root_label);
    }
    Err(RenderError::missing("root"))
}

/// Mindmap diagram.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagramRenderer;

impl ComponentRenderer for DiagramRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let tree = mindmap_tree(input.props)?;
        Ok(View::Diagram(layout_mindmap(&tree, &input.config.layout)))
    }

    fn payload_key(&self) -> &'static str {
        "nodes"
    }

    fn title(&self, props: &Props) -> Option<String> {
        text_prop(props, &["title"]).or_else(|| mindmap_tree(props).ok().map(|tree| tree.label.clone()))
    }
}
