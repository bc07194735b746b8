#![forbid(unsafe_code)]

//! Generative-UI protocol for FrankenTUI.
//!
//! A language model streams free text that may contain fenced structured
//! directives. This crate turns that text into a keyed tree of rendered
//! components:
//!
//! ```text
//! text deltas -> TranscriptBuffer -> extract -> ComponentForest -> Registry -> RenderedTree
//! ```
//!
//! # Example
//!
//! ```
//! use ftui_genui::{GenUiConfig, Pipeline};
//!
//! let pipeline = Pipeline::new(GenUiConfig::default());
//! let text = "Here is a result:\n```json\n{\"id\":\"x\",\"type\":\"badge\",\"properties\":{\"text\":\"Done\"}}\n```";
//! let pass = pipeline.run(text);
//! assert_eq!(pass.tree.roots.len(), 1);
//! assert_eq!(pass.tree.roots[0].type_tag, "badge");
//! ```

pub mod boundary;
pub mod config;
pub mod error;
pub mod extract;
pub mod paint;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod renderers;
pub mod stream;
pub mod tree;
pub mod view;

pub use config::{ChartConfig, ExtractConfig, GenUiConfig, MindmapLayoutConfig};
pub use error::{RenderError, TransportError};
pub use extract::{DirectiveExtractor, Extraction, ExtractionReport, strip_directives};
pub use paint::{paint_node, paint_tree};
pub use pipeline::{Pipeline, PipelinePass};
pub use record::{ComponentKind, ComponentRecord};
pub use registry::{
    ComponentRenderer, NodeStatus, Props, Registry, RenderInput, RenderedNode, RenderedTree,
};
pub use renderers::chart::{ChartKind, ChartView};
pub use renderers::mindmap::{MindmapLayout, MindmapNode, layout_mindmap};
pub use stream::{
    AbortHandle, ChunkSource, FnSource, IterSource, PacedSource, PassTrigger, ReaderSource,
    RenderPass, StreamOutcome, StreamSession, StreamStatus, TranscriptBuffer,
};
pub use tree::{ComponentForest, TreeNode};
pub use view::{Tone, View};
