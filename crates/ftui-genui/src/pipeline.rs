//! One synchronous pass: extract → assemble → dispatch.

use serde::Serialize;
use tracing::field::Empty;
use web_time::Instant;

use crate::config::GenUiConfig;
use crate::extract::{DirectiveExtractor, ExtractionReport};
use crate::record::ComponentRecord;
use crate::registry::{Registry, RenderedTree};
use crate::tree::ComponentForest;

/// Everything one pass produced from a text snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelinePass {
    pub records: Vec<ComponentRecord>,
    pub report: ExtractionReport,
    /// The response text with directives removed.
    pub prose: String,
    pub tree: RenderedTree,
    /// Ids of records that no walk from a root reaches.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicate_ids: Vec<String>,
}

/// Extractor plus registry, run as a pure function of the text.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: DirectiveExtractor,
    registry: Registry,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(GenUiConfig::default())
    }
}

impl Pipeline {
    /// Built-in registry, extractor stamped with the current time.
    #[must_use]
    pub fn new(config: GenUiConfig) -> Self {
        Self {
            extractor: DirectiveExtractor::new(config.extract.clone()),
            registry: Registry::with_builtins(config),
        }
    }

    /// Like [`new`](Self::new) with a fixed id epoch, for reproducible output.
    #[must_use]
    pub fn with_epoch(config: GenUiConfig, epoch_ms: u64) -> Self {
        Self {
            extractor: DirectiveExtractor::with_epoch(config.extract.clone(), epoch_ms),
            registry: Registry::with_builtins(config),
        }
    }

    #[must_use]
    pub fn from_parts(extractor: DirectiveExtractor, registry: Registry) -> Self {
        Self {
            extractor,
            registry,
        }
    }

    #[must_use]
    pub fn extractor(&self) -> &DirectiveExtractor {
        &self.extractor
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry, for registering extra component types.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Run one full pass over `text`.
    #[must_use]
    pub fn run(&self, text: &str) -> PipelinePass {
        let start = Instant::now();
        let span = tracing::debug_span!(
            "genui.pass",
            text_len = text.len(),
            records = Empty,
            nodes = Empty,
            duration_us = Empty,
        );
        let _guard = span.enter();

        let extraction = self.extractor.extract(text);
        let forest = ComponentForest::new(&extraction.records);
        let tree = self.registry.render_forest(&forest);
        let orphans = forest
            .unreachable()
            .into_iter()
            .map(|record| record.id.clone())
            .collect();
        let duplicate_ids = forest
            .duplicate_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        let prose = extraction.prose(text);

        let duration_us = start.elapsed().as_micros() as u64;
        span.record("records", extraction.records.len());
        span.record("nodes", tree.len());
        span.record("duration_us", duration_us);

        PipelinePass {
            records: extraction.records,
            report: extraction.report,
            prose,
            tree,
            orphans,
            duplicate_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline::with_epoch(GenUiConfig::default(), 7)
    }

    #[test]
    fn prose_and_tree_come_from_the_same_snapshot() {
        let text = "Intro\n```json\n{\"id\":\"x\",\"type\":\"badge\",\"properties\":{\"text\":\"Done\"}}\n```\nOutro";
        let pass = pipeline().run(text);
        assert_eq!(pass.records.len(), 1);
        assert_eq!(pass.tree.roots[0].key, "x");
        assert_eq!(pass.prose, "Intro\n\nOutro");
    }

    #[test]
    fn orphans_are_reported_not_rendered() {
        let text = "```json\n[{\"id\":\"r\",\"type\":\"card\"},{\"id\":\"o\",\"type\":\"badge\",\"parentId\":\"gone\",\"properties\":{\"text\":\"?\"}}]\n```";
        let pass = pipeline().run(text);
        assert_eq!(pass.tree.len(), 1);
        assert_eq!(pass.orphans, vec!["o"]);
    }

    #[test]
    fn same_text_same_pass() {
        let text = "```json\n[{\"type\":\"badge\",\"properties\":{\"text\":\"a\"}}]\n```";
        let pipeline = pipeline();
        assert_eq!(pipeline.run(text), pipeline.run(text));
    }
}
