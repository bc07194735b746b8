//! Directive extraction from free-form model output.
//!
//! The extractor scans the *whole* accumulated text for fenced blocks,
//! decodes each structured one on its own, and normalises the three accepted
//! payload shapes into one flat list of [`ComponentRecord`]s.
//!
//! # Wire format
//!
//! ````text
//! Here is a result:
//! ```json
//! {"id":"c1","type":"card","properties":{"title":"Result"},"payload":{"text":"done"}}
//! ```
//! ````
//!
//! A block may hold a single record object, an array of records, or a wrapper
//! object with a `components` array. Records may also nest their own
//! `children`; those are flattened here with `parentId` pointing at the
//! enclosing record.
//!
//! # Failure model
//!
//! Nothing in here returns an error. A block whose body does not decode is
//! skipped (this is routine while a block is still streaming in), elements
//! without a `type` are dropped, and one bad block never affects the next.
//! Everything skipped is counted in the [`ExtractionReport`].

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::config::ExtractConfig;
use crate::record::ComponentRecord;

/// A complete fence: opening ```` ``` ````, optional info tag, body, closing
/// ```` ``` ````. The body is matched lazily so consecutive blocks stay apart.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z][A-Za-z0-9_.+-]*)?[ \t]*\r?\n?(.*?)```")
        .expect("fence pattern is valid")
});

/// An opening fence with no closing partner yet.
static OPEN_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[ \t]*([A-Za-z][A-Za-z0-9_.+-]*)?").expect("open fence pattern is valid")
});

// ---------------------------------------------------------------------------
// Blocks and payload shapes
// ---------------------------------------------------------------------------

/// One fenced segment found in the text. Transient: borrowed from the buffer
/// for the duration of a single extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveBlock<'t> {
    /// Position among all complete fences in the text.
    pub ordinal: usize,
    /// Info tag after the opening fence (empty when absent).
    pub info: &'t str,
    pub body: &'t str,
    /// Byte range of the whole block, fences included.
    pub range: Range<usize>,
}

/// The decoded shape of a block body.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectivePayload {
    /// A single object exposing `type`.
    Single(Map<String, Value>),
    /// A top-level array of elements.
    Many(Vec<Value>),
    /// An object exposing a `components` array.
    Wrapped(Vec<Value>),
    /// Valid structured data that is not a directive.
    Other,
}

impl DirectivePayload {
    /// Discriminate a decoded value into one of the accepted shapes.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(elements) => Self::Many(elements),
            Value::Object(mut object) => {
                if type_tag(&object).is_some() {
                    Self::Single(object)
                } else if let Some(Value::Array(_)) = object.get("components") {
                    match object.remove("components") {
                        Some(Value::Array(elements)) => Self::Wrapped(elements),
                        _ => Self::Other,
                    }
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }

    /// Canonical element list; `Other` yields nothing.
    #[must_use]
    pub fn into_elements(self) -> Vec<Value> {
        match self {
            Self::Single(object) => vec![Value::Object(object)],
            Self::Many(elements) | Self::Wrapped(elements) => elements,
            Self::Other => Vec::new(),
        }
    }

    #[must_use]
    pub fn is_directive(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

// ---------------------------------------------------------------------------
// Extraction result
// ---------------------------------------------------------------------------

/// Counters describing what one extraction pass saw and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExtractionReport {
    /// Complete fenced blocks of any kind.
    pub blocks_matched: usize,
    /// Blocks whose body decoded into a directive shape.
    pub blocks_decoded: usize,
    /// Blocks tagged with a non-structured info tag (e.g. `python`).
    pub foreign_blocks: usize,
    /// Structured blocks whose body failed to decode.
    pub decode_failures: usize,
    /// Structured blocks that decoded into something other than a directive.
    pub unrecognized_payloads: usize,
    /// Elements dropped because they carry no usable `type`.
    pub untyped_elements: usize,
    /// Records produced.
    pub records: usize,
    /// An opening structured fence is still waiting for its closing fence.
    pub pending_directive: bool,
}

/// Records extracted from one snapshot of the text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub records: Vec<ComponentRecord>,
    pub report: ExtractionReport,
    /// Byte ranges of blocks that held directives.
    pub directive_spans: Vec<Range<usize>>,
    /// Start of a trailing structured block that has not closed yet.
    pub pending_from: Option<usize>,
}

impl Extraction {
    /// The free text around the directives: decoded directive blocks and a
    /// trailing pending block are cut out, everything else is kept verbatim.
    #[must_use]
    pub fn prose(&self, text: &str) -> String {
        let end = self.pending_from.unwrap_or(text.len()).min(text.len());
        let mut out = String::with_capacity(end);
        let mut cursor = 0;
        for span in &self.directive_spans {
            if span.start >= end {
                break;
            }
            out.push_str(&text[cursor..span.start]);
            cursor = span.end;
        }
        if cursor < end {
            out.push_str(&text[cursor..end]);
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Stateless (per call) scanner turning text into component records.
///
/// The only state is the id epoch: records that omit `id` get one built from
/// this timestamp plus their block and element position. The epoch is fixed
/// when the extractor is created, so repeated extraction over the same text
/// yields identical records and generated ids stay stable as a stream grows.
#[derive(Debug, Clone)]
pub struct DirectiveExtractor {
    config: ExtractConfig,
    epoch_ms: u64,
}

impl Default for DirectiveExtractor {
    fn default() -> Self {
        Self::new(ExtractConfig::default())
    }
}

impl DirectiveExtractor {
    /// Create an extractor stamped with the current time.
    #[must_use]
    pub fn new(config: ExtractConfig) -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self::with_epoch(config, epoch_ms)
    }

    /// Create an extractor with a fixed id epoch.
    #[must_use]
    pub fn with_epoch(config: ExtractConfig, epoch_ms: u64) -> Self {
        Self { config, epoch_ms }
    }

    #[must_use]
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    #[must_use]
    pub fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    /// Every complete fenced block in `text`, in order.
    pub fn blocks<'t>(&self, text: &'t str) -> impl Iterator<Item = DirectiveBlock<'t>> + 't {
        FENCE
            .captures_iter(text)
            .enumerate()
            .filter_map(|(ordinal, captures)| {
                let whole = captures.get(0)?;
                Some(DirectiveBlock {
                    ordinal,
                    info: captures.get(1).map_or("", |m| m.as_str()),
                    body: captures.get(2).map_or("", |m| m.as_str()),
                    range: whole.range(),
                })
            })
    }

    /// Extract every record from a snapshot of the accumulated text.
    #[must_use]
    pub fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let mut tail = 0;

        for block in self.blocks(text) {
            extraction.report.blocks_matched += 1;
            tail = block.range.end;

            if !self.config.is_structured_tag(block.info) {
                extraction.report.foreign_blocks += 1;
                continue;
            }

            let value = match serde_json::from_str::<Value>(block.body.trim()) {
                Ok(value) => value,
                Err(_) => {
                    extraction.report.decode_failures += 1;
                    continue;
                }
            };

            let payload = DirectivePayload::classify(value);
            if !payload.is_directive() {
                extraction.report.unrecognized_payloads += 1;
                continue;
            }

            extraction.report.blocks_decoded += 1;
            extraction.directive_spans.push(block.range.clone());
            for (index, element) in payload.into_elements().into_iter().enumerate() {
                let fallback = format!("genui-{}-{}-{}", self.epoch_ms, block.ordinal, index);
                self.collect(
                    &element,
                    fallback,
                    None,
                    &mut extraction.records,
                    &mut extraction.report,
                );
            }
        }

        extraction.pending_from = self.pending_start(text, tail);
        extraction.report.pending_directive = extraction.pending_from.is_some();
        extraction.report.records = extraction.records.len();

        tracing::debug!(
            message = "genui.extract",
            text_len = text.len(),
            blocks = extraction.report.blocks_matched,
            decoded = extraction.report.blocks_decoded,
            decode_failures = extraction.report.decode_failures,
            untyped = extraction.report.untyped_elements,
            records = extraction.report.records,
            pending = extraction.report.pending_directive,
        );

        extraction
    }

    /// Start offset of an unclosed structured fence after the last complete
    /// block, if any.
    fn pending_start(&self, text: &str, tail: usize) -> Option<usize> {
        let rest = text.get(tail..)?;
        let captures = OPEN_FENCE.captures(rest)?;
        let info = captures.get(1).map_or("", |m| m.as_str());
        if !self.config.is_structured_tag(info) {
            return None;
        }
        captures.get(0).map(|m| tail + m.start())
    }

    /// Turn one element (and its nested `children`) into records.
    fn collect(
        &self,
        element: &Value,
        fallback_id: String,
        forced_parent: Option<&str>,
        out: &mut Vec<ComponentRecord>,
        report: &mut ExtractionReport,
    ) {
        let Some(object) = element.as_object() else {
            report.untyped_elements += 1;
            return;
        };
        let Some(type_tag) = type_tag(object) else {
            report.untyped_elements += 1;
            return;
        };

        let id = scalar_string(object.get("id")).unwrap_or(fallback_id);
        let parent_id = match forced_parent {
            Some(parent) => Some(parent.to_string()),
            None => scalar_string(object.get("parentId"))
                .or_else(|| scalar_string(object.get("parent_id"))),
        };
        let properties = object
            .get("properties")
            .or_else(|| object.get("props"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let payload = object.get("payload").filter(|v| !v.is_null()).cloned();

        out.push(ComponentRecord {
            id: id.clone(),
            type_tag: type_tag.to_string(),
            parent_id,
            properties,
            payload,
        });

        if let Some(Value::Array(children)) = object.get("children") {
            for (index, child) in children.iter().enumerate() {
                self.collect(child, format!("{id}.{index}"), Some(&id), out, report);
            }
        }
    }
}

/// Extract with the default configuration.
#[must_use]
pub fn extract(text: &str) -> Extraction {
    DirectiveExtractor::default().extract(text)
}

/// The prose of a response with its directives removed.
#[must_use]
pub fn strip_directives(text: &str) -> String {
    extract(text).prose(text)
}

fn type_tag(object: &Map<String, Value>) -> Option<&str> {
    object
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extractor() -> DirectiveExtractor {
        DirectiveExtractor::with_epoch(ExtractConfig::default(), 1_700_000_000_000)
    }

    #[test]
    fn single_record_block_keeps_all_fields() {
        let text = "Here is a result:\n```json\n{\"id\":\"c1\",\"type\":\"card\",\"properties\":{\"title\":\"Result\"},\"payload\":{\"text\":\"done\"}}\n```";
        let extraction = extractor().extract(text);
        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.id, "c1");
        assert_eq!(record.type_tag, "card");
        assert_eq!(record.parent_id, None);
        assert_eq!(record.properties.get("title"), Some(&json!("Result")));
        assert_eq!(record.payload, Some(json!({"text": "done"})));
    }

    #[test]
    fn array_elements_keep_order_and_get_generated_ids() {
        let text = "```json\n[{\"type\":\"badge\"},{\"id\":\"b\",\"type\":\"card\"},{\"type\":\"list\"}]\n```";
        let extraction = extractor().extract(text);
        let ids: Vec<&str> = extraction.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "genui-1700000000000-0-0",
                "b",
                "genui-1700000000000-0-2"
            ]
        );
    }

    #[test]
    fn wrapper_object_recurses_into_components() {
        let text = "```ui\n{\"components\":[{\"id\":\"a\",\"type\":\"card\"},{\"id\":\"b\",\"type\":\"badge\",\"parentId\":\"a\"}]}\n```";
        let extraction = extractor().extract(text);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[1].parent_id.as_deref(), Some("a"));
    }

    #[test]
    fn malformed_block_does_not_affect_neighbours() {
        let text = "```json\n{\"id\":\"a\",\"type\":\"card\"}\n```\n```json\n{not json\n```\n```json\n{\"id\":\"c\",\"type\":\"card\"}\n```";
        let extraction = extractor().extract(text);
        let ids: Vec<&str> = extraction.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(extraction.report.decode_failures, 1);
    }

    #[test]
    fn untyped_elements_are_dropped_and_counted() {
        let text = "```json\n[{\"id\":\"a\"},{\"id\":\"b\",\"type\":\"\"},{\"id\":\"c\",\"type\":\"card\"},42]\n```";
        let extraction = extractor().extract(text);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.report.untyped_elements, 3);
    }

    #[test]
    fn foreign_fences_are_not_decoded() {
        let text = "```python\nprint('hi')\n```\n```json\n{\"type\":\"card\",\"id\":\"x\"}\n```";
        let extraction = extractor().extract(text);
        assert_eq!(extraction.report.foreign_blocks, 1);
        assert_eq!(extraction.report.decode_failures, 0);
        assert_eq!(extraction.records.len(), 1);
    }

    #[test]
    fn unclosed_block_is_pending_and_ignored() {
        let text = "Loading\n```json\n{\"id\":\"x\",\"type\":\"card\"";
        let extraction = extractor().extract(text);
        assert!(extraction.records.is_empty());
        assert!(extraction.report.pending_directive);
        assert_eq!(extraction.prose(text), "Loading");
    }

    #[test]
    fn nested_children_are_flattened_with_parent_ids() {
        let text = "```json\n{\"id\":\"root\",\"type\":\"card\",\"children\":[{\"type\":\"badge\"},{\"id\":\"l\",\"type\":\"list\",\"parentId\":\"elsewhere\"}]}\n```";
        let extraction = extractor().extract(text);
        let pairs: Vec<(&str, Option<&str>)> = extraction
            .records
            .iter()
            .map(|r| (r.id.as_str(), r.parent_id.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("root", None),
                ("root.0", Some("root")),
                ("l", Some("root"))
            ]
        );
    }

    #[test]
    fn prose_drops_directives_but_keeps_plain_json() {
        let text = "Intro\n```json\n{\"type\":\"card\",\"id\":\"a\"}\n```\nMiddle\n```json\n{\"plain\":true}\n```\nEnd";
        let prose = extractor().extract(text).prose(text);
        assert_eq!(prose, "Intro\n\nMiddle\n```json\n{\"plain\":true}\n```\nEnd");
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let text = "```json\n{\"id\":7,\"type\":\"card\",\"parent_id\":3}\n```";
        let extraction = extractor().extract(text);
        assert_eq!(extraction.records[0].id, "7");
        assert_eq!(extraction.records[0].parent_id.as_deref(), Some("3"));
    }

    #[test]
    fn classify_prefers_type_over_components() {
        let payload = DirectivePayload::classify(json!({"type": "card", "components": []}));
        assert!(matches!(payload, DirectivePayload::Single(_)));
        assert_eq!(
            DirectivePayload::classify(json!("hello")),
            DirectivePayload::Other
        );
    }
}
