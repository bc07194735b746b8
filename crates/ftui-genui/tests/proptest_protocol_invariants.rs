//! Property-based invariant tests for extraction, tree assembly and dispatch.
//!
//! 1. A well-formed single-record block yields exactly that record
//! 2. An array of N typed elements yields N records in order
//! 3. An undecodable block changes nothing about the other blocks
//! 4. Extraction is a pure function of the text (per extractor)
//! 5. Every materialised node's parent is the record its `parentId` names,
//!    chains end at a root, and no record appears twice
//! 6. A record whose parent id matches nothing is never rendered
//! 7. With one renderer forced to fail, K records render as K nodes with
//!    exactly one failure placeholder

use std::collections::HashSet;

use ftui_genui::{
    ComponentForest, ComponentRecord, DirectiveExtractor, ExtractConfig, GenUiConfig, NodeStatus,
    Registry, TreeNode, View,
};
use proptest::prelude::*;
use serde_json::{Value, json};

// ── Helpers ──────────────────────────────────────────────────────────

fn extractor() -> DirectiveExtractor {
    DirectiveExtractor::with_epoch(ExtractConfig::default(), 1_700_000_000_000)
}

fn fenced(body: &str) -> String {
    format!("```json\n{body}\n```")
}

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,11}"
}

fn arb_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("card".to_string()),
        Just("badge".to_string()),
        Just("chart".to_string()),
        Just("sparkle-widget".to_string()),
        "[a-z]{3,10}",
    ]
}

/// Free text that cannot contain a fence.
fn arb_prose() -> impl Strategy<Value = String> {
    "[A-Za-z ,.!?\n]{0,40}"
}

fn arb_record_json() -> impl Strategy<Value = Value> {
    (
        prop::option::of(arb_id()),
        arb_tag(),
        prop::option::of(arb_id()),
        "[A-Za-z ]{0,16}",
    )
        .prop_map(|(id, tag, parent, title)| {
            let mut object = json!({"type": tag, "properties": {"title": title}});
            if let Some(id) = id {
                object["id"] = json!(id);
            }
            if let Some(parent) = parent {
                object["parentId"] = json!(parent);
            }
            object
        })
}

/// Records `n0..nN` where each parent is an earlier record, a missing id,
/// or absent.
fn arb_batch() -> impl Strategy<Value = Vec<ComponentRecord>> {
    prop::collection::vec((0u8..4, any::<prop::sample::Index>()), 1..24).prop_map(|plan| {
        plan.iter()
            .enumerate()
            .map(|(index, (mode, pick))| {
                let record = ComponentRecord::new(format!("n{index}"), "card");
                match mode {
                    0 => record,
                    1 if index > 0 => record.parent(format!("n{}", pick.index(index))),
                    2 => record.parent("missing"),
                    // May point forwards or at itself.
                    _ => record.parent(format!("n{}", pick.index(plan.len()))),
                }
            })
            .collect()
    })
}

fn walk<'a>(node: &TreeNode<'a>, parent: Option<&str>, seen: &mut Vec<&'a ComponentRecord>) {
    seen.push(node.record);
    assert_eq!(node.record.parent_id.as_deref(), parent);
    for child in &node.children {
        walk(child, Some(&node.record.id), seen);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Extraction
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn single_record_block_round_trips(
        before in arb_prose(),
        after in arb_prose(),
        element in arb_record_json(),
    ) {
        let text = format!("{before}{}{after}", fenced(&element.to_string()));
        let extraction = extractor().extract(&text);
        prop_assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];

        prop_assert_eq!(Some(record.type_tag.as_str()), element["type"].as_str());
        prop_assert_eq!(record.parent_id.as_deref(), element["parentId"].as_str());
        prop_assert_eq!(Some(&record.properties), element["properties"].as_object());
        prop_assert_eq!(&record.payload, &None);
        match element["id"].as_str() {
            Some(id) => prop_assert_eq!(record.id.as_str(), id),
            None => prop_assert_eq!(record.id.as_str(), "genui-1700000000000-0-0"),
        }
    }

    #[test]
    fn array_yields_n_records_in_order(
        elements in prop::collection::vec(arb_record_json(), 0..12),
    ) {
        let text = fenced(&Value::Array(elements.clone()).to_string());
        let records = extractor().extract(&text).records;
        prop_assert_eq!(records.len(), elements.len());
        for (record, element) in records.iter().zip(&elements) {
            prop_assert_eq!(Some(record.type_tag.as_str()), element["type"].as_str());
        }
    }

    #[test]
    fn invalid_block_is_isolated(
        first in arb_record_json(),
        second in arb_record_json(),
        garbage in "[{\\[a-z:,\"]{1,20}",
    ) {
        prop_assume!(serde_json::from_str::<Value>(&garbage).is_err());
        let clean = format!(
            "{}\nthen\n{}",
            fenced(&first.to_string()),
            fenced(&second.to_string())
        );
        let dirty = format!(
            "{}\nthen\n{}\n{}",
            fenced(&first.to_string()),
            fenced(&garbage),
            fenced(&second.to_string())
        );
        let clean = extractor().extract(&clean).records;
        let dirty = extractor().extract(&dirty);
        prop_assert_eq!(dirty.report.decode_failures, 1);
        prop_assert_eq!(dirty.records.len(), clean.len());
        for (a, b) in dirty.records.iter().zip(&clean) {
            prop_assert_eq!(&a.type_tag, &b.type_tag);
            prop_assert_eq!(&a.properties, &b.properties);
            prop_assert_eq!(&a.parent_id, &b.parent_id);
        }
    }

    #[test]
    fn extraction_is_idempotent(
        prose in arb_prose(),
        elements in prop::collection::vec(arb_record_json(), 0..6),
    ) {
        let text = format!("{prose}\n{}\n{prose}", fenced(&Value::Array(elements).to_string()));
        let extractor = extractor();
        prop_assert_eq!(extractor.extract(&text), extractor.extract(&text));
    }

    #[test]
    fn untyped_elements_are_dropped(count in 0usize..8) {
        let mut elements: Vec<Value> = (0..count).map(|i| json!({"id": format!("u{i}")})).collect();
        elements.push(json!({"type": "badge", "properties": {"text": "kept"}}));
        let extraction = extractor().extract(&fenced(&Value::Array(elements).to_string()));
        prop_assert_eq!(extraction.records.len(), 1);
        prop_assert_eq!(extraction.report.untyped_elements, count);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Assembly and dispatch
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn tree_parent_chains_end_at_roots(records in arb_batch()) {
        let forest = ComponentForest::new(&records);
        let mut seen = Vec::new();
        for root in forest.materialize() {
            prop_assert!(root.record.is_root());
            walk(&root, None, &mut seen);
        }
        let unique: HashSet<*const ComponentRecord> =
            seen.iter().map(|r| std::ptr::from_ref(*r)).collect();
        prop_assert_eq!(unique.len(), seen.len(), "a record appeared under two parents");
        prop_assert_eq!(seen.len() + forest.unreachable().len(), records.len());
    }

    #[test]
    fn orphans_never_render(records in arb_batch()) {
        let tree = Registry::default().render_records(&records);
        let rendered: HashSet<&str> = tree.nodes().iter().map(|node| node.key.as_str()).collect();
        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        for record in &records {
            if let Some(parent) = &record.parent_id {
                if !ids.contains(parent.as_str()) {
                    prop_assert!(!rendered.contains(record.id.as_str()));
                }
            }
        }
    }

    #[test]
    fn one_failing_renderer_yields_one_placeholder(
        count in 1usize..16,
        failing in any::<prop::sample::Index>(),
    ) {
        let failing = failing.index(count);
        let records: Vec<ComponentRecord> = (0..count)
            .map(|i| {
                let tag = if i == failing { "exploding" } else { "badge" };
                ComponentRecord::new(format!("r{i}"), tag).property("text", format!("item {i}"))
            })
            .collect();

        let mut registry = Registry::with_builtins(GenUiConfig::default());
        registry.register_fn("exploding", "payload", |input| {
            let rows = input.props.get("rows").and_then(Value::as_array);
            Ok(View::text(format!("{}", rows.map(Vec::len).unwrap_or_else(|| panic!("no rows")))))
        });
        let tree = registry.render_records(&records);
        let baseline = Registry::default().render_records(&records);

        prop_assert_eq!(tree.roots.len(), count);
        let failed: Vec<usize> = tree
            .roots
            .iter()
            .enumerate()
            .filter(|(_, node)| node.status == NodeStatus::Failed)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(failed, vec![failing]);
        for (i, (node, expected)) in tree.roots.iter().zip(&baseline.roots).enumerate() {
            if i != failing {
                prop_assert_eq!(node, expected);
            }
        }
    }
}
