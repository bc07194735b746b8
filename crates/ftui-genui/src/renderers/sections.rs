//! Multi-section components: accordion, tabs, slide deck and timeline.
//!
//! Sections come from an inline array in the props, from child records, or
//! both (inline entries first). A child becomes a section titled after the
//! child's own title, with its rendered view placed in a slot.

use serde_json::Value;

use super::{array_prop, content_view, number, scalar_text, text_prop};
use crate::error::RenderError;
use crate::registry::{ComponentRenderer, Props, RenderInput};
use crate::view::{Section, TimelineEntry, View};

fn inline_sections(entries: &[Value], title_keys: &[&str], body_keys: &[&str]) -> Vec<Section> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(object) => Section {
                title: text_prop(object, title_keys).unwrap_or_else(|| format!("{}", index + 1)),
                body: content_view(body_keys.iter().find_map(|key| object.get(*key))),
            },
            other => Section {
                title: scalar_text(other).unwrap_or_else(|| format!("{}", index + 1)),
                body: View::Empty,
            },
        })
        .collect()
}

fn child_sections(input: &RenderInput<'_>) -> Vec<Section> {
    input
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| Section {
            title: child.title.clone().unwrap_or_else(|| child.type_tag.clone()),
            body: View::Slot { index },
        })
        .collect()
}

/// Resolve a selector that may be an index or a section title.
fn select(value: Option<&Value>, sections: &[Section]) -> Option<usize> {
    let value = value?;
    if let Some(index) = number(value) {
        let in_range = index >= 0.0 && index.fract() == 0.0 && (index as usize) < sections.len();
        return in_range.then_some(index as usize);
    }
    let label = value.as_str()?.trim();
    sections
        .iter()
        .position(|section| section.title.eq_ignore_ascii_case(label))
}

fn first_value<'p>(props: &'p Props, keys: &[&str]) -> Option<&'p Value> {
    keys.iter().find_map(|key| props.get(*key))
}

// ---------------------------------------------------------------------------
// Accordion
// ---------------------------------------------------------------------------

/// Collapsible sections; `defaultOpen` may be an index, a title, a list of
/// either, or `true` for all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccordionRenderer;

impl ComponentRenderer for AccordionRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let inline = array_prop(props, &["items", "sections"]);
        if inline.is_none() && input.children.is_empty() {
            return Err(RenderError::missing("items"));
        }

        let mut sections = inline.map_or_else(Vec::new, |entries| {
            inline_sections(entries, &["title", "label", "heading"], &["content", "text", "body"])
        });
        sections.extend(child_sections(input));

        let open = match first_value(props, &["defaultOpen", "open", "expanded"]) {
            Some(Value::Bool(true)) => (0..sections.len()).collect(),
            Some(Value::Array(selectors)) => selectors
                .iter()
                .filter_map(|selector| select(Some(selector), &sections))
                .collect(),
            other => select(other, &sections).into_iter().collect(),
        };

        Ok(View::Sections { sections, open })
    }

    fn payload_key(&self) -> &'static str {
        "items"
    }
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct TabsRenderer;

impl ComponentRenderer for TabsRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let inline = array_prop(props, &["tabs", "items"]);
        if inline.is_none() && input.children.is_empty() {
            return Err(RenderError::missing("tabs"));
        }

        let mut tabs = inline.map_or_else(Vec::new, |entries| {
            inline_sections(entries, &["label", "title", "name"], &["content", "text", "body"])
        });
        tabs.extend(child_sections(input));

        let active = select(
            first_value(props, &["activeTab", "defaultTab", "active", "defaultValue"]),
            &tabs,
        )
        .unwrap_or(0);
        Ok(View::Tabs { tabs, active })
    }

    fn payload_key(&self) -> &'static str {
        "tabs"
    }
}

// ---------------------------------------------------------------------------
// Slide deck
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SlideDeckRenderer;

impl ComponentRenderer for SlideDeckRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let inline = array_prop(props, &["slides", "items"]);
        if inline.is_none() && input.children.is_empty() {
            return Err(RenderError::missing("slides"));
        }

        let mut slides: Vec<Section> = inline
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| {
                        let object = entry.as_object();
                        let title = object
                            .and_then(|o| text_prop(o, &["title", "heading"]))
                            .or_else(|| scalar_text(entry))
                            .unwrap_or_else(|| format!("Slide {}", index + 1));
                        let body = object.map_or(View::Empty, |o| {
                            View::stack(vec![
                                content_view(o.get("content").or_else(|| o.get("text"))),
                                content_view(o.get("bullets").or_else(|| o.get("points"))),
                            ])
                        });
                        Section { title, body }
                    })
                    .collect()
            })
            .unwrap_or_default();
        slides.extend(child_sections(input));

        let current = select(
            first_value(props, &["currentSlide", "startIndex", "current"]),
            &slides,
        )
        .unwrap_or(0);
        Ok(View::Deck { slides, current })
    }

    fn payload_key(&self) -> &'static str {
        "slides"
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineRenderer;

impl ComponentRenderer for TimelineRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let events =
            array_prop(props, &["events", "items"]).ok_or(RenderError::missing("events"))?;

        let entries: Vec<TimelineEntry> = events
            .iter()
            .filter_map(|event| match event {
                Value::Object(object) => {
                    let mut detail =
                        text_prop(object, &["description", "detail", "content", "text"]);
                    let title = match text_prop(object, &["title", "label", "event", "name"]) {
                        Some(title) => title,
                        None => detail.take()?,
                    };
                    Some(TimelineEntry {
                        when: text_prop(object, &["date", "time", "when", "year"]),
                        title,
                        detail,
                    })
                }
                other => scalar_text(other).map(|title| TimelineEntry {
                    when: None,
                    title,
                    detail: None,
                }),
            })
            .collect();

        if entries.is_empty() {
            return Ok(View::EmptyState {
                message: "No events".to_string(),
            });
        }
        let timeline = View::Timeline { entries };
        Ok(View::stack(
            std::iter::once(timeline)
                .chain(View::slots(input.children.len()))
                .collect(),
        ))
    }

    fn payload_key(&self) -> &'static str {
        "events"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenUiConfig;
    use crate::record::ComponentRecord;
    use crate::registry::{NodeStatus, RenderedNode, merge_props};
    use serde_json::json;

    fn render_with_children(
        renderer: &dyn ComponentRenderer,
        record: &ComponentRecord,
        children: &[RenderedNode],
    ) -> Result<View, RenderError> {
        let props = merge_props(record, renderer);
        let config = GenUiConfig::default();
        renderer.render(&RenderInput {
            record,
            props: &props,
            children,
            config: &config,
        })
    }

    fn child(key: &str, title: &str) -> RenderedNode {
        RenderedNode {
            key: key.into(),
            type_tag: "card".into(),
            status: NodeStatus::Rendered,
            title: Some(title.into()),
            view: View::text(title),
            children: Vec::new(),
        }
    }

    #[test]
    fn accordion_opens_by_title() {
        let record = ComponentRecord::new("a", "accordion")
            .property("defaultOpen", "Second")
            .payload(json!([
                {"title": "First", "content": "one"},
                {"title": "Second", "content": "two"}
            ]));
        let Ok(View::Sections { sections, open }) =
            render_with_children(&AccordionRenderer, &record, &[])
        else {
            panic!("expected sections");
        };
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].body, View::text("two"));
        assert_eq!(open, vec![1]);
    }

    #[test]
    fn accordion_without_items_or_children_fails() {
        let record = ComponentRecord::new("a", "accordion");
        assert_eq!(
            render_with_children(&AccordionRenderer, &record, &[]),
            Err(RenderError::missing("items"))
        );
    }

    #[test]
    fn tabs_append_children_after_inline_tabs() {
        let record = ComponentRecord::new("t", "tabs")
            .property("tabs", json!([{"label": "Inline", "content": "x"}]))
            .property("activeTab", 1);
        let children = [child("c", "From child")];
        let Ok(View::Tabs { tabs, active }) =
            render_with_children(&TabsRenderer, &record, &children)
        else {
            panic!("expected tabs");
        };
        assert_eq!(tabs[1].title, "From child");
        assert_eq!(tabs[1].body, View::Slot { index: 0 });
        assert_eq!(active, 1);
    }

    #[test]
    fn out_of_range_tab_falls_back_to_first() {
        let record = ComponentRecord::new("t", "tabs")
            .property("tabs", json!(["a", "b"]))
            .property("activeTab", 9);
        let Ok(View::Tabs { active, .. }) = render_with_children(&TabsRenderer, &record, &[])
        else {
            panic!("expected tabs");
        };
        assert_eq!(active, 0);
    }

    #[test]
    fn slide_bullets_become_lists() {
        let record = ComponentRecord::new("d", "slide-deck").payload(json!([
            {"title": "Intro", "bullets": ["a", "b"]}
        ]));
        let Ok(View::Deck { slides, current }) =
            render_with_children(&SlideDeckRenderer, &record, &[])
        else {
            panic!("expected deck");
        };
        assert_eq!(current, 0);
        assert_eq!(
            slides[0].body,
            View::List {
                ordered: false,
                items: vec![View::text("a"), View::text("b")]
            }
        );
    }

    #[test]
    fn timeline_entries_keep_dates() {
        let record = ComponentRecord::new("t", "timeline").payload(json!([
            {"date": "2024", "title": "Launch", "description": "v1"},
            "Later"
        ]));
        assert_eq!(
            render_with_children(&TimelineRenderer, &record, &[]),
            Ok(View::Timeline {
                entries: vec![
                    TimelineEntry {
                        when: Some("2024".into()),
                        title: "Launch".into(),
                        detail: Some("v1".into()),
                    },
                    TimelineEntry {
                        when: None,
                        title: "Later".into(),
                        detail: None,
                    },
                ]
            })
        );
    }

    #[test]
    fn timeline_requires_events() {
        let record = ComponentRecord::new("t", "timeline");
        assert_eq!(
            render_with_children(&TimelineRenderer, &record, &[]),
            Err(RenderError::missing("events"))
        );
    }
}
