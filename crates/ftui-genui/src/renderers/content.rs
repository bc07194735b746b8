//! Straight projections: cards, tables, lists, code, quotes, media and the
//! small inline components.

use serde_json::Value;

use super::{
    array_prop, bool_prop, content_view, item_text, number, number_prop, require_text,
    scalar_text, text_prop,
};
use crate::error::RenderError;
use crate::registry::{ComponentRenderer, Props, RenderInput};
use crate::view::{Tone, View};

fn tone(props: &Props) -> Tone {
    Tone::from_variant(text_prop(props, &["variant", "tone", "status"]).as_deref())
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// Titled panel with optional body text and child slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardRenderer;

impl ComponentRenderer for CardRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let mut body = Vec::new();
        if let Some(subtitle) = text_prop(props, &["subtitle", "description"]) {
            body.push(View::muted(subtitle));
        }
        body.push(content_view(
            ["text", "content", "body"]
                .iter()
                .find_map(|key| props.get(*key)),
        ));
        body.extend(View::slots(input.children.len()));
        if let Some(footer) = text_prop(props, &["footer"]) {
            body.push(View::muted(footer));
        }

        Ok(View::Panel {
            title: text_prop(props, &["title", "heading"]),
            tone: tone(props),
            body: Box::new(View::stack(body)),
        })
    }

    fn payload_key(&self) -> &'static str {
        "text"
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Grid of rows under an optional header.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRenderer;

const ROW_KEYS: &[&str] = &["rows", "data"];

struct Column {
    key: String,
    label: String,
}

impl TableRenderer {
    fn columns(props: &Props, rows: &[Value]) -> Vec<Column> {
        if let Some(columns) = array_prop(props, &["columns", "headers"]) {
            return columns
                .iter()
                .filter_map(|column| match column {
                    Value::Object(object) => {
                        let key = text_prop(object, &["key", "dataKey", "field", "accessor"]);
                        let label = text_prop(object, &["label", "title", "header", "name"]);
                        let key = key.or_else(|| label.clone())?;
                        Some(Column {
                            label: label.unwrap_or_else(|| key.clone()),
                            key,
                        })
                    }
                    other => scalar_text(other).map(|name| Column {
                        key: name.clone(),
                        label: name,
                    }),
                })
                .collect();
        }
        // Derive from the first object row.
        rows.iter()
            .find_map(Value::as_object)
            .map(|object| {
                object
                    .keys()
                    .map(|key| Column {
                        key: key.clone(),
                        label: key.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cell(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(value @ (Value::Object(_) | Value::Array(_))) => {
                item_text(value).unwrap_or_else(|| value.to_string())
            }
            Some(value) => scalar_text(value).unwrap_or_default(),
        }
    }
}

impl ComponentRenderer for TableRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let rows = array_prop(props, ROW_KEYS).ok_or(RenderError::missing("rows"))?;
        if rows.is_empty() {
            return Ok(View::EmptyState {
                message: text_prop(props, &["emptyMessage"])
                    .unwrap_or_else(|| "No rows".to_string()),
            });
        }

        let columns = Self::columns(props, rows);
        let rows = rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => {
                    let width = columns.len().max(cells.len());
                    (0..width).map(|i| Self::cell(cells.get(i))).collect()
                }
                Value::Object(object) => columns
                    .iter()
                    .map(|column| Self::cell(object.get(&column.key)))
                    .collect(),
                scalar => vec![Self::cell(Some(scalar))],
            })
            .collect();

        let table = View::Table {
            header: columns.into_iter().map(|column| column.label).collect(),
            rows,
        };
        Ok(match text_prop(props, &["title", "caption"]) {
            Some(title) => View::Panel {
                title: Some(title),
                tone: Tone::Neutral,
                body: Box::new(table),
            },
            None => table,
        })
    }

    fn payload_key(&self) -> &'static str {
        "rows"
    }

    fn input_keys(&self) -> &'static [&'static str] {
        ROW_KEYS
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// Bulleted or numbered items, nested one level per `items` array.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRenderer;

impl ListRenderer {
    fn item(value: &Value) -> Option<View> {
        let text = item_text(value);
        let nested = value
            .as_object()
            .and_then(|object| array_prop(object, &["items", "children"]));
        match (text, nested) {
            (Some(text), Some(nested)) => Some(View::stack(vec![
                View::text(text),
                View::List {
                    ordered: false,
                    items: nested.iter().filter_map(Self::item).collect(),
                },
            ])),
            (Some(text), None) => Some(View::text(text)),
            (None, Some(nested)) => Some(View::List {
                ordered: false,
                items: nested.iter().filter_map(Self::item).collect(),
            }),
            (None, None) => None,
        }
    }
}

impl ComponentRenderer for ListRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let items =
            array_prop(props, &["items", "entries"]).ok_or(RenderError::missing("items"))?;
        let ordered = bool_prop(props, "ordered").unwrap_or_else(|| {
            matches!(
                text_prop(props, &["style", "listStyle"]).as_deref(),
                Some("ordered" | "numbered" | "decimal")
            )
        });

        let mut views: Vec<View> = items.iter().filter_map(Self::item).collect();
        views.extend(View::slots(input.children.len()));
        if views.is_empty() {
            return Ok(View::EmptyState {
                message: "No items".to_string(),
            });
        }

        let list = View::List {
            ordered,
            items: views,
        };
        Ok(match text_prop(props, &["title"]) {
            Some(title) => View::stack(vec![
                View::Heading {
                    text: title,
                    level: 3,
                },
                list,
            ]),
            None => list,
        })
    }

    fn payload_key(&self) -> &'static str {
        "items"
    }
}

// ---------------------------------------------------------------------------
// Code, quote, image
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeRenderer;

impl ComponentRenderer for CodeRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        Ok(View::Code {
            language: text_prop(props, &["language", "lang"]),
            source: require_text(props, &["code", "source", "content"], "code")?,
        })
    }

    fn payload_key(&self) -> &'static str {
        "code"
    }

    fn title(&self, props: &Props) -> Option<String> {
        text_prop(props, &["title", "filename", "language"])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteRenderer;

impl ComponentRenderer for QuoteRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        Ok(View::Quote {
            text: require_text(props, &["text", "content", "quote"], "text")?,
            attribution: text_prop(props, &["author", "cite", "attribution", "source"]),
        })
    }

    fn payload_key(&self) -> &'static str {
        "text"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRenderer;

impl ComponentRenderer for ImageRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        Ok(View::Image {
            source: require_text(props, &["src", "url"], "src")?,
            alt: text_prop(props, &["alt", "title"]),
            caption: text_prop(props, &["caption"]),
        })
    }

    fn payload_key(&self) -> &'static str {
        "src"
    }
}

// ---------------------------------------------------------------------------
// Inline components
// ---------------------------------------------------------------------------

/// Fill gauge; `value` out of `max` (default 100).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressRenderer;

impl ComponentRenderer for ProgressRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let raw = ["value", "progress", "percent"]
            .iter()
            .find_map(|key| props.get(*key))
            .ok_or(RenderError::missing("value"))?;
        let value = number(raw).ok_or_else(|| {
            RenderError::invalid("value", format!("expected a finite number, got {raw}"))
        })?;
        let max = number_prop(props, &["max", "total"]).unwrap_or(100.0);
        if max <= 0.0 {
            return Err(RenderError::invalid("max", format!("must be positive, got {max}")));
        }

        Ok(View::Gauge {
            label: text_prop(props, &["label", "title"]),
            ratio: (value / max).clamp(0.0, 1.0),
        })
    }

    fn payload_key(&self) -> &'static str {
        "value"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BadgeRenderer;

impl ComponentRenderer for BadgeRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        Ok(View::Badge {
            text: require_text(props, &["text", "label"], "text")?,
            tone: tone(props),
        })
    }

    fn payload_key(&self) -> &'static str {
        "text"
    }

    fn title(&self, props: &Props) -> Option<String> {
        text_prop(props, &["text", "label"])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonRenderer;

impl ComponentRenderer for ButtonRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        Ok(View::Button {
            label: require_text(props, &["label", "text"], "label")?,
            action: text_prop(props, &["action", "href", "onClick"]),
            tone: tone(props),
        })
    }

    fn payload_key(&self) -> &'static str {
        "label"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkRenderer;

impl ComponentRenderer for LinkRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        let props = input.props;
        let href = require_text(props, &["href", "url"], "href")?;
        Ok(View::Link {
            text: text_prop(props, &["text", "label", "title"]).unwrap_or_else(|| href.clone()),
            href,
        })
    }

    fn payload_key(&self) -> &'static str {
        "href"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenUiConfig;
    use crate::record::ComponentRecord;
    use crate::registry::merge_props;
    use serde_json::json;

    fn render(
        renderer: &dyn ComponentRenderer,
        record: &ComponentRecord,
    ) -> Result<View, RenderError> {
        let props = merge_props(record, renderer);
        let config = GenUiConfig::default();
        renderer.render(&RenderInput {
            record,
            props: &props,
            children: &[],
            config: &config,
        })
    }

    #[test]
    fn card_reads_body_from_payload() {
        let record = ComponentRecord::new("c1", "card")
            .property("title", "Result")
            .payload(json!({"text": "done"}));
        assert_eq!(
            render(&CardRenderer, &record),
            Ok(View::Panel {
                title: Some("Result".into()),
                tone: Tone::Neutral,
                body: Box::new(View::text("done")),
            })
        );
    }

    #[test]
    fn table_derives_columns_from_object_rows() {
        let record = ComponentRecord::new("t", "table")
            .payload(json!([{"name": "a", "qty": 1}, {"name": "b"}]));
        assert_eq!(
            render(&TableRenderer, &record),
            Ok(View::Table {
                header: vec!["name".into(), "qty".into()],
                rows: vec![
                    vec!["a".into(), "1".into()],
                    vec!["b".into(), String::new()],
                ],
            })
        );
    }

    #[test]
    fn derived_columns_keep_producer_order() {
        let record = ComponentRecord::new("t", "table")
            .payload(json!([{"zone": "eu", "name": "api", "load": 0.5}]));
        let Ok(View::Table { header, .. }) = render(&TableRenderer, &record) else {
            panic!("expected a table");
        };
        assert_eq!(header, vec!["zone", "name", "load"]);
    }

    #[test]
    fn table_uses_labelled_columns() {
        let record = ComponentRecord::new("t", "table")
            .property("columns", json!([{"key": "n", "label": "Name"}]))
            .property("rows", json!([{"n": "x"}]));
        let Ok(View::Table { header, rows }) = render(&TableRenderer, &record) else {
            panic!("expected a table");
        };
        assert_eq!(header, vec!["Name"]);
        assert_eq!(rows, vec![vec!["x".to_string()]]);
    }

    #[test]
    fn empty_table_is_an_empty_state() {
        let record = ComponentRecord::new("t", "table").property("rows", json!([]));
        assert!(matches!(
            render(&TableRenderer, &record),
            Ok(View::EmptyState { .. })
        ));
    }

    #[test]
    fn list_without_items_is_missing_field() {
        let record = ComponentRecord::new("l", "list");
        assert_eq!(
            render(&ListRenderer, &record),
            Err(RenderError::missing("items"))
        );
    }

    #[test]
    fn ordered_list_from_style() {
        let record = ComponentRecord::new("l", "list")
            .property("style", "numbered")
            .payload(json!(["one", {"label": "two"}]));
        assert_eq!(
            render(&ListRenderer, &record),
            Ok(View::List {
                ordered: true,
                items: vec![View::text("one"), View::text("two")],
            })
        );
    }

    #[test]
    fn progress_clamps_and_rejects_non_numbers() {
        let record = ComponentRecord::new("p", "progress")
            .property("value", 150)
            .property("max", 100);
        assert_eq!(
            render(&ProgressRenderer, &record),
            Ok(View::Gauge {
                label: None,
                ratio: 1.0
            })
        );
        let bad = ComponentRecord::new("p", "progress").property("value", "lots");
        assert!(matches!(
            render(&ProgressRenderer, &bad),
            Err(RenderError::InvalidField { field: "value", .. })
        ));
    }

    #[test]
    fn badge_tone_follows_variant() {
        let record = ComponentRecord::new("x", "badge")
            .property("text", "Done")
            .property("variant", "success");
        assert_eq!(
            render(&BadgeRenderer, &record),
            Ok(View::Badge {
                text: "Done".into(),
                tone: Tone::Success
            })
        );
    }

    #[test]
    fn link_text_defaults_to_href() {
        let record = ComponentRecord::new("l", "link").payload("https://example.com");
        assert_eq!(
            render(&LinkRenderer, &record),
            Ok(View::Link {
                text: "https://example.com".into(),
                href: "https://example.com".into()
            })
        );
    }

    #[test]
    fn code_requires_source() {
        let record = ComponentRecord::new("c", "code").property("language", "rust");
        assert_eq!(
            render(&CodeRenderer, &record),
            Err(RenderError::missing("code"))
        );
    }
}
