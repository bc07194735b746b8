//! Built-in renderers, one per [`ComponentKind`](crate::record::ComponentKind).
//!
//! Renderers are pure projections of merged props (and rendered children)
//! into [`View`]s. They are deliberately tolerant about *where* producers put
//! things (several key spellings are accepted) and strict only about the
//! fields they cannot do without, which fail with
//! [`RenderError::MissingField`].

pub mod chart;
pub mod content;
pub mod mindmap;
pub mod sections;

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::record::ComponentKind;
use crate::registry::Registry;
use crate::view::View;

/// Install a renderer for every known kind.
pub fn register_builtins(registry: &mut Registry) {
    for kind in ComponentKind::ALL {
        let tag = kind.as_tag();
        match kind {
            ComponentKind::Card => registry.register(tag, content::CardRenderer),
            ComponentKind::Table => registry.register(tag, content::TableRenderer),
            ComponentKind::List => registry.register(tag, content::ListRenderer),
            ComponentKind::Code => registry.register(tag, content::CodeRenderer),
            ComponentKind::Quote => registry.register(tag, content::QuoteRenderer),
            ComponentKind::Image => registry.register(tag, content::ImageRenderer),
            ComponentKind::Progress => registry.register(tag, content::ProgressRenderer),
            ComponentKind::Badge => registry.register(tag, content::BadgeRenderer),
            ComponentKind::Button => registry.register(tag, content::ButtonRenderer),
            ComponentKind::Link => registry.register(tag, content::LinkRenderer),
            ComponentKind::Accordion => registry.register(tag, sections::AccordionRenderer),
            ComponentKind::Tabs => registry.register(tag, sections::TabsRenderer),
            ComponentKind::Timeline => registry.register(tag, sections::TimelineRenderer),
            ComponentKind::SlideDeck => registry.register(tag, sections::SlideDeckRenderer),
            ComponentKind::Chart => registry.register(tag, chart::ChartRenderer),
            ComponentKind::Diagram => registry.register(tag, mindmap::DiagramRenderer),
        };
    }
}

// ---------------------------------------------------------------------------
// Prop helpers
// ---------------------------------------------------------------------------

/// First of `keys` holding a non-blank string, a number or a bool, as text.
#[must_use]
pub fn text_prop(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| props.get(*key).and_then(scalar_text))
}

/// Like [`text_prop`] but required.
pub fn require_text(
    props: &Map<String, Value>,
    keys: &[&str],
    field: &'static str,
) -> Result<String, RenderError> {
    text_prop(props, keys).ok_or(RenderError::missing(field))
}

/// First of `keys` holding an array.
#[must_use]
pub fn array_prop<'p>(props: &'p Map<String, Value>, keys: &[&str]) -> Option<&'p Vec<Value>> {
    keys.iter()
        .find_map(|key| props.get(*key).and_then(Value::as_array))
}

/// First of `keys` holding a number (or a numeric string).
#[must_use]
pub fn number_prop(props: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| props.get(*key).and_then(number))
}

#[must_use]
pub fn bool_prop(props: &Map<String, Value>, key: &str) -> Option<bool> {
    match props.get(key)? {
        Value::Bool(flag) => Some(*flag),
        Value::String(s) => match s.trim() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A finite number from a JSON number or numeric string.
#[must_use]
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Scalar as display text; blank strings and non-scalars yield `None`.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Display text of a loose item: a scalar, or an object's text-ish field.
#[must_use]
pub fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => text_prop(object, &["text", "title", "label", "name", "content"]),
        other => scalar_text(other),
    }
}

/// A free-form content value as a view: text, a list of lines, or nothing.
#[must_use]
pub fn content_view(value: Option<&Value>) -> View {
    match value {
        Some(Value::Array(items)) => {
            let items: Vec<View> = items.iter().filter_map(item_text).map(View::text).collect();
            if items.is_empty() {
                View::Empty
            } else {
                View::List {
                    ordered: false,
                    items,
                }
            }
        }
        Some(value) => item_text(value).map_or(View::Empty, View::text),
        None => View::Empty,
    }
}
