//! Chart renderer: line, bar and proportion (pie) charts over a row series.
//!
//! Input is an array of rows (objects), an x key naming the category field
//! and one or more y keys naming numeric fields. When the producer omits
//! keys they are inferred from the first row: the first string field is the
//! category, every number field is a series. An empty row array renders
//! an explicit empty state, never an empty chart surface.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{array_prop, number, scalar_text, text_prop};
use crate::config::ChartConfig;
use crate::error::RenderError;
use crate::registry::{ComponentRenderer, Props, RenderInput};
use crate::view::View;

/// Chart kind, chosen by the `chartType` / `kind` / `variant` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Line,
    #[default]
    Bar,
    Pie,
}

impl ChartKind {
    /// Parse a discriminator; unrecognised names fall back to bar.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" | "area" | "sparkline" => Self::Line,
            "pie" | "donut" | "doughnut" | "proportion" => Self::Pie,
            _ => Self::Bar,
        }
    }
}

/// One y key across every row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub color: String,
    /// One entry per category; `None` where the row has no number.
    pub values: Vec<Option<f64>>,
}

/// One proportion of a pie.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    /// Share of the total in `0.0..=1.0`.
    pub fraction: f64,
    pub color: String,
}

/// Resolved chart, ready for a display layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub x_key: Option<String>,
    pub categories: Vec<String>,
    /// Line and bar series; empty for pies.
    pub series: Vec<Series>,
    /// Pie slices; empty for line and bar.
    pub slices: Vec<Slice>,
    /// Value axis range, always including zero and never degenerate.
    pub y_range: (f64, f64),
}

// ---------------------------------------------------------------------------
// Key inference
// ---------------------------------------------------------------------------

fn rows_of(data: &[Value]) -> Vec<Map<String, Value>> {
    data.iter()
        .enumerate()
        .filter_map(|(index, row)| match row {
            Value::Object(object) => Some(object.clone()),
            // A bare number list becomes `{name: <position>, value: n}` rows.
            other => number(other).map(|value| {
                let mut object = Map::new();
                object.insert("name".into(), Value::from((index + 1).to_string()));
                object.insert("value".into(), Value::from(value));
                object
            }),
        })
        .collect()
}

fn x_key(props: &Props, first: &Map<String, Value>) -> Option<String> {
    text_prop(
        props,
        &["xKey", "xAxisKey", "xAxis", "nameKey", "labelKey", "categoryKey"],
    )
    .or_else(|| {
        first
            .iter()
            .find(|(_, value)| value.is_string())
            .map(|(key, _)| key.clone())
    })
}

fn y_keys(props: &Props, first: &Map<String, Value>, x_key: Option<&str>) -> Vec<String> {
    for key in ["yKeys", "yKey", "dataKey", "dataKeys", "valueKey", "yAxisKey"] {
        match props.get(key) {
            Some(Value::Array(keys)) => {
                let keys: Vec<String> = keys.iter().filter_map(scalar_text).collect();
                if !keys.is_empty() {
                    return keys;
                }
            }
            Some(value) => {
                if let Some(key) = scalar_text(value) {
                    return vec![key];
                }
            }
            None => {}
        }
    }
    first
        .iter()
        .filter(|(key, value)| Some(key.as_str()) != x_key && value.is_number())
        .map(|(key, _)| key.clone())
        .collect()
}

fn y_range<'v>(values: impl Iterator<Item = &'v f64>) -> (f64, f64) {
    let (mut low, mut high) = (0.0_f64, 0.0_f64);
    for value in values {
        low = low.min(*value);
        high = high.max(*value);
    }
    if high - low < f64::EPSILON {
        high = low + 1.0;
    }
    (low, high)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

const SERIES_KEYS: &[&str] = &["data", "series", "values"];

/// Build the chart view from merged props.
pub fn build_chart(props: &Props, config: &ChartConfig) -> Result<View, RenderError> {
    let data = array_prop(props, SERIES_KEYS).ok_or(RenderError::missing("data"))?;
    let rows = rows_of(data);
    let Some(first) = rows.first() else {
        return Ok(View::EmptyState {
            message: text_prop(props, &["emptyMessage"])
                .unwrap_or_else(|| config.empty_message.clone()),
        });
    };

    let kind = text_prop(props, &["chartType", "kind", "variant"])
        .map(|name| ChartKind::parse(&name))
        .unwrap_or_default();
    let x_key = x_key(props, first);
    let y_keys = y_keys(props, first, x_key.as_deref());
    if y_keys.is_empty() {
        return Err(RenderError::invalid("yKeys", "no numeric field to plot"));
    }

    let categories: Vec<String> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            x_key
                .as_deref()
                .and_then(|key| row.get(key))
                .and_then(scalar_text)
                .unwrap_or_else(|| (index + 1).to_string())
        })
        .collect();

    let mut chart = ChartView {
        kind,
        title: text_prop(props, &["title"]),
        x_key,
        categories,
        series: Vec::new(),
        slices: Vec::new(),
        y_range: (0.0, 1.0),
    };

    if kind == ChartKind::Pie {
        let key = &y_keys[0];
        let values: Vec<f64> = rows
            .iter()
            .map(|row| row.get(key).and_then(number).unwrap_or(0.0).max(0.0))
            .collect();
        let total: f64 = values.iter().sum();
        chart.slices = chart
            .categories
            .iter()
            .zip(&values)
            .enumerate()
            .map(|(index, (label, value))| Slice {
                label: label.clone(),
                value: *value,
                fraction: if total > 0.0 { value / total } else { 0.0 },
                color: config.color(index).to_string(),
            })
            .collect();
        chart.y_range = y_range(values.iter());
    } else {
        chart.series = y_keys
            .iter()
            .enumerate()
            .map(|(index, key)| Series {
                key: key.clone(),
                color: config.color(index).to_string(),
                values: rows.iter().map(|row| row.get(key).and_then(number)).collect(),
            })
            .collect();
        chart.y_range = y_range(chart.series.iter().flat_map(|s| s.values.iter().flatten()));
    }

    Ok(View::Chart(chart))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartRenderer;

impl ComponentRenderer for ChartRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<View, RenderError> {
        build_chart(input.props, &input.config.chart)
    }

    fn payload_key(&self) -> &'static str {
        "data"
    }

    fn input_keys(&self) -> &'static [&'static str] {
        SERIES_KEYS
    }
}
