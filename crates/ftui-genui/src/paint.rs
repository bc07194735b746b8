//! Plain-text painter for rendered trees.
//!
//! Turns a [`RenderedTree`] into terminal lines no wider than a given
//! column budget: box-drawn panels, aligned tables, bar/sparkline/proportion
//! charts, a character canvas for mindmaps. Display width is measured with
//! `unicode-width`, so CJK and emoji labels line up.
//!
//! This is the reference display used by the replay tool. Other display
//! layers can ignore it and mount [`View`]s directly.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::registry::{RenderedNode, RenderedTree};
use crate::renderers::chart::{ChartKind, ChartView};
use crate::renderers::mindmap::MindmapLayout;
use crate::view::{PlaceholderKind, Section, Tone, View};

const MIN_WIDTH: usize = 8;
const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Paint every root, separated by a blank line.
#[must_use]
pub fn paint_tree(tree: &RenderedTree, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, root) in tree.roots.iter().enumerate() {
        if index > 0 {
            lines.push(String::new());
        }
        lines.extend(paint_node(root, width));
    }
    lines
}

/// Paint one node: its view, with slots filled by children, followed by any
/// children the view does not place.
#[must_use]
pub fn paint_node(node: &RenderedNode, width: usize) -> Vec<String> {
    let width = width.max(MIN_WIDTH);
    let mut lines = Painter { node }.view(&node.view, width);
    for index in node.unplaced_children() {
        lines.extend(paint_node(&node.children[index], width));
    }
    lines
}

struct Painter<'a> {
    node: &'a RenderedNode,
}

impl Painter<'_> {
    fn view(&self, view: &View, width: usize) -> Vec<String> {
        match view {
            View::Empty => Vec::new(),
            View::Text { text, tone } => wrap(&format!("{}{text}", tone_prefix(*tone)), width),
            View::Heading { text, level } => {
                let mut lines = wrap(text, width);
                let rule = if *level <= 1 { '═' } else { '─' };
                let underline = lines.iter().map(|l| l.width()).max().unwrap_or(0);
                lines.push(rule.to_string().repeat(underline));
                lines
            }
            View::Stack { items } => items.iter().flat_map(|v| self.view(v, width)).collect(),
            View::Panel { title, tone, body } => {
                let inner = self.view(body, width.saturating_sub(4).max(1));
                boxed(title.as_deref(), *tone, &inner, width)
            }
            View::Table { header, rows } => table(header, rows, width),
            View::List { ordered, items } => {
                let mut lines = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}. ", index + 1)
                    } else {
                        "• ".to_string()
                    };
                    let inner = width.saturating_sub(marker.width()).max(1);
                    lines.extend(hang(&marker, self.view(item, inner)));
                }
                lines
            }
            View::Code { language, source } => {
                let fence = format!("```{}", language.as_deref().unwrap_or(""));
                let mut lines = vec![fit(&fence, width)];
                lines.extend(source.lines().map(|line| fit(&format!("  {line}"), width)));
                lines.push("```".to_string());
                lines
            }
            View::Quote { text, attribution } => {
                let mut lines: Vec<String> = wrap(text, width.saturating_sub(2).max(1))
                    .into_iter()
                    .map(|line| format!("│ {line}"))
                    .collect();
                if let Some(by) = attribution {
                    lines.push(fit(&format!("  ~ {by}"), width));
                }
                lines
            }
            View::Image { source, alt, caption } => {
                let mut lines = vec![fit(
                    &format!("[image: {}] <{source}>", alt.as_deref().unwrap_or("untitled")),
                    width,
                )];
                if let Some(caption) = caption {
                    lines.extend(wrap(caption, width));
                }
                lines
            }
            View::Gauge { label, ratio } => vec![gauge(label.as_deref(), *ratio, width)],
            View::Badge { text, tone } => {
                vec![fit(&format!("{}({text})", tone_prefix(*tone)), width)]
            }
            View::Button { label, action, tone } => {
                let mut line = format!("{}[ {label} ]", tone_prefix(*tone));
                if let Some(action) = action {
                    line.push_str(&format!(" -> {action}"));
                }
                vec![fit(&line, width)]
            }
            View::Link { text, href } => {
                if text == href {
                    vec![fit(&format!("<{href}>"), width)]
                } else {
                    vec![fit(&format!("{text} <{href}>"), width)]
                }
            }
            View::Sections { sections, open } => {
                let mut lines = Vec::new();
                for (index, section) in sections.iter().enumerate() {
                    let expanded = open.contains(&index);
                    let marker = if expanded { "▾ " } else { "▸ " };
                    lines.push(fit(&format!("{marker}{}", section.title), width));
                    if expanded {
                        let body = self.view(&section.body, width.saturating_sub(2).max(1));
                        lines.extend(indent(body, 2));
                    }
                }
                lines
            }
            View::Tabs { tabs, active } => {
                let bar: Vec<String> = tabs
                    .iter()
                    .enumerate()
                    .map(|(index, tab)| {
                        if index == *active {
                            format!("[{}]", tab.title)
                        } else {
                            format!(" {} ", tab.title)
                        }
                    })
                    .collect();
                let mut lines = vec![fit(&bar.join("│"), width)];
                lines.push("─".repeat(width));
                if let Some(tab) = tabs.get(*active) {
                    lines.extend(self.view(&tab.body, width));
                }
                lines
            }
            View::Deck { slides, current } => self.deck(slides, *current, width),
            View::Timeline { entries } => {
                let mut lines = Vec::new();
                for entry in entries {
                    let head = match &entry.when {
                        Some(when) => format!("● {when}  {}", entry.title),
                        None => format!("● {}", entry.title),
                    };
                    lines.push(fit(&head, width));
                    if let Some(detail) = &entry.detail {
                        let wrapped = wrap(detail, width.saturating_sub(2).max(1));
                        lines.extend(wrapped.into_iter().map(|l| format!("│ {l}")));
                    }
                }
                lines
            }
            View::Chart(chart) => chart_lines(chart, width),
            View::Diagram(layout) => mindmap_canvas(layout, width),
            View::Slot { index } => self
                .node
                .children
                .get(*index)
                .map(|child| paint_node(child, width))
                .unwrap_or_default(),
            View::Placeholder(PlaceholderKind::UnknownType { type_tag }) => {
                vec![fit(&format!("[? unknown type: {type_tag}]"), width)]
            }
            View::Placeholder(PlaceholderKind::RenderFailed { type_tag, message }) => {
                vec![fit(&format!("[! {type_tag} failed to render: {message}]"), width)]
            }
            View::EmptyState { message } => vec![fit(&format!("({message})"), width)],
        }
    }

    fn deck(&self, slides: &[Section], current: usize, width: usize) -> Vec<String> {
        let Some(slide) = slides.get(current) else {
            return Vec::new();
        };
        let title = format!("{} ({}/{})", slide.title, current + 1, slides.len());
        let inner = self.view(&slide.body, width.saturating_sub(4).max(1));
        boxed(Some(&title), Tone::Neutral, &inner, width)
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

fn tone_prefix(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral | Tone::Accent | Tone::Muted => "",
        Tone::Success => "✓ ",
        Tone::Warning => "! ",
        Tone::Danger => "✗ ",
    }
}

/// Truncate to `width` display columns, marking the cut with `…`.
fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Pad with spaces to exactly `width` columns (truncating first).
fn pad(text: &str, width: usize) -> String {
    let fitted = fit(text, width);
    let fill = width.saturating_sub(fitted.width());
    format!("{fitted}{}", " ".repeat(fill))
}

/// Greedy word wrap; words longer than a line are hard-split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if line.is_empty() {
                word.width()
            } else {
                line.width() + 1 + word.width()
            };
            if needed <= width {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let mut piece = String::new();
            for c in word.chars() {
                if piece.width() + c.width().unwrap_or(0) > width && !piece.is_empty() {
                    lines.push(std::mem::take(&mut piece));
                }
                piece.push(c);
            }
            line = piece;
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn indent(lines: Vec<String>, by: usize) -> Vec<String> {
    let prefix = " ".repeat(by);
    lines.into_iter().map(|line| format!("{prefix}{line}")).collect()
}

/// Prefix the first line with `marker`, later lines with matching spaces.
fn hang(marker: &str, lines: Vec<String>) -> Vec<String> {
    let spaces = " ".repeat(marker.width());
    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                format!("{marker}{line}")
            } else {
                format!("{spaces}{line}")
            }
        })
        .collect()
}

fn boxed(title: Option<&str>, tone: Tone, inner: &[String], width: usize) -> Vec<String> {
    let (tl, tr, bl, br, h, v) = match tone {
        Tone::Danger | Tone::Warning => ('┏', '┓', '┗', '┛', '━', '┃'),
        _ => ('╭', '╮', '╰', '╯', '─', '│'),
    };
    let content = width.saturating_sub(4).max(1);
    let span = content + 2;

    let top = match title {
        Some(title) => {
            let label = fit(&format!(" {title} "), span.saturating_sub(1));
            let rest = span.saturating_sub(label.width() + 1);
            format!("{tl}{h}{label}{}{tr}", h.to_string().repeat(rest))
        }
        None => format!("{tl}{}{tr}", h.to_string().repeat(span)),
    };
    let mut lines = vec![top];
    for line in inner {
        lines.push(format!("{v} {} {v}", pad(line, content)));
    }
    lines.push(format!("{bl}{}{br}", h.to_string().repeat(span)));
    lines
}

fn gauge(label: Option<&str>, ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let percent = format!(" {:>3.0}%", ratio * 100.0);
    let prefix = label.map(|l| format!("{l} ")).unwrap_or_default();
    let bar_width = width
        .saturating_sub(prefix.width() + percent.width() + 2)
        .max(1);
    let filled = ((ratio * bar_width as f64).round() as usize).min(bar_width);
    fit(
        &format!(
            "{prefix}[{}{}]{percent}",
            "█".repeat(filled),
            "░".repeat(bar_width - filled)
        ),
        width,
    )
}

fn table(header: &[String], rows: &[Vec<String>], width: usize) -> Vec<String> {
    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![1usize; columns];
    for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.width());
        }
    }
    // Shrink the widest columns until the row fits (3 columns per separator).
    let budget = width.saturating_sub(3 * (columns - 1));
    while widths.iter().sum::<usize>() > budget {
        let Some((widest, _)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
            break;
        };
        if widths[widest] <= 1 {
            break;
        }
        widths[widest] -= 1;
    }

    let render_row = |cells: &[String]| -> String {
        let padded: Vec<String> = (0..columns)
            .map(|index| pad(cells.get(index).map_or("", String::as_str), widths[index]))
            .collect();
        fit(padded.join(" │ ").trim_end(), width)
    };

    let mut lines = Vec::new();
    if !header.is_empty() {
        lines.push(render_row(header));
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        lines.push(fit(&rule.join("─┼─"), width));
    }
    lines.extend(rows.iter().map(|row| render_row(row)));
    lines
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

fn chart_lines(chart: &ChartView, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(title) = &chart.title {
        lines.push(fit(title, width));
    }
    match chart.kind {
        ChartKind::Pie => {
            let label_width = chart
                .slices
                .iter()
                .map(|s| s.label.width())
                .max()
                .unwrap_or(0)
                .min(width / 3);
            for slice in &chart.slices {
                let label = pad(&slice.label, label_width);
                lines.push(gauge(Some(&label), slice.fraction, width));
            }
        }
        ChartKind::Bar => {
            let (_, high) = chart.y_range;
            let label_width = chart
                .categories
                .iter()
                .map(|c| c.width())
                .max()
                .unwrap_or(0)
                .max(chart.series.iter().map(|s| s.key.width()).max().unwrap_or(0))
                .min(width / 3);
            let bar_room = width.saturating_sub(label_width * 2 + 12).max(1);
            for (row, category) in chart.categories.iter().enumerate() {
                for (index, series) in chart.series.iter().enumerate() {
                    let value = series.values.get(row).copied().flatten();
                    let cells = value.map_or(0, |v| {
                        if high > 0.0 {
                            ((v.max(0.0) / high) * bar_room as f64).round() as usize
                        } else {
                            0
                        }
                    });
                    let name = if index == 0 { category.as_str() } else { "" };
                    let shown = value.map_or_else(|| "-".to_string(), format_number);
                    lines.push(fit(
                        &format!(
                            "{} {} {} {shown}",
                            pad(name, label_width),
                            pad(&series.key, label_width),
                            "█".repeat(cells.min(bar_room)),
                        ),
                        width,
                    ));
                }
            }
        }
        ChartKind::Line => {
            let (low, high) = chart.y_range;
            let label_width = chart
                .series
                .iter()
                .map(|s| s.key.width())
                .max()
                .unwrap_or(0)
                .min(width / 3);
            for series in &chart.series {
                let spark: String = series
                    .values
                    .iter()
                    .map(|value| match value {
                        Some(v) => {
                            let t = ((v - low) / (high - low)).clamp(0.0, 1.0);
                            SPARK[((t * 7.0).round() as usize).min(7)]
                        }
                        None => ' ',
                    })
                    .collect();
                lines.push(fit(&format!("{} {spark}", pad(&series.key, label_width)), width));
            }
            if let (Some(first), Some(last)) = (chart.categories.first(), chart.categories.last()) {
                lines.push(fit(&format!("{} {first} .. {last}", " ".repeat(label_width)), width));
            }
        }
    }
    lines
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

// ---------------------------------------------------------------------------
// Mindmap canvas
// ---------------------------------------------------------------------------

/// Rasterise a layout: one row per leaf-sized band, one column block per
/// depth, elbow connectors between parent and child.
fn mindmap_canvas(layout: &MindmapLayout, width: usize) -> Vec<String> {
    if layout.nodes.is_empty() {
        return Vec::new();
    }
    let band = layout
        .nodes
        .iter()
        .map(|node| node.span.height())
        .fold(f64::INFINITY, f64::min)
        .max(f64::EPSILON);
    let rows = ((layout.bounds.height / band).round() as usize).max(1);
    let depths = layout.max_depth() + 1;
    let column = (width / depths).clamp(6, 24);
    let canvas_width = column * depths;

    let row_of = |y: f64| (((y - layout.bounds.y) / band).floor() as usize).min(rows - 1);
    let mut grid = vec![vec![' '; canvas_width]; rows];

    for connector in &layout.connectors {
        let parent = &layout.nodes[connector.from];
        let child = &layout.nodes[connector.to];
        let (pr, cr) = (row_of(parent.position.y), row_of(child.position.y));
        let elbow = child.depth * column - 2;
        let label_end = (parent.depth * column + parent.label.width().min(column - 3)).min(elbow);
        for x in label_end..elbow {
            grid[pr][x] = '─';
        }
        for row in pr.min(cr) + 1..pr.max(cr) {
            grid[row][elbow] = '│';
        }
        grid[cr][elbow] = match cr.cmp(&pr) {
            std::cmp::Ordering::Greater => '╰',
            std::cmp::Ordering::Less => '╭',
            std::cmp::Ordering::Equal => '─',
        };
        grid[cr][elbow + 1] = '─';
    }

    let mut lines: Vec<String> = grid.into_iter().map(|row| row.into_iter().collect()).collect();
    for node in &layout.nodes {
        let row = row_of(node.position.y);
        let start = node.depth * column;
        let label = fit(&node.label, column - 3);
        lines[row] = overlay(&lines[row], start, &label);
    }
    lines
        .into_iter()
        .map(|line| fit(line.trim_end(), width))
        .collect()
}

/// Write `text` over `line` starting at display column `start`.
fn overlay(line: &str, start: usize, text: &str) -> String {
    let mut out = String::new();
    let mut column = 0;
    let mut chars = line.chars().peekable();
    while column < start {
        match chars.next() {
            Some(c) => {
                out.push(c);
                column += c.width().unwrap_or(0);
            }
            None => {
                out.push(' ');
                column += 1;
            }
        }
    }
    out.push_str(text);
    let mut skipped = 0;
    let text_width = text.width();
    for c in chars {
        if skipped < text_width {
            skipped += c.width().unwrap_or(0);
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ComponentRecord;
    use crate::registry::Registry;
    use serde_json::json;

    fn painted(records: &[ComponentRecord], width: usize) -> Vec<String> {
        paint_tree(&Registry::default().render_records(records), width)
    }

    #[test]
    fn lines_respect_width() {
        let records = vec![
            ComponentRecord::new("c", "card")
                .property("title", "A rather long card title that will not fit")
                .property("text", "Body text that wraps across several lines of the panel."),
            ComponentRecord::new("t", "table").payload(json!([
                {"name": "alpha", "description": "first entry in a table with wide cells"}
            ])),
        ];
        for line in painted(&records, 30) {
            assert!(line.width() <= 30, "too wide: {line:?}");
        }
    }

    #[test]
    fn badge_paints_its_text() {
        let lines = painted(
            &[ComponentRecord::new("x", "badge").property("text", "Done")],
            40,
        );
        assert_eq!(lines, vec!["(Done)"]);
    }

    #[test]
    fn unknown_type_is_labelled() {
        let lines = painted(&[ComponentRecord::new("s", "sparkle-widget")], 40);
        assert_eq!(lines, vec!["[? unknown type: sparkle-widget]"]);
    }

    #[test]
    fn card_children_paint_inside_the_panel() {
        let records = vec![
            ComponentRecord::new("c", "card").property("title", "Outer"),
            ComponentRecord::new("b", "badge").parent("c").property("text", "inner"),
        ];
        let lines = painted(&records, 20);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("╭─ Outer "));
        assert!(lines[1].contains("(inner)"));
        assert!(lines[2].starts_with('╰'));
    }

    #[test]
    fn mindmap_canvas_places_leaves_on_separate_rows() {
        let records = vec![ComponentRecord::new("d", "diagram").property(
            "root",
            json!({"label": "Root", "children": ["A", "B"]}),
        )];
        let lines = painted(&records, 60);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains('A'));
        assert!(lines[1].contains('B'));
        assert!(lines.iter().any(|line| line.contains("Root")));
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(fit("abcdef", 4), "abc…");
    }
}
