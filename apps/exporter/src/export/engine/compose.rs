//! Flow layout: content tree → positioned drawing operations per page.
//!
//! Layout happens in two steps. Nodes are first broken into [`Row`]s, atomic
//! horizontal bands with a height and ops positioned relative to the band top.
//! The paginator then stacks rows onto pages, starting a new page when a row
//! does not fit. Rows never split, so a table row or a column block always
//! lands on a single page.

use tokio_util::sync::CancellationToken;

use crate::errors::RenderError;
use crate::export::definition::{
    ColumnWidth, ColumnsNode, ContentNode, DocumentDefinition, ImageNode, ListNode, RuleNode,
    StyleDef, TableNode, TextNode, TextRun,
};
use crate::layout::font_metrics::is_ideographic;
use crate::layout::{get_metrics, Alignment, StandardFont};

const LIST_INDENT: f32 = 12.0;
const BULLET: &str = "\u{2022}";

// ────────────────────────────────────────────────────────────────────────────
// Primitives
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    /// `#rgb` or `#rrggbb`; anything else is black.
    pub fn parse(hex: &str) -> Rgb {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Rgb::BLACK;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Rgb::BLACK,
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .ok()
        };
        match (channel(0), channel(2), channel(4)) {
            (Some(r), Some(g), Some(b)) => Rgb(r, g, b),
            _ => Rgb::BLACK,
        }
    }
}

/// A drawing operation in top-down page coordinates (points from the top edge).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        font: StandardFont,
        size: f32,
        color: Rgb,
        text: String,
    },
    FillRect {
        x: f32,
        top: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        top: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Line {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: Rgb,
    },
}

impl DrawOp {
    fn shifted(mut self, dy: f32) -> DrawOp {
        match &mut self {
            DrawOp::Text { baseline, .. } => *baseline += dy,
            DrawOp::FillRect { top, .. } | DrawOp::StrokeRect { top, .. } => *top += dy,
            DrawOp::Line { y, .. } => *y += dy,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Resolved {
    font: StandardFont,
    size: f32,
    color: Rgb,
    alignment: Alignment,
    line_height: f32,
    margin_top: f32,
    margin_bottom: f32,
}

impl Resolved {
    fn leading(&self) -> f32 {
        self.size * self.line_height
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RowKind {
    Content,
    /// Vertical space; dropped at the top of a page.
    Spacer,
    PageBreak,
}

#[derive(Debug, Clone)]
struct Row {
    kind: RowKind,
    height: f32,
    ops: Vec<DrawOp>,
}

impl Row {
    fn spacer(height: f32) -> Option<Row> {
        (height > 0.0).then(|| Row {
            kind: RowKind::Spacer,
            height,
            ops: Vec::new(),
        })
    }
}

struct Word {
    text: String,
    style: Resolved,
    width: f32,
    space_before: bool,
}

struct Fragment {
    x: f32,
    text: String,
    style: Resolved,
}

#[derive(Default)]
struct Line {
    fragments: Vec<Fragment>,
    width: f32,
    height: f32,
    ascent: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Composer
// ────────────────────────────────────────────────────────────────────────────

pub struct Composer<'a> {
    def: &'a DocumentDefinition,
}

impl<'a> Composer<'a> {
    pub fn new(def: &'a DocumentDefinition) -> Self {
        Self { def }
    }

    /// Lays out the whole document. Always returns at least one page.
    pub fn compose(&self, cancel: &CancellationToken) -> Result<Vec<Vec<DrawOp>>, RenderError> {
        let page = &self.def.page;
        let top = page.margins.top;
        let bottom = page.height - page.margins.bottom;
        if bottom <= top || page.content_width() <= 0.0 {
            return Err(RenderError::Layout(
                "margins leave no room for content".to_string(),
            ));
        }

        let rows = self.layout_nodes(&self.def.content, page.margins.left, page.content_width());

        let mut pages: Vec<Vec<DrawOp>> = Vec::new();
        let mut current = self.page_background();
        let mut has_content = false;
        let mut y = top;

        for row in rows {
            match row.kind {
                RowKind::PageBreak => {
                    if has_content {
                        pages.push(std::mem::replace(&mut current, self.page_background()));
                        has_content = false;
                        y = top;
                        check_cancelled(cancel)?;
                    }
                }
                RowKind::Spacer => {
                    if y > top {
                        y += row.height;
                    }
                }
                RowKind::Content => {
                    if y + row.height > bottom && y > top {
                        pages.push(std::mem::replace(&mut current, self.page_background()));
                        y = top;
                        check_cancelled(cancel)?;
                    }
                    current.extend(row.ops.into_iter().map(|op| op.shifted(y)));
                    y += row.height;
                    has_content = true;
                }
            }
        }
        pages.push(current);
        Ok(pages)
    }

    fn page_background(&self) -> Vec<DrawOp> {
        let page = &self.def.page;
        match &page.background {
            Some(color) => vec![DrawOp::FillRect {
                x: 0.0,
                top: 0.0,
                width: page.width,
                height: page.height,
                color: Rgb::parse(color),
            }],
            None => Vec::new(),
        }
    }

    fn resolve(&self, styles: &[String], overrides: Option<&StyleDef>) -> Resolved {
        let mut def = self.def.default_style.clone();
        for name in styles {
            if let Some(style) = self.def.styles.get(name) {
                def = def.overlay(style);
            }
        }
        if let Some(over) = overrides {
            def = def.overlay(over);
        }
        Resolved {
            font: StandardFont::resolve(
                def.font_family.as_deref().unwrap_or("Helvetica"),
                def.bold.unwrap_or(false),
            ),
            size: def.font_size.filter(|s| *s > 0.0).unwrap_or(10.0),
            color: def.color.as_deref().map(Rgb::parse).unwrap_or(Rgb::BLACK),
            alignment: def.alignment.unwrap_or(Alignment::Left),
            line_height: def.line_height.filter(|l| *l >= 1.0).unwrap_or(1.2),
            margin_top: def.margin_top.unwrap_or(0.0).max(0.0),
            margin_bottom: def.margin_bottom.unwrap_or(0.0).max(0.0),
        }
    }

    // ── node layout ────────────────────────────────────────────────────────

    fn layout_nodes(&self, nodes: &[ContentNode], x: f32, width: f32) -> Vec<Row> {
        let mut rows = Vec::new();
        for node in nodes {
            match node {
                ContentNode::Text(text) => rows.extend(self.layout_text(text, x, width)),
                ContentNode::Image(image) => rows.push(self.layout_image(image, x, width)),
                ContentNode::Stack(stack) => {
                    rows.extend(self.layout_nodes(&stack.items, x, width));
                    rows.extend(Row::spacer(stack.margin_bottom));
                }
                ContentNode::Columns(columns) => rows.extend(self.layout_columns(columns, x, width)),
                ContentNode::Table(table) => rows.extend(self.layout_table(table, x, width)),
                ContentNode::List(list) => rows.extend(self.layout_list(list, x, width)),
                ContentNode::Rule(rule) => rows.extend(self.layout_rule(rule, x, width)),
                ContentNode::PageBreak => rows.push(Row {
                    kind: RowKind::PageBreak,
                    height: 0.0,
                    ops: Vec::new(),
                }),
            }
        }
        rows
    }

    fn layout_text(&self, node: &TextNode, x: f32, width: f32) -> Vec<Row> {
        let para = self.resolve(&node.styles, None);
        let lines = self.wrap_runs(&node.runs, &node.styles, width);
        if lines.is_empty() {
            return Vec::new();
        }

        let mut rows: Vec<Row> = Row::spacer(para.margin_top).into_iter().collect();
        for line in lines {
            rows.push(line_row(line, x, width, para.alignment));
        }
        rows.extend(Row::spacer(para.margin_bottom));
        rows
    }

    /// Images are drawn as a framed placeholder box; sources are never fetched.
    fn layout_image(&self, image: &ImageNode, x: f32, width: f32) -> Row {
        let w = image.width.min(width);
        let offset = align_offset(image.alignment, width, w);
        tracing::debug!(source = %image.source, "Image drawn as placeholder");
        Row {
            kind: RowKind::Content,
            height: image.height + 4.0,
            ops: vec![DrawOp::StrokeRect {
                x: x + offset,
                top: 0.0,
                width: w,
                height: image.height,
                color: Rgb(0.8, 0.8, 0.8),
            }],
        }
    }

    fn layout_rule(&self, rule: &RuleNode, x: f32, width: f32) -> Vec<Row> {
        let mut rows = vec![Row {
            kind: RowKind::Content,
            height: rule.thickness,
            ops: vec![DrawOp::Line {
                x1: x,
                x2: x + width,
                y: rule.thickness / 2.0,
                thickness: rule.thickness,
                color: Rgb::parse(&rule.color),
            }],
        }];
        rows.extend(Row::spacer(rule.margin_bottom));
        rows
    }

    /// Columns are laid out side by side and merged into one unbreakable row.
    fn layout_columns(&self, node: &ColumnsNode, x: f32, width: f32) -> Vec<Row> {
        let specs: Vec<ColumnWidth> = node.columns.iter().map(|c| c.width).collect();
        let widths = resolve_widths(&specs, width, node.gap, |i| {
            self.natural_width(&node.columns[i].content)
        });

        let mut ops = Vec::new();
        let mut height: f32 = 0.0;
        let mut cx = x;
        for (column, w) in node.columns.iter().zip(&widths) {
            let mut y = 0.0;
            for row in self.layout_nodes(&column.content, cx, *w) {
                match row.kind {
                    RowKind::Content => {
                        ops.extend(row.ops.into_iter().map(|op| op.shifted(y)));
                        y += row.height;
                    }
                    RowKind::Spacer => y += row.height,
                    RowKind::PageBreak => {}
                }
            }
            height = height.max(y);
            cx += w + node.gap;
        }

        if ops.is_empty() {
            return Vec::new();
        }
        vec![Row {
            kind: RowKind::Content,
            height,
            ops,
        }]
    }

    fn natural_width(&self, nodes: &[ContentNode]) -> f32 {
        nodes
            .iter()
            .map(|node| match node {
                ContentNode::Text(text) => text
                    .runs
                    .iter()
                    .map(|run| {
                        let style =
                            self.resolve(&run_styles(&text.styles, run), run.overrides.as_ref());
                        get_metrics(style.font).measure_str(&run.text) * style.size
                    })
                    .sum::<f32>(),
                ContentNode::Image(image) => image.width,
                _ => 0.0,
            })
            .fold(0.0, f32::max)
    }

    fn layout_list(&self, node: &ListNode, x: f32, width: f32) -> Vec<Row> {
        let para = self.resolve(&node.styles, None);
        let inner = (width - LIST_INDENT).max(1.0);
        let mut rows: Vec<Row> = Row::spacer(para.margin_top).into_iter().collect();

        for (i, item) in node.items.iter().enumerate() {
            let marker = if node.ordered {
                format!("{}.", i + 1)
            } else {
                BULLET.to_string()
            };
            for (j, line) in self.wrap_runs(item, &node.styles, inner).into_iter().enumerate() {
                let ascent = line.ascent;
                let mut row = line_row(line, x + LIST_INDENT, inner, Alignment::Left);
                if j == 0 {
                    row.ops.push(DrawOp::Text {
                        x,
                        baseline: ascent,
                        font: para.font,
                        size: para.size,
                        color: para.color,
                        text: marker.clone(),
                    });
                }
                rows.push(row);
            }
        }
        rows.extend(Row::spacer(para.margin_bottom));
        rows
    }

    fn layout_table(&self, node: &TableNode, x: f32, width: f32) -> Vec<Row> {
        let columns = node.body.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Vec::new();
        }
        let mut specs = node.widths.clone();
        specs.resize(columns, ColumnWidth::Star);

        let padding = node.cell_padding.max(0.0);
        let widths = resolve_widths(&specs, width, 0.0, |i| {
            node.body
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| {
                    let style = self.resolve(&cell.styles, None);
                    get_metrics(style.font).measure_str(&cell.text) * style.size + 2.0 * padding
                })
                .fold(0.0, f32::max)
        });
        let border = node.border_color.as_deref().map(Rgb::parse);

        let mut rows = Vec::new();
        for (r, cells) in node.body.iter().enumerate() {
            let mut ops = Vec::new();
            let mut texts = Vec::new();
            let mut height: f32 = 0.0;
            let mut cx = x;

            for (cell, w) in cells.iter().zip(&widths) {
                let style = self.resolve(&cell.styles, None);
                let text_width = (w - 2.0 * padding).max(1.0);
                let lines = get_metrics(style.font).wrap(&cell.text, text_width / style.size);
                height = height.max(lines.len() as f32 * style.leading() + 2.0 * padding);
                texts.push((cx, *w, style, lines, cell.fill.as_deref()));
                cx += w;
            }

            for (cx, w, style, lines, fill) in texts {
                if let Some(fill) = fill {
                    ops.push(DrawOp::FillRect {
                        x: cx,
                        top: 0.0,
                        width: w,
                        height,
                        color: Rgb::parse(fill),
                    });
                }
                let metrics = get_metrics(style.font);
                for (k, line) in lines.into_iter().enumerate() {
                    let line_w = metrics.measure_str(&line) * style.size;
                    let offset = align_offset(style.alignment, w - 2.0 * padding, line_w);
                    ops.push(DrawOp::Text {
                        x: cx + padding + offset,
                        baseline: padding + k as f32 * style.leading() + ascent_of(&style),
                        font: style.font,
                        size: style.size,
                        color: style.color,
                        text: line,
                    });
                }
            }

            if let Some(color) = border {
                if r == 0 {
                    ops.push(DrawOp::Line {
                        x1: x,
                        x2: x + width,
                        y: 0.0,
                        thickness: 0.5,
                        color,
                    });
                }
                ops.push(DrawOp::Line {
                    x1: x,
                    x2: x + width,
                    y: height,
                    thickness: if r + 1 == node.header_rows { 1.0 } else { 0.5 },
                    color,
                });
            }

            rows.push(Row {
                kind: RowKind::Content,
                height,
                ops,
            });
        }
        rows
    }

    // ── rich-text wrapping ─────────────────────────────────────────────────

    fn words(&self, runs: &[TextRun], base: &[String]) -> Vec<Word> {
        let mut words = Vec::new();
        let mut space = false;

        for run in runs {
            let style = self.resolve(&run_styles(base, run), run.overrides.as_ref());
            let metrics = get_metrics(style.font);
            let make = |text: String, space_before: bool| Word {
                width: metrics.measure_str(&text) * style.size,
                text,
                style,
                space_before,
            };

            let mut buf = String::new();
            let mut buf_space = false;
            for c in run.text.chars() {
                if c.is_whitespace() {
                    if !buf.is_empty() {
                        words.push(make(std::mem::take(&mut buf), buf_space));
                    }
                    space = true;
                } else if is_ideographic(c) {
                    if !buf.is_empty() {
                        words.push(make(std::mem::take(&mut buf), buf_space));
                    }
                    words.push(make(c.to_string(), space));
                    space = false;
                } else {
                    if buf.is_empty() {
                        buf_space = space;
                        space = false;
                    }
                    buf.push(c);
                }
            }
            if !buf.is_empty() {
                words.push(make(buf, buf_space));
            }
        }
        words
    }

    fn wrap_runs(&self, runs: &[TextRun], base: &[String], width: f32) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut line = Line::default();

        for word in self.words(runs, base) {
            if word.width > width {
                for piece in split_oversized(&word, width) {
                    if !line.fragments.is_empty() && line.width + piece.width > width {
                        lines.push(std::mem::take(&mut line));
                    }
                    place(&mut line, piece, false);
                }
                continue;
            }

            let space_w = if word.space_before && !line.fragments.is_empty() {
                get_metrics(word.style.font).space_width * word.style.size
            } else {
                0.0
            };
            if !line.fragments.is_empty() && line.width + space_w + word.width > width {
                lines.push(std::mem::take(&mut line));
                place(&mut line, word, false);
            } else {
                let spaced = space_w > 0.0;
                place(&mut line, word, spaced);
            }
        }
        if !line.fragments.is_empty() {
            lines.push(line);
        }
        lines
    }
}

fn run_styles(base: &[String], run: &TextRun) -> Vec<String> {
    base.iter().chain(&run.styles).cloned().collect()
}

fn ascent_of(style: &Resolved) -> f32 {
    (style.leading() - style.size) / 2.0 + style.size * 0.8
}

/// Appends a word to a line, merging into the previous fragment when the
/// style is unchanged.
fn place(line: &mut Line, word: Word, spaced: bool) {
    let space_w = if spaced {
        get_metrics(word.style.font).space_width * word.style.size
    } else {
        0.0
    };
    line.height = line.height.max(word.style.leading());
    line.ascent = line.ascent.max(ascent_of(&word.style));

    match line.fragments.last_mut() {
        Some(last) if last.style == word.style => {
            if spaced {
                last.text.push(' ');
            }
            last.text.push_str(&word.text);
        }
        _ => {
            let text = if spaced {
                format!(" {}", word.text)
            } else {
                word.text
            };
            line.fragments.push(Fragment {
                x: line.width,
                text,
                style: word.style,
            });
        }
    }
    line.width += space_w + word.width;
}

fn split_oversized(word: &Word, width: f32) -> Vec<Word> {
    let metrics = get_metrics(word.style.font);
    let mut pieces = Vec::new();
    let mut buf = String::new();
    let mut buf_w = 0.0;

    for c in word.text.chars() {
        let w = metrics.measure_str(c.encode_utf8(&mut [0; 4])) * word.style.size;
        if buf_w + w > width && !buf.is_empty() {
            pieces.push(Word {
                text: std::mem::take(&mut buf),
                style: word.style,
                width: buf_w,
                space_before: false,
            });
            buf_w = 0.0;
        }
        buf.push(c);
        buf_w += w;
    }
    if !buf.is_empty() {
        pieces.push(Word {
            text: buf,
            style: word.style,
            width: buf_w,
            space_before: false,
        });
    }
    pieces
}

fn line_row(line: Line, x: f32, width: f32, alignment: Alignment) -> Row {
    let offset = align_offset(alignment, width, line.width);
    let ops = line
        .fragments
        .into_iter()
        .map(|f| DrawOp::Text {
            x: x + offset + f.x,
            baseline: line.ascent,
            font: f.style.font,
            size: f.style.size,
            color: f.style.color,
            text: f.text,
        })
        .collect();
    Row {
        kind: RowKind::Content,
        height: line.height,
        ops,
    }
}

fn align_offset(alignment: Alignment, available: f32, used: f32) -> f32 {
    let free = (available - used).max(0.0);
    match alignment {
        Alignment::Left => 0.0,
        Alignment::Center => free / 2.0,
        Alignment::Right => free,
    }
}

/// Resolves column widths: fixed and percent first, then auto, then star
/// columns share what is left.
fn resolve_widths(
    specs: &[ColumnWidth],
    total: f32,
    gap: f32,
    auto_width: impl Fn(usize) -> f32,
) -> Vec<f32> {
    let available = (total - gap * specs.len().saturating_sub(1) as f32).max(0.0);
    let mut widths: Vec<f32> = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| match spec {
            ColumnWidth::Fixed(w) => w.max(0.0),
            ColumnWidth::Percent(p) => available * p.clamp(0.0, 100.0) / 100.0,
            ColumnWidth::Auto => auto_width(i),
            ColumnWidth::Star => 0.0,
        })
        .collect();

    let used: f32 = widths.iter().sum();
    let stars = specs.iter().filter(|s| matches!(s, ColumnWidth::Star)).count();
    if stars > 0 {
        let share = ((available - used) / stars as f32).max(0.0);
        for (w, spec) in widths.iter_mut().zip(specs) {
            if matches!(spec, ColumnWidth::Star) {
                *w = share;
            }
        }
    }

    let sum: f32 = widths.iter().sum();
    if sum > available && sum > 0.0 {
        let scale = available / sum;
        widths.iter_mut().for_each(|w| *w *= scale);
    }
    widths
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), RenderError> {
    if cancel.is_cancelled() {
        Err(RenderError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::convert::convert_document;
    use crate::export::options::ExportOptions;
    use crate::models::snapshot::{ContentSnapshot, PersonalInfo};
    use crate::templates::builtin;
    use crate::transform::{transform, TransformOptions};
    use std::sync::Arc;

    fn definition(content: Vec<ContentNode>) -> DocumentDefinition {
        let snapshot = ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Test".into(),
                email: "t@example.com".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let doc = transform(&snapshot, &TransformOptions::new(Arc::new(builtin::modern())))
            .data
            .unwrap();
        let mut def = convert_document(&doc, &ExportOptions::default());
        def.content = content;
        def
    }

    fn texts(ops: &[DrawOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#ffffff"), Rgb(1.0, 1.0, 1.0));
        assert_eq!(Rgb::parse("#000"), Rgb::BLACK);
        assert_eq!(Rgb::parse("nonsense"), Rgb::BLACK);
    }

    #[test]
    fn test_resolve_widths_star_shares_remainder() {
        let widths = resolve_widths(
            &[ColumnWidth::Percent(50.0), ColumnWidth::Star, ColumnWidth::Fixed(20.0)],
            220.0,
            10.0,
            |_| 0.0,
        );
        assert_eq!(widths, vec![100.0, 80.0, 20.0]);
    }

    #[test]
    fn test_resolve_widths_scales_down_overflow() {
        let widths = resolve_widths(
            &[ColumnWidth::Fixed(300.0), ColumnWidth::Fixed(100.0)],
            200.0,
            0.0,
            |_| 0.0,
        );
        assert_eq!(widths, vec![150.0, 50.0]);
    }

    #[test]
    fn test_runs_with_same_style_merge_into_one_fragment() {
        let def = definition(vec![ContentNode::Text(TextNode::plain("hello wide world", "body"))]);
        let pages = Composer::new(&def).compose(&CancellationToken::new()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(texts(&pages[0]), vec!["hello wide world"]);
    }

    #[test]
    fn test_long_text_wraps_and_paginates() {
        let paragraph = "lorem ipsum dolor sit amet ".repeat(400);
        let def = definition(vec![ContentNode::Text(TextNode::plain(paragraph, "body"))]);
        let pages = Composer::new(&def).compose(&CancellationToken::new()).unwrap();
        assert!(pages.len() > 1);
        let bottom = def.page.height - def.page.margins.bottom;
        for page in &pages {
            for op in page {
                if let DrawOp::Text { baseline, .. } = op {
                    assert!(*baseline <= bottom);
                }
            }
        }
    }

    #[test]
    fn test_page_break_starts_new_page_only_after_content() {
        let def = definition(vec![
            ContentNode::PageBreak,
            ContentNode::Text(TextNode::plain("one", "body")),
            ContentNode::PageBreak,
            ContentNode::Text(TextNode::plain("two", "body")),
        ]);
        let pages = Composer::new(&def).compose(&CancellationToken::new()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[1]), vec!["two"]);
    }

    #[test]
    fn test_cancelled_token_stops_between_pages() {
        let paragraph = "lorem ipsum dolor sit amet ".repeat(400);
        let def = definition(vec![ContentNode::Text(TextNode::plain(paragraph, "body"))]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            Composer::new(&def).compose(&cancel),
            Err(RenderError::Cancelled)
        ));
    }

    #[test]
    fn test_list_draws_marker_per_item() {
        let def = definition(vec![ContentNode::List(ListNode {
            ordered: true,
            items: vec![vec![TextRun::plain("first")], vec![TextRun::plain("second")]],
            styles: vec!["bullet".into()],
        })]);
        let pages = Composer::new(&def).compose(&CancellationToken::new()).unwrap();
        let t = texts(&pages[0]);
        assert!(t.contains(&"1.") && t.contains(&"2."));
        assert!(t.contains(&"first") && t.contains(&"second"));
    }

    #[test]
    fn test_oversized_word_is_split() {
        let def = definition(vec![ContentNode::Columns(ColumnsNode {
            columns: vec![crate::export::definition::Column {
                width: ColumnWidth::Fixed(30.0),
                content: vec![ContentNode::Text(TextNode::plain(
                    "supercalifragilisticexpialidocious",
                    "body",
                ))],
            }],
            gap: 0.0,
        })]);
        let pages = Composer::new(&def).compose(&CancellationToken::new()).unwrap();
        let t = texts(&pages[0]);
        assert!(t.len() > 1);
        assert_eq!(t.concat(), "supercalifragilisticexpialidocious");
    }
}
