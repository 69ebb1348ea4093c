//! Engine-neutral document definition.
//!
//! A content tree, a flat named style dictionary, page setup and document
//! info. Every collection is ordered so that serializing the same definition
//! twice produces identical bytes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::{Alignment, Margins, Orientation, PageSize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDefinition {
    pub info: DocumentInfo,
    pub page: PageSetup,
    /// Style applied beneath every named style.
    pub default_style: StyleDef,
    pub styles: BTreeMap<String, StyleDef>,
    pub content: Vec<ContentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: Vec<String>,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetup {
    pub size: PageSize,
    pub orientation: Orientation,
    /// Width and height in points after orientation is applied.
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
    pub background: Option<String>,
}

impl PageSetup {
    pub fn content_width(&self) -> f32 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }
}

/// A partial text style. Unset fields inherit from the styles beneath.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<f32>,
}

impl StyleDef {
    /// Returns `self` with every field set in `over` replaced.
    pub fn overlay(&self, over: &StyleDef) -> StyleDef {
        StyleDef {
            font_family: over.font_family.clone().or_else(|| self.font_family.clone()),
            font_size: over.font_size.or(self.font_size),
            bold: over.bold.or(self.bold),
            color: over.color.clone().or_else(|| self.color.clone()),
            alignment: over.alignment.or(self.alignment),
            line_height: over.line_height.or(self.line_height),
            margin_top: over.margin_top.or(self.margin_top),
            margin_bottom: over.margin_bottom.or(self.margin_bottom),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Content tree
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentNode {
    Text(TextNode),
    Image(ImageNode),
    Stack(StackNode),
    Columns(ColumnsNode),
    Table(TableNode),
    List(ListNode),
    /// Horizontal rule across the current width.
    Rule(RuleNode),
    PageBreak,
}

/// A paragraph made of one or more runs that wrap together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub runs: Vec<TextRun>,
    pub styles: Vec<String>,
}

impl TextNode {
    pub fn plain(text: impl Into<String>, style: &str) -> Self {
        Self {
            runs: vec![TextRun::plain(text)],
            styles: vec![style.to_string()],
        }
    }

    pub fn with_runs(runs: Vec<TextRun>, style: &str) -> Self {
        Self {
            runs,
            styles: vec![style.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
    /// Inline overrides applied after the named styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<StyleDef>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Vec::new(),
            overrides: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: &str) -> Self {
        Self {
            text: text.into(),
            styles: vec![style.to_string()],
            overrides: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Vec::new(),
            overrides: Some(StyleDef {
                bold: Some(true),
                ..Default::default()
            }),
        }
    }
}

/// An image reference. Engines never fetch the source themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub source: String,
    pub width: f32,
    pub height: f32,
    pub alignment: Alignment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackNode {
    pub items: Vec<ContentNode>,
    pub margin_bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ColumnWidth {
    /// As wide as the column's widest unwrapped line.
    Auto,
    /// Shares whatever is left equally with other star columns.
    Star,
    Fixed(f32),
    Percent(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub width: ColumnWidth,
    pub content: Vec<ContentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsNode {
    pub columns: Vec<Column>,
    pub gap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub text: String,
    pub styles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    /// Leading rows of `body` that form the header.
    pub header_rows: usize,
    pub widths: Vec<ColumnWidth>,
    pub body: Vec<Vec<TableCell>>,
    pub cell_padding: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNode {
    pub ordered: bool,
    pub items: Vec<Vec<TextRun>>,
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub color: String,
    pub thickness: f32,
    pub margin_bottom: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_prefers_set_fields() {
        let base = StyleDef {
            font_family: Some("Inter".into()),
            font_size: Some(10.0),
            color: Some("#111111".into()),
            ..Default::default()
        };
        let over = StyleDef {
            font_size: Some(14.0),
            bold: Some(true),
            ..Default::default()
        };
        let merged = base.overlay(&over);
        assert_eq!(merged.font_family.as_deref(), Some("Inter"));
        assert_eq!(merged.font_size, Some(14.0));
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.color.as_deref(), Some("#111111"));
    }

    #[test]
    fn test_content_node_is_tagged() {
        let node = ContentNode::Text(TextNode::plain("hi", "body"));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["runs"][0]["text"], "hi");

        let json = serde_json::to_value(&ContentNode::PageBreak).unwrap();
        assert_eq!(json["type"], "page-break");
    }
}
