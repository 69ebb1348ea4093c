use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::Alignment;
use crate::models::ContentSnapshot;
use crate::templates::{FontSpec, SectionType, Template};

// ────────────────────────────────────────────────────────────────────────────
// Issues
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding. Only `Severity::Error` blocks a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(code: &str, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field,
            severity: Severity::Error,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field,
            severity: Severity::Warning,
        }
    }
}

pub mod codes {
    pub const TEMPLATE_VALIDATION_ERROR: &str = "TEMPLATE_VALIDATION_ERROR";
    pub const REQUIRED_FIELD_MISSING: &str = "REQUIRED_FIELD_MISSING";
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
    pub const NO_EXPERIENCE: &str = "NO_EXPERIENCE";
    pub const NO_EDUCATION: &str = "NO_EDUCATION";
    pub const NO_SKILLS: &str = "NO_SKILLS";
    pub const DATE_ORDER: &str = "DATE_ORDER";
    pub const INVALID_URL: &str = "INVALID_URL";
    pub const UNSUPPORTED_GLYPHS: &str = "UNSUPPORTED_GLYPHS";
}

// ────────────────────────────────────────────────────────────────────────────
// Options / result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub template: Arc<Template>,
    pub include_empty_sections: bool,
    /// Replaces the template's section order when set.
    pub custom_section_order: Option<Vec<SectionType>>,
    /// When set, only these section types are emitted.
    pub filter_sections: Option<Vec<SectionType>>,
    /// `zh-CN` (or any `zh*`) selects Chinese titles; anything else is English.
    pub locale: Option<String>,
}

impl TransformOptions {
    pub fn new(template: Arc<Template>) -> Self {
        Self {
            template,
            include_empty_sections: false,
            custom_section_order: None,
            filter_sections: None,
            locale: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub success: bool,
    pub data: Option<StyledDocument>,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

// ────────────────────────────────────────────────────────────────────────────
// Styled document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledDocument {
    pub template: Arc<Template>,
    pub source_snapshot: ContentSnapshot,
    pub sections: Vec<StyledSection>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub word_count: usize,
    pub tags: Vec<String>,
    pub section_count: usize,
    pub template_id: String,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledSection {
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub title: String,
    pub content: SectionContent,
    pub style: SectionStyle,
    /// False for placeholder sections kept only because empty sections were requested.
    pub visible: bool,
    pub order: usize,
}

/// Template-derived styling resolved for one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStyle {
    pub title_font: FontSpec,
    pub body_font: FontSpec,
    pub title_color: String,
    pub text_color: String,
    pub secondary_color: String,
    pub uppercase_title: bool,
    pub alignment: Alignment,
    pub margin_bottom: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Section content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SectionContent {
    Text {
        text: String,
    },
    List {
        items: Vec<ListItem>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    PersonalInfo(PersonalInfoFields),
}

impl SectionContent {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionContent::Text { text } => text.trim().is_empty(),
            SectionContent::List { items } => items.is_empty(),
            SectionContent::Table { rows, .. } => rows.is_empty(),
            SectionContent::PersonalInfo(fields) => {
                fields.full_name.trim().is_empty() && fields.contacts.is_empty()
            }
        }
    }

    /// Every piece of human-readable text, in reading order.
    pub fn text_fragments(&self) -> Vec<&str> {
        match self {
            SectionContent::Text { text } => vec![text.as_str()],
            SectionContent::List { items } => items
                .iter()
                .flat_map(|item| {
                    std::iter::once(item.title.as_str())
                        .chain(item.subtitle.as_deref())
                        .chain(item.date_range.as_deref())
                        .chain(item.location.as_deref())
                        .chain(item.description.as_deref())
                        .chain(item.bullets.iter().map(String::as_str))
                        .chain(item.tags.iter().map(String::as_str))
                })
                .collect(),
            SectionContent::Table { headers, rows } => headers
                .iter()
                .chain(rows.iter().flatten())
                .map(String::as_str)
                .collect(),
            SectionContent::PersonalInfo(fields) => std::iter::once(fields.full_name.as_str())
                .chain(fields.title.as_deref())
                .chain(fields.contacts.iter().map(|c| c.value.as_str()))
                .collect(),
        }
    }
}

/// One entry of a list-shaped section (a job, a degree, a project, a language...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub title: String,
    pub subtitle: Option<String>,
    pub date_range: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub bullets: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Phone,
    Location,
    Website,
    Linkedin,
    Github,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactField {
    pub kind: ContactKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfoFields {
    pub full_name: String,
    pub title: Option<String>,
    pub contacts: Vec<ContactField>,
    pub avatar: Option<String>,
}
