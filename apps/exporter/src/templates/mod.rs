//! Templates: immutable style/layout bundles plus a canonical section order.
//!
//! A template is a value object: once registered it is shared as `Arc<Template>`
//! and never mutated. Customised variants are produced by [`derive_template`],
//! which deep-merges a partial JSON override into a clone of the base.

pub mod builtin;
pub mod registry;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::TemplateError;
use crate::layout::{Alignment, Margins, Orientation, PageSize};

pub use registry::TemplateRegistry;

// ────────────────────────────────────────────────────────────────────────────
// Section types
// ────────────────────────────────────────────────────────────────────────────

/// Every section kind the transformer knows how to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    PersonalInfo,
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Languages,
    Certifications,
    Awards,
    References,
    Custom,
}

impl SectionType {
    pub const ALL: [SectionType; 11] = [
        SectionType::PersonalInfo,
        SectionType::Summary,
        SectionType::Experience,
        SectionType::Education,
        SectionType::Skills,
        SectionType::Projects,
        SectionType::Languages,
        SectionType::Certifications,
        SectionType::Awards,
        SectionType::References,
        SectionType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::PersonalInfo => "personal-info",
            SectionType::Summary => "summary",
            SectionType::Experience => "experience",
            SectionType::Education => "education",
            SectionType::Skills => "skills",
            SectionType::Projects => "projects",
            SectionType::Languages => "languages",
            SectionType::Certifications => "certifications",
            SectionType::Awards => "awards",
            SectionType::References => "references",
            SectionType::Custom => "custom",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown section type '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Style configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontConfig {
    /// The candidate's name in the header.
    pub name: FontSpec,
    pub heading: FontSpec,
    pub body: FontSpec,
    pub small: FontSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextColors {
    pub primary: String,
    pub secondary: String,
    pub muted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundColors {
    pub page: String,
    pub header: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderColors {
    pub light: String,
    pub strong: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorConfig {
    pub primary: String,
    pub accent: String,
    pub text: TextColors,
    pub background: BackgroundColors,
    pub border: BorderColors,
}

/// Vertical rhythm, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingConfig {
    pub section_gap: f32,
    pub item_gap: f32,
    pub paragraph_gap: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStyle {
    pub header_alignment: Alignment,
    pub show_avatar: bool,
    /// Width share (percent) of the title column in "title vs. date" lines.
    pub title_column_percent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTitleStyle {
    pub uppercase: bool,
    pub color: String,
    pub margin_bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStyles {
    pub section_title: SectionTitleStyle,
    pub contact_separator: String,
    pub date_color: String,
    pub table_header_fill: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub fonts: FontConfig,
    pub colors: ColorConfig,
    pub spacing: SpacingConfig,
    pub layout: LayoutStyle,
    pub components: ComponentStyles,
}

/// Page-level defaults; export options may override size and orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margins: Margins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub style_config: StyleConfig,
    pub layout_config: LayoutConfig,
    pub section_order: Vec<SectionType>,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

/// Checks structural completeness. Returns every problem found, not just the first.
pub fn validate_template(template: &Template) -> Result<(), TemplateError> {
    let mut problems = Vec::new();

    if template.id.trim().is_empty() {
        problems.push("id must not be empty".to_string());
    }
    if template.name.trim().is_empty() {
        problems.push("name must not be empty".to_string());
    }

    let fonts = &template.style_config.fonts;
    for (slot, spec) in [
        ("name", &fonts.name),
        ("heading", &fonts.heading),
        ("body", &fonts.body),
        ("small", &fonts.small),
    ] {
        if spec.family.trim().is_empty() {
            problems.push(format!("styleConfig.fonts.{slot}.family must not be empty"));
        }
        if !(spec.size > 0.0) {
            problems.push(format!("styleConfig.fonts.{slot}.size must be positive"));
        }
    }

    let colors = &template.style_config.colors;
    let components = &template.style_config.components;
    for (path, value) in [
        ("colors.primary", &colors.primary),
        ("colors.accent", &colors.accent),
        ("colors.text.primary", &colors.text.primary),
        ("colors.text.secondary", &colors.text.secondary),
        ("colors.text.muted", &colors.text.muted),
        ("colors.background.page", &colors.background.page),
        ("colors.background.header", &colors.background.header),
        ("colors.background.section", &colors.background.section),
        ("colors.border.light", &colors.border.light),
        ("colors.border.strong", &colors.border.strong),
        ("components.sectionTitle.color", &components.section_title.color),
        ("components.dateColor", &components.date_color),
        ("components.tableHeaderFill", &components.table_header_fill),
    ] {
        if !HEX_COLOR.is_match(value) {
            problems.push(format!(
                "styleConfig.{path} must be a hex color, got '{value}'"
            ));
        }
    }

    let spacing = &template.style_config.spacing;
    if spacing.section_gap < 0.0 || spacing.item_gap < 0.0 || spacing.paragraph_gap < 0.0 {
        problems.push("styleConfig.spacing gaps must be non-negative".to_string());
    }
    if !(spacing.line_height >= 1.0) {
        problems.push("styleConfig.spacing.lineHeight must be at least 1.0".to_string());
    }

    let percent = template.style_config.layout.title_column_percent;
    if !(percent > 0.0 && percent < 100.0) {
        problems.push("styleConfig.layout.titleColumnPercent must be within (0, 100)".to_string());
    }

    if !template.layout_config.margins.is_non_negative() {
        problems.push("layoutConfig.margins must be non-negative".to_string());
    }

    if template.section_order.is_empty() {
        problems.push("sectionOrder must not be empty".to_string());
    }
    let mut seen = HashSet::new();
    for section in &template.section_order {
        if !seen.insert(*section) {
            problems.push(format!("sectionOrder lists '{section}' more than once"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(TemplateError::Validation {
            id: template.id.clone(),
            problems,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Derivation (deep merge)
// ────────────────────────────────────────────────────────────────────────────

/// Builds a new template from `base` with a partial camelCase JSON override.
///
/// Objects merge key by key at every depth; scalars and arrays replace. So
/// `{"styleConfig": {"colors": {"text": {"primary": "#000000"}}}}` changes one
/// color and keeps every sibling. The result is validated but not registered.
pub fn derive_template(
    base: &Template,
    id: &str,
    name: &str,
    overrides: &Value,
) -> Result<Template, TemplateError> {
    if !overrides.is_object() {
        return Err(TemplateError::Override(
            "override must be a JSON object".to_string(),
        ));
    }

    let mut merged =
        serde_json::to_value(base).map_err(|e| TemplateError::Override(e.to_string()))?;
    deep_merge(&mut merged, overrides);

    let mut template: Template =
        serde_json::from_value(merged).map_err(|e| TemplateError::Override(e.to_string()))?;
    template.id = id.to_string();
    template.name = name.to_string();

    validate_template(&template)?;
    Ok(template)
}

/// Recursively merges `patch` into `target`.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) if existing.is_object() && patch_value.is_object() => {
                        deep_merge(existing, patch_value);
                    }
                    _ => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modern() -> Template {
        builtin::modern()
    }

    #[test]
    fn test_builtin_templates_are_valid() {
        for template in builtin::all() {
            assert!(validate_template(&template).is_ok(), "{} invalid", template.id);
        }
    }

    #[test]
    fn test_empty_section_order_rejected() {
        let mut t = modern();
        t.section_order.clear();
        let err = validate_template(&t).unwrap_err();
        assert!(err.to_string().contains("sectionOrder must not be empty"));
    }

    #[test]
    fn test_duplicate_section_rejected() {
        let mut t = modern();
        t.section_order.push(SectionType::Skills);
        t.section_order.push(SectionType::Skills);
        assert!(validate_template(&t).is_err());
    }

    #[test]
    fn test_blank_id_and_name_collect_both_problems() {
        let mut t = modern();
        t.id = " ".into();
        t.name = String::new();
        match validate_template(&t) {
            Err(TemplateError::Validation { problems, .. }) => assert_eq!(problems.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_color_rejected() {
        let mut t = modern();
        t.style_config.colors.text.primary = "black".into();
        assert!(validate_template(&t).is_err());
    }

    #[test]
    fn test_unknown_section_type_fails_deserialization() {
        let mut value = serde_json::to_value(modern()).unwrap();
        value["sectionOrder"] = json!(["personal-info", "hobbies"]);
        assert!(serde_json::from_value::<Template>(value).is_err());
    }

    #[test]
    fn test_derive_keeps_sibling_colors() {
        let base = modern();
        let derived = derive_template(
            &base,
            "modern-dark",
            "Modern Dark",
            &json!({ "styleConfig": { "colors": { "text": { "primary": "#000000" } } } }),
        )
        .unwrap();

        assert_eq!(derived.id, "modern-dark");
        assert_eq!(derived.style_config.colors.text.primary, "#000000");
        assert_eq!(
            derived.style_config.colors.text.secondary,
            base.style_config.colors.text.secondary
        );
        assert_eq!(
            derived.style_config.colors.background,
            base.style_config.colors.background
        );
        assert_eq!(derived.style_config.fonts, base.style_config.fonts);
    }

    #[test]
    fn test_derive_merges_nested_fonts_and_replaces_arrays() {
        let base = modern();
        let derived = derive_template(
            &base,
            "x",
            "X",
            &json!({
                "styleConfig": { "fonts": { "body": { "size": 11.5 } } },
                "sectionOrder": ["personal-info", "skills"]
            }),
        )
        .unwrap();
        assert_eq!(derived.style_config.fonts.body.size, 11.5);
        assert_eq!(derived.style_config.fonts.body.family, base.style_config.fonts.body.family);
        assert_eq!(
            derived.section_order,
            vec![SectionType::PersonalInfo, SectionType::Skills]
        );
    }

    #[test]
    fn test_derive_rejects_invalid_result() {
        let err = derive_template(&modern(), "x", "X", &json!({ "sectionOrder": [] })).unwrap_err();
        assert!(matches!(err, TemplateError::Validation { .. }));
    }

    #[test]
    fn test_derive_rejects_non_object_override() {
        assert!(matches!(
            derive_template(&modern(), "x", "X", &json!([1, 2])),
            Err(TemplateError::Override(_))
        ));
    }

    #[test]
    fn test_section_type_round_trip() {
        for t in SectionType::ALL {
            assert_eq!(t.as_str().parse::<SectionType>(), Ok(t));
        }
    }
}
