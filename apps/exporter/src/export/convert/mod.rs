//! Styled document → document definition.
//!
//! Pure and deterministic: the creation date is taken from the document
//! metadata, never from the clock.

pub mod content;
pub mod style;

use crate::export::definition::{ContentNode, DocumentDefinition, DocumentInfo};
use crate::export::options::ExportOptions;
use crate::transform::StyledDocument;

use self::content::SectionConverter;

pub fn convert_document(doc: &StyledDocument, options: &ExportOptions) -> DocumentDefinition {
    let template = doc.template.as_ref();
    let converter = SectionConverter::new(template);

    let mut content: Vec<ContentNode> = Vec::new();
    for section in doc.sections.iter().filter(|s| s.visible) {
        if !content.is_empty() && options.page_break_before.contains(&section.section_type) {
            content.push(ContentNode::PageBreak);
        }
        content.extend(converter.convert(section));
    }

    DocumentDefinition {
        info: document_info(doc, options),
        page: style::page_setup(template, options),
        default_style: style::default_style(template),
        styles: style::build_styles(template),
        content,
    }
}

fn document_info(doc: &StyledDocument, options: &ExportOptions) -> DocumentInfo {
    let name = doc.source_snapshot.personal_info.full_name.trim();
    let title = match &options.title {
        Some(title) => title.clone(),
        None if name.is_empty() => "Resume".to_string(),
        None => format!("{name} - Resume"),
    };
    DocumentInfo {
        title,
        author: options.author.clone().unwrap_or_else(|| name.to_string()),
        subject: "Resume".to_string(),
        keywords: doc.metadata.tags.clone(),
        creation_date: doc.metadata.created_at,
    }
}

/// Pretty JSON form of a definition, used by the `json` export format.
pub fn to_json(definition: &DocumentDefinition) -> serde_json::Result<String> {
    serde_json::to_string_pretty(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snapshot::{ContentSnapshot, ExperienceEntry, PersonalInfo};
    use crate::templates::{builtin, SectionType};
    use crate::transform::{transform, TransformOptions};
    use std::sync::Arc;

    fn document(include_empty: bool) -> StyledDocument {
        let snapshot = ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Grace Hopper".into(),
                email: "grace@example.com".into(),
                summary: Some("Compiler pioneer.".into()),
                ..Default::default()
            },
            experience: vec![ExperienceEntry {
                id: "1".into(),
                company: "US Navy".into(),
                position: "Rear Admiral".into(),
                start_date: "1943".into(),
                end_date: Some("1986".into()),
                achievements: vec!["Built the first compiler".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut options = TransformOptions::new(Arc::new(builtin::modern()));
        options.include_empty_sections = include_empty;
        transform(&snapshot, &options).data.unwrap()
    }

    #[test]
    fn test_conversion_is_byte_identical_for_same_input() {
        let doc = document(false);
        let options = ExportOptions::default();
        let a = to_json(&convert_document(&doc, &options)).unwrap();
        let b = to_json(&convert_document(&doc, &options)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hidden_placeholders_produce_no_content() {
        let options = ExportOptions::default();
        let with_empty = convert_document(&document(true), &options);
        let mut without = convert_document(&document(false), &options);
        without.info.creation_date = with_empty.info.creation_date;
        assert_eq!(with_empty.content, without.content);
    }

    #[test]
    fn test_page_break_before_inserted_between_sections() {
        let doc = document(false);
        let options = ExportOptions {
            page_break_before: vec![SectionType::Experience, SectionType::PersonalInfo],
            ..Default::default()
        };
        let def = convert_document(&doc, &options);
        let breaks = def
            .content
            .iter()
            .filter(|n| matches!(n, ContentNode::PageBreak))
            .count();
        assert_eq!(breaks, 1);
    }

    #[test]
    fn test_document_info_defaults_to_owner() {
        let def = convert_document(&document(false), &ExportOptions::default());
        assert_eq!(def.info.title, "Grace Hopper - Resume");
        assert_eq!(def.info.author, "Grace Hopper");
        let with_title = convert_document(
            &document(false),
            &ExportOptions {
                title: Some("CV".into()),
                ..Default::default()
            },
        );
        assert_eq!(with_title.info.title, "CV");
    }
}
