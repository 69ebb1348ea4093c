//! Data Transformer.
//!
//! Turns a [`ContentSnapshot`] plus a template into a [`StyledDocument`]:
//! template check, snapshot validation, section mapping in the effective
//! order, dense re-numbering, then metadata. All-or-nothing: any blocking
//! finding yields no document.

pub mod metadata;
pub mod sections;
pub mod types;
pub mod validation;

use tracing::debug;

use crate::errors::TemplateError;
use crate::models::ContentSnapshot;
use crate::templates::{validate_template, SectionType};

use self::sections::{Locale, SectionMapper};
pub use self::types::{
    codes, DocumentMetadata, SectionContent, Severity, StyledDocument, StyledSection,
    TransformOptions, TransformResult, ValidationIssue,
};
pub use self::validation::{validate_snapshot, Findings};

pub fn transform(snapshot: &ContentSnapshot, options: &TransformOptions) -> TransformResult {
    let template = &options.template;

    if let Err(err) = validate_template(template) {
        let errors = match err {
            TemplateError::Validation { problems, .. } => problems
                .into_iter()
                .map(|p| ValidationIssue::error(codes::TEMPLATE_VALIDATION_ERROR, p, None))
                .collect(),
            other => vec![ValidationIssue::error(
                codes::TEMPLATE_VALIDATION_ERROR,
                other.to_string(),
                None,
            )],
        };
        return TransformResult {
            success: false,
            data: None,
            errors,
            warnings: Vec::new(),
        };
    }

    let Findings { errors, warnings } = validate_snapshot(snapshot);
    if !errors.is_empty() {
        debug!(
            errors = errors.len(),
            warnings = warnings.len(),
            "Snapshot rejected"
        );
        return TransformResult {
            success: false,
            data: None,
            errors,
            warnings,
        };
    }

    let locale = Locale::from_tag(options.locale.as_deref());
    let mapper = SectionMapper::new(snapshot, template, locale);

    let order: &[SectionType] = options
        .custom_section_order
        .as_deref()
        .unwrap_or(&template.section_order);

    let mut sections: Vec<StyledSection> = order
        .iter()
        .copied()
        .filter(|t| {
            options
                .filter_sections
                .as_ref()
                .map_or(true, |keep| keep.contains(t))
        })
        .filter_map(|t| match mapper.map(t) {
            Some(section) => Some(section),
            None if options.include_empty_sections => Some(mapper.empty(t)),
            None => None,
        })
        .collect();

    for (i, section) in sections.iter_mut().enumerate() {
        section.order = i;
    }

    let metadata = metadata::build_metadata(snapshot, &sections, &template.id, locale.tag());

    debug!(
        template_id = %template.id,
        sections = sections.len(),
        words = metadata.word_count,
        "Snapshot transformed"
    );

    TransformResult {
        success: true,
        data: Some(StyledDocument {
            template: template.clone(),
            source_snapshot: snapshot.clone(),
            sections,
            metadata,
        }),
        errors: Vec::new(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snapshot::{
        EducationEntry, ExperienceEntry, PersonalInfo, SkillEntry, SkillLevel,
    };
    use crate::templates::builtin;
    use std::sync::Arc;

    fn minimal_snapshot() -> ContentSnapshot {
        ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "张三".into(),
                email: "zhang@example.com".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn rich_snapshot() -> ContentSnapshot {
        ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                summary: Some("Engineer who likes engines.".into()),
                ..Default::default()
            },
            experience: vec![ExperienceEntry {
                id: "e1".into(),
                company: "Analytical Co".into(),
                position: "Programmer".into(),
                start_date: "2019-01".into(),
                end_date: Some("2022-12".into()),
                technologies: vec!["Rust".into()],
                ..Default::default()
            }],
            education: vec![EducationEntry {
                id: "ed1".into(),
                institution: "University of London".into(),
                degree: "BSc".into(),
                start_date: "2014-09".into(),
                end_date: Some("2018-06".into()),
                ..Default::default()
            }],
            skills: vec![SkillEntry {
                id: "s1".into(),
                name: "Rust".into(),
                level: Some(SkillLevel::Expert),
                category: Some("Languages".into()),
            }],
            ..Default::default()
        }
    }

    fn options() -> TransformOptions {
        TransformOptions::new(Arc::new(builtin::modern()))
    }

    #[test]
    fn test_minimal_snapshot_yields_only_personal_info() {
        let result = transform(&minimal_snapshot(), &options());
        assert!(result.success);
        let doc = result.data.unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].section_type, SectionType::PersonalInfo);
        assert_eq!(doc.sections[0].order, 0);
        assert_eq!(doc.metadata.section_count, 1);

        let warning_codes: Vec<&str> = result.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(warning_codes, vec![codes::NO_EXPERIENCE, codes::NO_EDUCATION, codes::NO_SKILLS]);
    }

    #[test]
    fn test_missing_name_blocks_with_field_path() {
        let mut snapshot = minimal_snapshot();
        snapshot.personal_info.full_name = "  ".into();
        let result = transform(&snapshot, &options());
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, codes::REQUIRED_FIELD_MISSING);
        assert_eq!(result.errors[0].field.as_deref(), Some("personalInfo.fullName"));
    }

    #[test]
    fn test_invalid_template_reports_template_errors() {
        let mut template = builtin::modern();
        template.section_order.clear();
        template.name = String::new();
        let result = transform(&minimal_snapshot(), &TransformOptions::new(Arc::new(template)));
        assert!(!result.success);
        assert_eq!(result.errors.len(), 2);
        assert!(result
            .errors
            .iter()
            .all(|e| e.code == codes::TEMPLATE_VALIDATION_ERROR));
    }

    #[test]
    fn test_custom_order_gives_dense_order() {
        let mut opts = options();
        opts.custom_section_order = Some(vec![
            SectionType::Skills,
            SectionType::Awards,
            SectionType::Experience,
            SectionType::PersonalInfo,
        ]);
        let doc = transform(&rich_snapshot(), &opts).data.unwrap();
        let types: Vec<SectionType> = doc.sections.iter().map(|s| s.section_type).collect();
        assert_eq!(
            types,
            vec![
                SectionType::Skills,
                SectionType::Experience,
                SectionType::PersonalInfo
            ]
        );
        let orders: Vec<usize> = doc.sections.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_filter_sections_keeps_only_listed_types() {
        let mut opts = options();
        opts.filter_sections = Some(vec![SectionType::Education, SectionType::Summary]);
        let doc = transform(&rich_snapshot(), &opts).data.unwrap();
        let types: Vec<SectionType> = doc.sections.iter().map(|s| s.section_type).collect();
        assert_eq!(types, vec![SectionType::Summary, SectionType::Education]);
    }

    #[test]
    fn test_include_empty_sections_keeps_placeholders() {
        let mut opts = options();
        opts.include_empty_sections = true;
        let doc = transform(&minimal_snapshot(), &opts).data.unwrap();
        assert_eq!(doc.sections.len(), opts.template.section_order.len());
        assert!(doc.sections[0].visible);
        assert!(doc.sections[1..].iter().all(|s| !s.visible));
        assert_eq!(doc.sections.last().unwrap().order, doc.sections.len() - 1);
    }

    #[test]
    fn test_transform_is_deterministic_apart_from_timestamps() {
        let snapshot = rich_snapshot();
        let a = transform(&snapshot, &options()).data.unwrap();
        let mut b = transform(&snapshot, &options()).data.unwrap();
        b.metadata.created_at = a.metadata.created_at;
        b.metadata.updated_at = a.metadata.updated_at;
        assert_eq!(a, b);
        assert_eq!(a.metadata.tags, vec!["Rust", "Languages"]);
    }

    #[test]
    fn test_zh_locale_localizes_titles() {
        let mut opts = options();
        opts.locale = Some("zh-CN".into());
        let doc = transform(&rich_snapshot(), &opts).data.unwrap();
        assert_eq!(doc.metadata.locale, "zh-CN");
        let experience = doc
            .sections
            .iter()
            .find(|s| s.section_type == SectionType::Experience)
            .unwrap();
        assert_eq!(experience.title, "工作经历");
    }
}
