use std::collections::HashSet;

use chrono::Utc;

use crate::layout::font_metrics::is_ideographic;
use crate::models::snapshot::non_blank;
use crate::models::ContentSnapshot;
use crate::transform::types::{DocumentMetadata, StyledSection};

/// Counts words the way a reader would.
///
/// Each ideographic character is one word; the remaining text is split on
/// whitespace. Ideographs also act as separators, so `"Rust工程师"` is 4 words.
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut latin = String::with_capacity(text.len());

    for c in text.chars() {
        if is_ideographic(c) {
            count += 1;
            latin.push(' ');
        } else {
            latin.push(c);
        }
    }

    count + latin.split_whitespace().count()
}

/// Tags harvested from skill names, skill categories and experience technologies.
/// First occurrence wins; comparison ignores case.
pub fn collect_tags(snapshot: &ContentSnapshot) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    let candidates = snapshot
        .skills
        .iter()
        .flat_map(|s| std::iter::once(s.name.as_str()).chain(non_blank(&s.category)))
        .chain(
            snapshot
                .experience
                .iter()
                .flat_map(|e| e.technologies.iter().map(String::as_str)),
        );

    for candidate in candidates {
        let tag = candidate.trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn build_metadata(
    snapshot: &ContentSnapshot,
    sections: &[StyledSection],
    template_id: &str,
    locale: &str,
) -> DocumentMetadata {
    let word_count = sections
        .iter()
        .flat_map(|s| std::iter::once(s.title.as_str()).chain(s.content.text_fragments()))
        .map(count_words)
        .sum();

    let now = Utc::now();
    DocumentMetadata {
        created_at: now,
        updated_at: now,
        word_count,
        tags: collect_tags(snapshot),
        section_count: sections.len(),
        template_id: template_id.to_string(),
        locale: locale.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snapshot::{ExperienceEntry, SkillEntry};

    #[test]
    fn test_count_words_latin() {
        assert_eq!(count_words("Built 3 services   in Rust"), 5);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_count_words_ideographic() {
        assert_eq!(count_words("张三"), 2);
        assert_eq!(count_words("Rust工程师"), 4);
        assert_eq!(count_words("负责 API 设计"), 5);
    }

    #[test]
    fn test_collect_tags_dedupes_case_insensitively_in_first_seen_order() {
        let snapshot = ContentSnapshot {
            skills: vec![
                SkillEntry {
                    id: "1".into(),
                    name: "Rust".into(),
                    category: Some("Languages".into()),
                    ..Default::default()
                },
                SkillEntry {
                    id: "2".into(),
                    name: "Go".into(),
                    category: Some("Languages".into()),
                    ..Default::default()
                },
            ],
            experience: vec![ExperienceEntry {
                technologies: vec!["rust".into(), "Kafka".into(), " ".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(collect_tags(&snapshot), vec!["Rust", "Languages", "Go", "Kafka"]);
    }
}
