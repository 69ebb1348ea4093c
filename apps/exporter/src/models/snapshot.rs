//! Content snapshot: the immutable resume data handed to the export core.
//!
//! Field names follow the editing layer's camelCase wire shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    /// Headline shown under the name, e.g. "Senior Backend Engineer".
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Image reference (URL or data URI). Never fetched by the core.
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    pub id: String,
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: Option<String>,
    pub achievements: Vec<String>,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub major: Option<String>,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub gpa: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub fn label(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Expert => "Expert",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillEntry {
    pub id: String,
    pub name: String,
    pub level: Option<SkillLevel>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub url: Option<String>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageEntry {
    pub name: String,
    pub proficiency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: Option<String>,
    pub date: Option<String>,
    pub credential_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwardEntry {
    pub title: String,
    pub issuer: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceEntry {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub relationship: Option<String>,
}

/// Free-form block rendered by the `custom` section type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomSection {
    pub title: String,
    pub items: Vec<String>,
}

/// The full resume snapshot accepted by `transform` and the export entry points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSnapshot {
    pub personal_info: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
    pub projects: Vec<ProjectEntry>,
    pub languages: Vec<LanguageEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub awards: Vec<AwardEntry>,
    pub references: Vec<ReferenceEntry>,
    pub custom: Option<CustomSection>,
}

/// Returns the trimmed value when it carries any text.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_deserializes_camel_case_with_missing_collections() {
        let json = serde_json::json!({
            "personalInfo": { "fullName": "张三", "email": "zhangsan@example.com" },
            "experience": [],
            "education": [],
            "skills": [],
            "projects": []
        });
        let snapshot: ContentSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.personal_info.full_name, "张三");
        assert!(snapshot.languages.is_empty());
        assert!(snapshot.custom.is_none());
    }

    #[test]
    fn test_skill_level_lowercase() {
        let skill: SkillEntry =
            serde_json::from_str(r#"{"id":"s1","name":"Rust","level":"expert"}"#).unwrap();
        assert_eq!(skill.level, Some(SkillLevel::Expert));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(&Some("  x ".into())), Some("x"));
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&None), None);
    }
}
