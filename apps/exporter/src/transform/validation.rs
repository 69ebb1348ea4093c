//! Snapshot validation run before any section mapping.
//!
//! Blocking findings (`Severity::Error`):
//! - `personalInfo.fullName` missing
//! - `personalInfo.email` missing or not an address
//! - `personalInfo.phone` present but not a phone number
//! - experience entries without company / position / start date
//! - education entries without institution / degree / start date
//! - any date that is not `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
//!
//! Non-blocking findings (`Severity::Warning`):
//! - no experience, education or skills recorded
//! - an end date earlier than its start date
//! - a website / profile link that does not look like a URL

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::snapshot::{non_blank, ContentSnapshot};
use crate::transform::types::{codes, Severity, ValidationIssue};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9(][0-9\s\-().]{5,19}$").expect("valid regex"));

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?://)?[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}(:\d+)?(/\S*)?$")
        .expect("valid regex")
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE.is_match(value.trim())
}

pub fn is_valid_url(value: &str) -> bool {
    URL.is_match(value.trim())
}

/// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD` (also with `/` or `.` separators).
/// Missing month/day default to 1.
pub fn parse_partial_date(raw: &str) -> Option<NaiveDate> {
    let normalized = raw.trim().replace(['/', '.'], "-");
    let parts: Vec<&str> = normalized.split('-').collect();
    let year: i32 = parts.first()?.parse().ok()?;
    if parts[0].len() != 4 {
        return None;
    }
    let month: u32 = match parts.get(1) {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.get(2) {
        Some(d) => d.parse().ok()?,
        None => 1,
    };
    if parts.len() > 3 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Findings split into blocking errors and warnings.
#[derive(Debug, Default, Clone)]
pub struct Findings {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl Findings {
    fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    fn require(&mut self, value: &str, field: String, label: &str) {
        if value.trim().is_empty() {
            self.push(ValidationIssue::error(
                codes::REQUIRED_FIELD_MISSING,
                format!("{label} is required"),
                Some(field),
            ));
        }
    }

    fn check_date(&mut self, value: Option<&str>, field: String) -> Option<NaiveDate> {
        let raw = value.map(str::trim).filter(|s| !s.is_empty())?;
        let parsed = parse_partial_date(raw);
        if parsed.is_none() {
            self.push(ValidationIssue::error(
                codes::INVALID_FORMAT,
                format!("'{raw}' is not a valid date (expected YYYY-MM)"),
                Some(field),
            ));
        }
        parsed
    }

    fn check_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>, field: String) {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                self.push(ValidationIssue::warning(
                    codes::DATE_ORDER,
                    "End date is earlier than start date",
                    Some(field),
                ));
            }
        }
    }

    fn check_link(&mut self, value: &Option<String>, field: &str) {
        if let Some(link) = non_blank(value) {
            if !is_valid_url(link) {
                self.push(ValidationIssue::warning(
                    codes::INVALID_URL,
                    format!("'{link}' does not look like a URL"),
                    Some(field.to_string()),
                ));
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a snapshot, collecting every finding.
pub fn validate_snapshot(snapshot: &ContentSnapshot) -> Findings {
    let mut findings = Findings::default();
    let info = &snapshot.personal_info;

    findings.require(&info.full_name, "personalInfo.fullName".into(), "Full name");

    if info.email.trim().is_empty() {
        findings.require(&info.email, "personalInfo.email".into(), "Email");
    } else if !is_valid_email(&info.email) {
        findings.push(ValidationIssue::error(
            codes::INVALID_FORMAT,
            format!("'{}' is not a valid email address", info.email.trim()),
            Some("personalInfo.email".into()),
        ));
    }

    if let Some(phone) = non_blank(&info.phone) {
        if !is_valid_phone(phone) {
            findings.push(ValidationIssue::error(
                codes::INVALID_FORMAT,
                format!("'{phone}' is not a valid phone number"),
                Some("personalInfo.phone".into()),
            ));
        }
    }

    findings.check_link(&info.website, "personalInfo.website");
    findings.check_link(&info.linkedin, "personalInfo.linkedin");
    findings.check_link(&info.github, "personalInfo.github");

    for (i, exp) in snapshot.experience.iter().enumerate() {
        let path = format!("experience[{i}]");
        findings.require(&exp.company, format!("{path}.company"), "Company");
        findings.require(&exp.position, format!("{path}.position"), "Position");
        findings.require(&exp.start_date, format!("{path}.startDate"), "Start date");
        let start = findings.check_date(Some(&exp.start_date), format!("{path}.startDate"));
        let end = findings.check_date(exp.end_date.as_deref(), format!("{path}.endDate"));
        findings.check_range(start, end, format!("{path}.endDate"));
    }

    for (i, edu) in snapshot.education.iter().enumerate() {
        let path = format!("education[{i}]");
        findings.require(&edu.institution, format!("{path}.institution"), "Institution");
        findings.require(&edu.degree, format!("{path}.degree"), "Degree");
        findings.require(&edu.start_date, format!("{path}.startDate"), "Start date");
        let start = findings.check_date(Some(&edu.start_date), format!("{path}.startDate"));
        let end = findings.check_date(edu.end_date.as_deref(), format!("{path}.endDate"));
        findings.check_range(start, end, format!("{path}.endDate"));
    }

    for (i, project) in snapshot.projects.iter().enumerate() {
        let path = format!("projects[{i}]");
        findings.require(&project.name, format!("{path}.name"), "Project name");
        let start = findings.check_date(project.start_date.as_deref(), format!("{path}.startDate"));
        let end = findings.check_date(project.end_date.as_deref(), format!("{path}.endDate"));
        findings.check_range(start, end, format!("{path}.endDate"));
    }

    for (i, skill) in snapshot.skills.iter().enumerate() {
        findings.require(&skill.name, format!("skills[{i}].name"), "Skill name");
    }

    if snapshot.experience.is_empty() {
        findings.push(ValidationIssue::warning(
            codes::NO_EXPERIENCE,
            "No work experience recorded",
            Some("experience".into()),
        ));
    }
    if snapshot.education.is_empty() {
        findings.push(ValidationIssue::warning(
            codes::NO_EDUCATION,
            "No education recorded",
            Some("education".into()),
        ));
    }
    if snapshot.skills.is_empty() {
        findings.push(ValidationIssue::warning(
            codes::NO_SKILLS,
            "No skills recorded",
            Some("skills".into()),
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snapshot::{EducationEntry, ExperienceEntry, PersonalInfo};

    fn valid_snapshot() -> ContentSnapshot {
        ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn fields(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().filter_map(|i| i.field.as_deref()).collect()
    }

    #[test]
    fn test_email_patterns() {
        assert!(is_valid_email("zhangsan@example.com"));
        assert!(is_valid_email(" a.b+c@sub.example.co.uk "));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn test_phone_patterns() {
        assert!(is_valid_phone("+86 138-0000-0000"));
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone("12"));
    }

    #[test]
    fn test_url_patterns() {
        assert!(is_valid_url("https://github.com/ada"));
        assert!(is_valid_url("linkedin.com/in/ada"));
        assert!(!is_valid_url("my site"));
    }

    #[test]
    fn test_parse_partial_date() {
        assert_eq!(parse_partial_date("2021"), NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(parse_partial_date("2021-03"), NaiveDate::from_ymd_opt(2021, 3, 1));
        assert_eq!(parse_partial_date("2021/03/15"), NaiveDate::from_ymd_opt(2021, 3, 15));
        assert_eq!(parse_partial_date("2021.3"), NaiveDate::from_ymd_opt(2021, 3, 1));
        assert_eq!(parse_partial_date("2021-13"), None);
        assert_eq!(parse_partial_date("21-03"), None);
        assert_eq!(parse_partial_date("March 2021"), None);
    }

    #[test]
    fn test_minimal_snapshot_passes_with_warnings() {
        let findings = validate_snapshot(&valid_snapshot());
        assert!(findings.is_valid());
        let codes: Vec<&str> = findings.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(codes, vec!["NO_EXPERIENCE", "NO_EDUCATION", "NO_SKILLS"]);
    }

    #[test]
    fn test_missing_name_and_bad_email_reference_exact_paths() {
        let mut snapshot = valid_snapshot();
        snapshot.personal_info.full_name = "  ".into();
        snapshot.personal_info.email = "nope".into();
        let findings = validate_snapshot(&snapshot);
        assert!(!findings.is_valid());
        assert_eq!(
            fields(&findings.errors),
            vec!["personalInfo.fullName", "personalInfo.email"]
        );
        assert_eq!(findings.errors[1].code, "INVALID_FORMAT");
    }

    #[test]
    fn test_missing_email_is_required_error() {
        let mut snapshot = valid_snapshot();
        snapshot.personal_info.email.clear();
        let findings = validate_snapshot(&snapshot);
        assert_eq!(findings.errors[0].code, "REQUIRED_FIELD_MISSING");
        assert_eq!(findings.errors[0].field.as_deref(), Some("personalInfo.email"));
    }

    #[test]
    fn test_experience_entry_required_fields() {
        let mut snapshot = valid_snapshot();
        snapshot.experience.push(ExperienceEntry {
            id: "e1".into(),
            position: "Engineer".into(),
            ..Default::default()
        });
        let findings = validate_snapshot(&snapshot);
        assert_eq!(
            fields(&findings.errors),
            vec!["experience[0].company", "experience[0].startDate"]
        );
    }

    #[test]
    fn test_invalid_date_is_blocking() {
        let mut snapshot = valid_snapshot();
        snapshot.education.push(EducationEntry {
            id: "ed1".into(),
            institution: "MIT".into(),
            degree: "BSc".into(),
            start_date: "Fall 2019".into(),
            ..Default::default()
        });
        let findings = validate_snapshot(&snapshot);
        assert_eq!(fields(&findings.errors), vec!["education[0].startDate"]);
    }

    #[test]
    fn test_reversed_dates_only_warn() {
        let mut snapshot = valid_snapshot();
        snapshot.experience.push(ExperienceEntry {
            id: "e1".into(),
            company: "Acme".into(),
            position: "Engineer".into(),
            start_date: "2022-05".into(),
            end_date: Some("2021-01".into()),
            ..Default::default()
        });
        let findings = validate_snapshot(&snapshot);
        assert!(findings.is_valid());
        assert!(findings.warnings.iter().any(|w| w.code == "DATE_ORDER"));
    }

    #[test]
    fn test_bad_phone_blocks_bad_website_warns() {
        let mut snapshot = valid_snapshot();
        snapshot.personal_info.phone = Some("ring ring".into());
        snapshot.personal_info.website = Some("not a url".into());
        let findings = validate_snapshot(&snapshot);
        assert_eq!(fields(&findings.errors), vec!["personalInfo.phone"]);
        assert!(findings
            .warnings
            .iter()
            .any(|w| w.field.as_deref() == Some("personalInfo.website")));
    }
}
