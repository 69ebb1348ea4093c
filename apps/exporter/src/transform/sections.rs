//! Per-section mapping functions.
//!
//! Each mapper returns `Some(StyledSection)` when the snapshot has content for
//! that section type and `None` otherwise. `order` is assigned later by the
//! transformer once empty sections have been dropped.

use crate::layout::Alignment;
use crate::models::snapshot::{non_blank, ContentSnapshot};
use crate::templates::{SectionType, Template};
use crate::transform::types::{
    ContactField, ContactKind, ListItem, PersonalInfoFields, SectionContent, SectionStyle,
    StyledSection,
};
use crate::transform::validation::parse_partial_date;

// ────────────────────────────────────────────────────────────────────────────
// Locale
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Zh,
}

impl Locale {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.to_ascii_lowercase().starts_with("zh") => Locale::Zh,
            _ => Locale::En,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh-CN",
        }
    }

    fn present(self) -> &'static str {
        match self {
            Locale::En => "Present",
            Locale::Zh => "至今",
        }
    }
}

pub fn section_title(section_type: SectionType, locale: Locale) -> &'static str {
    match (section_type, locale) {
        (SectionType::PersonalInfo, Locale::En) => "Personal Information",
        (SectionType::PersonalInfo, Locale::Zh) => "个人信息",
        (SectionType::Summary, Locale::En) => "Summary",
        (SectionType::Summary, Locale::Zh) => "个人简介",
        (SectionType::Experience, Locale::En) => "Experience",
        (SectionType::Experience, Locale::Zh) => "工作经历",
        (SectionType::Education, Locale::En) => "Education",
        (SectionType::Education, Locale::Zh) => "教育背景",
        (SectionType::Skills, Locale::En) => "Skills",
        (SectionType::Skills, Locale::Zh) => "专业技能",
        (SectionType::Projects, Locale::En) => "Projects",
        (SectionType::Projects, Locale::Zh) => "项目经验",
        (SectionType::Languages, Locale::En) => "Languages",
        (SectionType::Languages, Locale::Zh) => "语言能力",
        (SectionType::Certifications, Locale::En) => "Certifications",
        (SectionType::Certifications, Locale::Zh) => "证书资质",
        (SectionType::Awards, Locale::En) => "Awards",
        (SectionType::Awards, Locale::Zh) => "荣誉奖项",
        (SectionType::References, Locale::En) => "References",
        (SectionType::References, Locale::Zh) => "推荐人",
        (SectionType::Custom, Locale::En) => "Additional Information",
        (SectionType::Custom, Locale::Zh) => "其他信息",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dates
// ────────────────────────────────────────────────────────────────────────────

/// `2021-03` → `Mar 2021` (en) / `2021.03` (zh). A bare year stays a year;
/// unparseable input is returned unchanged.
pub fn format_date(raw: &str, locale: Locale) -> String {
    let raw = raw.trim();
    let Some(date) = parse_partial_date(raw) else {
        return raw.to_string();
    };
    if raw.len() == 4 {
        return raw.to_string();
    }
    match locale {
        Locale::En => date.format("%b %Y").to_string(),
        Locale::Zh => date.format("%Y.%m").to_string(),
    }
}

pub fn format_date_range(
    start: Option<&str>,
    end: Option<&str>,
    current: bool,
    locale: Locale,
) -> Option<String> {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());

    let end_label = match (end, current) {
        (_, true) => Some(locale.present().to_string()),
        (Some(e), false) => Some(format_date(e, locale)),
        (None, false) => None,
    };

    match (start, end_label) {
        (Some(s), Some(e)) => Some(format!("{} - {}", format_date(s, locale), e)),
        (Some(s), None) => Some(format_date(s, locale)),
        (None, Some(e)) => Some(e),
        (None, None) => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mapping context
// ────────────────────────────────────────────────────────────────────────────

pub struct SectionMapper<'a> {
    pub snapshot: &'a ContentSnapshot,
    pub template: &'a Template,
    pub locale: Locale,
}

impl<'a> SectionMapper<'a> {
    pub fn new(snapshot: &'a ContentSnapshot, template: &'a Template, locale: Locale) -> Self {
        Self {
            snapshot,
            template,
            locale,
        }
    }

    /// Dispatches to the mapper for `section_type`.
    pub fn map(&self, section_type: SectionType) -> Option<StyledSection> {
        let content = match section_type {
            SectionType::PersonalInfo => self.personal_info(),
            SectionType::Summary => self.summary(),
            SectionType::Experience => self.experience(),
            SectionType::Education => self.education(),
            SectionType::Skills => self.skills(),
            SectionType::Projects => self.projects(),
            SectionType::Languages => self.languages(),
            SectionType::Certifications => self.certifications(),
            SectionType::Awards => self.awards(),
            SectionType::References => self.references(),
            SectionType::Custom => self.custom(),
        }?;
        if content.is_empty() {
            return None;
        }
        Some(self.section(section_type, content, true))
    }

    /// A placeholder for a section with no content, kept on request.
    pub fn empty(&self, section_type: SectionType) -> StyledSection {
        let content = match section_type {
            SectionType::PersonalInfo => SectionContent::PersonalInfo(PersonalInfoFields {
                full_name: String::new(),
                title: None,
                contacts: Vec::new(),
                avatar: None,
            }),
            SectionType::Summary => SectionContent::Text {
                text: String::new(),
            },
            SectionType::Skills => SectionContent::Table {
                headers: self.skill_headers(),
                rows: Vec::new(),
            },
            _ => SectionContent::List { items: Vec::new() },
        };
        self.section(section_type, content, false)
    }

    fn section(
        &self,
        section_type: SectionType,
        content: SectionContent,
        visible: bool,
    ) -> StyledSection {
        let title = match (section_type, &self.snapshot.custom) {
            (SectionType::Custom, Some(custom)) if !custom.title.trim().is_empty() => {
                custom.title.trim().to_string()
            }
            _ => section_title(section_type, self.locale).to_string(),
        };
        StyledSection {
            id: format!("section-{}", section_type.as_str()),
            section_type,
            title,
            content,
            style: self.style_for(section_type),
            visible,
            order: 0,
        }
    }

    fn style_for(&self, section_type: SectionType) -> SectionStyle {
        let style = &self.template.style_config;
        let alignment = if section_type == SectionType::PersonalInfo {
            style.layout.header_alignment
        } else {
            Alignment::Left
        };
        let title_font = if section_type == SectionType::PersonalInfo {
            style.fonts.name.clone()
        } else {
            style.fonts.heading.clone()
        };
        SectionStyle {
            title_font,
            body_font: style.fonts.body.clone(),
            title_color: style.components.section_title.color.clone(),
            text_color: style.colors.text.primary.clone(),
            secondary_color: style.colors.text.secondary.clone(),
            uppercase_title: style.components.section_title.uppercase,
            alignment,
            margin_bottom: style.spacing.section_gap,
        }
    }

    // ── per-type mappers ───────────────────────────────────────────────────

    fn personal_info(&self) -> Option<SectionContent> {
        let info = &self.snapshot.personal_info;
        let mut contacts = Vec::new();
        let mut push = |kind: ContactKind, value: Option<&str>| {
            if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
                contacts.push(ContactField {
                    kind,
                    value: v.to_string(),
                });
            }
        };
        push(ContactKind::Email, Some(info.email.as_str()));
        push(ContactKind::Phone, info.phone.as_deref());
        push(ContactKind::Location, info.location.as_deref());
        push(ContactKind::Website, info.website.as_deref());
        push(ContactKind::Linkedin, info.linkedin.as_deref());
        push(ContactKind::Github, info.github.as_deref());

        Some(SectionContent::PersonalInfo(PersonalInfoFields {
            full_name: info.full_name.trim().to_string(),
            title: non_blank(&info.title).map(str::to_string),
            contacts,
            avatar: non_blank(&info.avatar).map(str::to_string),
        }))
    }

    fn summary(&self) -> Option<SectionContent> {
        non_blank(&self.snapshot.personal_info.summary).map(|text| SectionContent::Text {
            text: text.to_string(),
        })
    }

    fn experience(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .experience
            .iter()
            .map(|e| ListItem {
                title: e.position.trim().to_string(),
                subtitle: Some(e.company.trim().to_string()).filter(|s| !s.is_empty()),
                date_range: format_date_range(
                    Some(e.start_date.as_str()),
                    e.end_date.as_deref(),
                    e.current,
                    self.locale,
                ),
                location: non_blank(&e.location).map(str::to_string),
                description: non_blank(&e.description).map(str::to_string),
                bullets: clean_lines(&e.achievements),
                tags: clean_lines(&e.technologies),
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn education(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .education
            .iter()
            .map(|e| {
                let title = match non_blank(&e.major) {
                    Some(major) => format!("{} · {}", e.degree.trim(), major),
                    None => e.degree.trim().to_string(),
                };
                let mut bullets = Vec::new();
                if let Some(gpa) = non_blank(&e.gpa) {
                    bullets.push(format!("GPA: {gpa}"));
                }
                ListItem {
                    title,
                    subtitle: Some(e.institution.trim().to_string()).filter(|s| !s.is_empty()),
                    date_range: format_date_range(
                        Some(e.start_date.as_str()),
                        e.end_date.as_deref(),
                        false,
                        self.locale,
                    ),
                    location: non_blank(&e.location).map(str::to_string),
                    description: non_blank(&e.description).map(str::to_string),
                    bullets,
                    tags: Vec::new(),
                }
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn skill_headers(&self) -> Vec<String> {
        match self.locale {
            Locale::En => vec!["Skill".into(), "Level".into(), "Category".into()],
            Locale::Zh => vec!["技能".into(), "熟练度".into(), "类别".into()],
        }
    }

    fn skills(&self) -> Option<SectionContent> {
        let rows: Vec<Vec<String>> = self
            .snapshot
            .skills
            .iter()
            .filter(|s| !s.name.trim().is_empty())
            .map(|s| {
                vec![
                    s.name.trim().to_string(),
                    s.level.map(|l| l.label().to_string()).unwrap_or_default(),
                    non_blank(&s.category).unwrap_or_default().to_string(),
                ]
            })
            .collect();
        Some(SectionContent::Table {
            headers: self.skill_headers(),
            rows,
        })
    }

    fn projects(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .projects
            .iter()
            .map(|p| ListItem {
                title: p.name.trim().to_string(),
                subtitle: non_blank(&p.role).map(str::to_string),
                date_range: format_date_range(
                    p.start_date.as_deref(),
                    p.end_date.as_deref(),
                    false,
                    self.locale,
                ),
                location: non_blank(&p.url).map(str::to_string),
                description: non_blank(&p.description).map(str::to_string),
                bullets: clean_lines(&p.highlights),
                tags: clean_lines(&p.technologies),
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn languages(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .languages
            .iter()
            .filter(|l| !l.name.trim().is_empty())
            .map(|l| ListItem {
                title: l.name.trim().to_string(),
                subtitle: non_blank(&l.proficiency).map(str::to_string),
                ..Default::default()
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn certifications(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .certifications
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .map(|c| ListItem {
                title: c.name.trim().to_string(),
                subtitle: non_blank(&c.issuer).map(str::to_string),
                date_range: non_blank(&c.date).map(|d| format_date(d, self.locale)),
                description: non_blank(&c.credential_id).map(|id| format!("ID: {id}")),
                location: non_blank(&c.url).map(str::to_string),
                ..Default::default()
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn awards(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .awards
            .iter()
            .filter(|a| !a.title.trim().is_empty())
            .map(|a| ListItem {
                title: a.title.trim().to_string(),
                subtitle: non_blank(&a.issuer).map(str::to_string),
                date_range: non_blank(&a.date).map(|d| format_date(d, self.locale)),
                description: non_blank(&a.description).map(str::to_string),
                ..Default::default()
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn references(&self) -> Option<SectionContent> {
        let items = self
            .snapshot
            .references
            .iter()
            .filter(|r| !r.name.trim().is_empty())
            .map(|r| {
                let subtitle = match (non_blank(&r.title), non_blank(&r.company)) {
                    (Some(t), Some(c)) => Some(format!("{t}, {c}")),
                    (Some(t), None) => Some(t.to_string()),
                    (None, Some(c)) => Some(c.to_string()),
                    (None, None) => None,
                };
                ListItem {
                    title: r.name.trim().to_string(),
                    subtitle,
                    description: non_blank(&r.relationship).map(str::to_string),
                    location: non_blank(&r.contact).map(str::to_string),
                    ..Default::default()
                }
            })
            .collect();
        Some(SectionContent::List { items })
    }

    fn custom(&self) -> Option<SectionContent> {
        let custom = self.snapshot.custom.as_ref()?;
        let items = clean_lines(&custom.items)
            .into_iter()
            .map(|text| ListItem {
                title: text,
                ..Default::default()
            })
            .collect();
        Some(SectionContent::List { items })
    }
}

fn clean_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
