//! Section converters: one styled section in, a handful of content nodes out.

use crate::export::convert::style::{
    BULLET, CONTACT, DATE, HEADLINE, ITEM_SUBTITLE, ITEM_TITLE, NAME, PARAGRAPH, SECTION_TITLE,
    TABLE_CELL, TABLE_HEADER, TAGS,
};
use crate::export::definition::{
    Column, ColumnWidth, ColumnsNode, ContentNode, ImageNode, ListNode, RuleNode, StackNode,
    StyleDef, TableCell, TableNode, TextNode, TextRun,
};
use crate::templates::{SectionType, Template};
use crate::transform::types::{ListItem, PersonalInfoFields, SectionContent, StyledSection};

const AVATAR_SIZE: f32 = 64.0;

pub struct SectionConverter<'a> {
    template: &'a Template,
}

impl<'a> SectionConverter<'a> {
    pub fn new(template: &'a Template) -> Self {
        Self { template }
    }

    pub fn convert(&self, section: &StyledSection) -> Vec<ContentNode> {
        match (&section.content, section.section_type) {
            (SectionContent::PersonalInfo(fields), _) => self.personal_info(fields),
            (SectionContent::Text { text }, _) => {
                let mut nodes = self.title(section);
                nodes.push(ContentNode::Text(TextNode::plain(text.trim(), PARAGRAPH)));
                nodes
            }
            (SectionContent::Table { headers, rows }, SectionType::Skills) => {
                let mut nodes = self.title(section);
                nodes.push(self.skills(headers, rows));
                nodes
            }
            (SectionContent::Table { headers, rows }, _) => {
                let mut nodes = self.title(section);
                nodes.push(self.table(headers, rows));
                nodes
            }
            (
                SectionContent::List { items },
                SectionType::Experience | SectionType::Education | SectionType::Projects,
            ) => {
                let mut nodes = self.title(section);
                nodes.extend(items.iter().map(|item| self.timeline_entry(item)));
                nodes
            }
            (SectionContent::List { items }, SectionType::Custom) => {
                let mut nodes = self.title(section);
                nodes.push(ContentNode::List(ListNode {
                    ordered: false,
                    items: items.iter().map(|i| vec![TextRun::plain(&i.title)]).collect(),
                    styles: vec![BULLET.to_string()],
                }));
                nodes
            }
            (SectionContent::List { items }, _) => {
                let mut nodes = self.title(section);
                nodes.extend(items.iter().map(|item| self.simple_entry(item)));
                nodes
            }
        }
    }

    fn title(&self, section: &StyledSection) -> Vec<ContentNode> {
        let title = if section.style.uppercase_title {
            section.title.to_uppercase()
        } else {
            section.title.clone()
        };
        vec![
            ContentNode::Text(TextNode::plain(title, SECTION_TITLE)),
            ContentNode::Rule(RuleNode {
                color: self.template.style_config.colors.border.strong.clone(),
                thickness: 0.75,
                margin_bottom: self.template.style_config.spacing.item_gap,
            }),
        ]
    }

    fn personal_info(&self, fields: &PersonalInfoFields) -> Vec<ContentNode> {
        let layout = &self.template.style_config.layout;
        let mut nodes = Vec::new();

        if layout.show_avatar {
            if let Some(avatar) = &fields.avatar {
                nodes.push(ContentNode::Image(ImageNode {
                    source: avatar.clone(),
                    width: AVATAR_SIZE,
                    height: AVATAR_SIZE,
                    alignment: layout.header_alignment,
                }));
            }
        }

        nodes.push(ContentNode::Text(TextNode::plain(&fields.full_name, NAME)));
        if let Some(title) = &fields.title {
            nodes.push(ContentNode::Text(TextNode::plain(title, HEADLINE)));
        }
        if !fields.contacts.is_empty() {
            let separator = &self.template.style_config.components.contact_separator;
            let line = fields
                .contacts
                .iter()
                .map(|c| c.value.as_str())
                .collect::<Vec<_>>()
                .join(separator);
            nodes.push(ContentNode::Text(TextNode::plain(line, CONTACT)));
        }
        nodes
    }

    /// Title vs. date range on one row, then subtitle, paragraph, bullets and tags.
    fn timeline_entry(&self, item: &ListItem) -> ContentNode {
        let spacing = &self.template.style_config.spacing;
        let mut items = vec![self.heading_row(item)];

        let subtitle = [item.subtitle.as_deref(), item.location.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" | ");
        if !subtitle.is_empty() {
            items.push(ContentNode::Text(TextNode::plain(subtitle, ITEM_SUBTITLE)));
        }
        if let Some(description) = &item.description {
            items.push(ContentNode::Text(TextNode::plain(description, PARAGRAPH)));
        }
        if !item.bullets.is_empty() {
            items.push(ContentNode::List(ListNode {
                ordered: false,
                items: item.bullets.iter().map(|b| vec![TextRun::plain(b)]).collect(),
                styles: vec![BULLET.to_string()],
            }));
        }
        if !item.tags.is_empty() {
            items.push(ContentNode::Text(TextNode::plain(item.tags.join(", "), TAGS)));
        }

        ContentNode::Stack(StackNode {
            items,
            margin_bottom: spacing.item_gap,
        })
    }

    fn heading_row(&self, item: &ListItem) -> ContentNode {
        let title = ContentNode::Text(TextNode::plain(&item.title, ITEM_TITLE));
        match &item.date_range {
            Some(range) => ContentNode::Columns(ColumnsNode {
                columns: vec![
                    Column {
                        width: ColumnWidth::Percent(
                            self.template.style_config.layout.title_column_percent,
                        ),
                        content: vec![title],
                    },
                    Column {
                        width: ColumnWidth::Star,
                        content: vec![ContentNode::Text(TextNode::plain(range, DATE))],
                    },
                ],
                gap: 8.0,
            }),
            None => title,
        }
    }

    /// One paragraph per entry: bold title, then the secondary parts inline.
    fn simple_entry(&self, item: &ListItem) -> ContentNode {
        let muted = self.template.style_config.colors.text.muted.clone();
        let mut runs = vec![TextRun::bold(&item.title)];
        if let Some(subtitle) = &item.subtitle {
            runs.push(TextRun::plain(format!(" ({subtitle})")));
        }
        if let Some(date) = &item.date_range {
            runs.push(TextRun {
                text: format!(", {date}"),
                styles: Vec::new(),
                overrides: Some(StyleDef {
                    color: Some(muted.clone()),
                    ..Default::default()
                }),
            });
        }
        for extra in [&item.description, &item.location].into_iter().flatten() {
            runs.push(TextRun {
                text: format!(" - {extra}"),
                styles: Vec::new(),
                overrides: Some(StyleDef {
                    color: Some(muted.clone()),
                    ..Default::default()
                }),
            });
        }
        ContentNode::Text(TextNode::with_runs(runs, PARAGRAPH))
    }

    /// Skills grouped under their category when more than one category is in
    /// use; a plain table otherwise.
    fn skills(&self, headers: &[String], rows: &[Vec<String>]) -> ContentNode {
        let mut categories: Vec<&str> = Vec::new();
        for row in rows {
            let category = row.get(2).map(String::as_str).unwrap_or_default();
            if !category.is_empty() && !categories.contains(&category) {
                categories.push(category);
            }
        }

        if categories.len() <= 1 {
            return self.table(headers, rows);
        }

        let uncategorized: Vec<&Vec<String>> = rows
            .iter()
            .filter(|r| r.get(2).map_or(true, |c| c.is_empty()))
            .collect();

        let mut items: Vec<ContentNode> = categories
            .iter()
            .map(|category| {
                let names = rows
                    .iter()
                    .filter(|r| r.get(2).map(String::as_str) == Some(*category))
                    .map(skill_label)
                    .collect::<Vec<_>>()
                    .join(", ");
                ContentNode::Text(TextNode::with_runs(
                    vec![TextRun::bold(format!("{category}: ")), TextRun::plain(names)],
                    PARAGRAPH,
                ))
            })
            .collect();
        if !uncategorized.is_empty() {
            let names = uncategorized
                .into_iter()
                .map(skill_label)
                .collect::<Vec<_>>()
                .join(", ");
            items.push(ContentNode::Text(TextNode::plain(names, PARAGRAPH)));
        }

        ContentNode::Stack(StackNode {
            items,
            margin_bottom: 0.0,
        })
    }

    fn table(&self, headers: &[String], rows: &[Vec<String>]) -> ContentNode {
        let fill = self
            .template
            .style_config
            .components
            .table_header_fill
            .clone();
        let header = headers
            .iter()
            .map(|h| TableCell {
                text: h.clone(),
                styles: vec![TABLE_HEADER.to_string()],
                fill: Some(fill.clone()),
            })
            .collect();
        let mut body: Vec<Vec<TableCell>> = vec![header];
        body.extend(rows.iter().map(|row| {
            row.iter()
                .map(|cell| TableCell {
                    text: cell.clone(),
                    styles: vec![TABLE_CELL.to_string()],
                    fill: None,
                })
                .collect()
        }));

        let mut widths = vec![ColumnWidth::Star; headers.len()];
        if let Some(first) = widths.first_mut() {
            *first = ColumnWidth::Percent(40.0);
        }

        ContentNode::Table(TableNode {
            header_rows: 1,
            widths,
            body,
            cell_padding: 4.0,
            border_color: Some(self.template.style_config.colors.border.light.clone()),
        })
    }
}

fn skill_label(row: &Vec<String>) -> String {
    match row.get(1).filter(|l| !l.is_empty()) {
        Some(level) => format!("{} ({})", row[0], level),
        None => row[0].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::builtin;
    use crate::transform::sections::{Locale, SectionMapper};
    use crate::models::snapshot::{ContentSnapshot, PersonalInfo, SkillEntry};

    fn skill(name: &str, category: Option<&str>) -> SkillEntry {
        SkillEntry {
            id: name.into(),
            name: name.into(),
            level: None,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_personal_info_contact_line_uses_separator() {
        let template = builtin::modern();
        let snapshot = ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Ada".into(),
                email: "ada@example.com".into(),
                phone: Some("+44 20 7946 0000".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let section = SectionMapper::new(&snapshot, &template, Locale::En)
            .map(SectionType::PersonalInfo)
            .unwrap();
        let nodes = SectionConverter::new(&template).convert(&section);
        assert_eq!(nodes.len(), 2);
        let ContentNode::Text(contact) = &nodes[1] else {
            panic!("expected text node");
        };
        let separator = &template.style_config.components.contact_separator;
        assert_eq!(
            contact.runs[0].text,
            format!("ada@example.com{separator}+44 20 7946 0000")
        );
    }

    #[test]
    fn test_skills_single_category_renders_table() {
        let template = builtin::modern();
        let snapshot = ContentSnapshot {
            skills: vec![skill("Rust", Some("Lang")), skill("Go", None)],
            ..Default::default()
        };
        let section = SectionMapper::new(&snapshot, &template, Locale::En)
            .map(SectionType::Skills)
            .unwrap();
        let nodes = SectionConverter::new(&template).convert(&section);
        let ContentNode::Table(table) = nodes.last().unwrap() else {
            panic!("expected table");
        };
        assert_eq!(table.header_rows, 1);
        assert_eq!(table.body.len(), 3);
        assert_eq!(table.body[0][0].fill.as_deref(), Some(template.style_config.components.table_header_fill.as_str()));
    }

    #[test]
    fn test_skills_grouped_when_several_categories() {
        let template = builtin::modern();
        let snapshot = ContentSnapshot {
            skills: vec![
                skill("Rust", Some("Languages")),
                skill("Postgres", Some("Data")),
                skill("Go", Some("Languages")),
                skill("Vim", None),
            ],
            ..Default::default()
        };
        let section = SectionMapper::new(&snapshot, &template, Locale::En)
            .map(SectionType::Skills)
            .unwrap();
        let nodes = SectionConverter::new(&template).convert(&section);
        let ContentNode::Stack(stack) = nodes.last().unwrap() else {
            panic!("expected stack");
        };
        assert_eq!(stack.items.len(), 3);
        let ContentNode::Text(first) = &stack.items[0] else {
            panic!("expected text");
        };
        assert_eq!(first.runs[0].text, "Languages: ");
        assert_eq!(first.runs[1].text, "Rust, Go");
    }
}
