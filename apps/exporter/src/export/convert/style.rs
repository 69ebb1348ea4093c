use std::collections::BTreeMap;

use crate::export::definition::{PageSetup, StyleDef};
use crate::export::options::ExportOptions;
use crate::layout::{page_dimensions, Alignment};
use crate::templates::{FontSpec, Template};

pub const BODY: &str = "body";
pub const NAME: &str = "name";
pub const HEADLINE: &str = "headline";
pub const CONTACT: &str = "contact";
pub const SECTION_TITLE: &str = "sectionTitle";
pub const ITEM_TITLE: &str = "itemTitle";
pub const ITEM_SUBTITLE: &str = "itemSubtitle";
pub const DATE: &str = "date";
pub const PARAGRAPH: &str = "paragraph";
pub const BULLET: &str = "bullet";
pub const TAGS: &str = "tags";
pub const TABLE_HEADER: &str = "tableHeader";
pub const TABLE_CELL: &str = "tableCell";

fn font_style(spec: &FontSpec) -> StyleDef {
    StyleDef {
        font_family: Some(spec.family.clone()),
        font_size: Some(spec.size),
        bold: Some(spec.bold),
        ..Default::default()
    }
}

pub fn default_style(template: &Template) -> StyleDef {
    let style = &template.style_config;
    StyleDef {
        color: Some(style.colors.text.primary.clone()),
        alignment: Some(Alignment::Left),
        line_height: Some(style.spacing.line_height),
        margin_top: Some(0.0),
        margin_bottom: Some(0.0),
        ..font_style(&style.fonts.body)
    }
}

/// Named styles derived from a template's fonts, colors and spacing.
pub fn build_styles(template: &Template) -> BTreeMap<String, StyleDef> {
    let style = &template.style_config;
    let fonts = &style.fonts;
    let colors = &style.colors;
    let spacing = &style.spacing;
    let components = &style.components;
    let header_alignment = Some(style.layout.header_alignment);

    let mut styles = BTreeMap::new();
    styles.insert(BODY.to_string(), font_style(&fonts.body));
    styles.insert(
        NAME.to_string(),
        StyleDef {
            color: Some(colors.primary.clone()),
            alignment: header_alignment,
            margin_bottom: Some(spacing.paragraph_gap),
            ..font_style(&fonts.name)
        },
    );
    styles.insert(
        HEADLINE.to_string(),
        StyleDef {
            color: Some(colors.text.secondary.clone()),
            alignment: header_alignment,
            font_size: Some(fonts.heading.size),
            margin_bottom: Some(spacing.paragraph_gap),
            ..font_style(&fonts.body)
        },
    );
    styles.insert(
        CONTACT.to_string(),
        StyleDef {
            color: Some(colors.text.muted.clone()),
            alignment: header_alignment,
            margin_bottom: Some(spacing.section_gap),
            ..font_style(&fonts.small)
        },
    );
    styles.insert(
        SECTION_TITLE.to_string(),
        StyleDef {
            color: Some(components.section_title.color.clone()),
            margin_top: Some(spacing.section_gap),
            margin_bottom: Some(components.section_title.margin_bottom),
            ..font_style(&fonts.heading)
        },
    );
    styles.insert(
        ITEM_TITLE.to_string(),
        StyleDef {
            bold: Some(true),
            color: Some(colors.text.primary.clone()),
            ..font_style(&fonts.body)
        },
    );
    styles.insert(
        ITEM_SUBTITLE.to_string(),
        StyleDef {
            color: Some(colors.text.secondary.clone()),
            margin_bottom: Some(spacing.paragraph_gap),
            ..font_style(&fonts.body)
        },
    );
    styles.insert(
        DATE.to_string(),
        StyleDef {
            color: Some(components.date_color.clone()),
            alignment: Some(Alignment::Right),
            ..font_style(&fonts.small)
        },
    );
    styles.insert(
        PARAGRAPH.to_string(),
        StyleDef {
            margin_bottom: Some(spacing.paragraph_gap),
            ..font_style(&fonts.body)
        },
    );
    styles.insert(
        BULLET.to_string(),
        StyleDef {
            margin_bottom: Some(spacing.paragraph_gap),
            ..font_style(&fonts.body)
        },
    );
    styles.insert(
        TAGS.to_string(),
        StyleDef {
            color: Some(colors.text.muted.clone()),
            margin_bottom: Some(spacing.item_gap),
            ..font_style(&fonts.small)
        },
    );
    styles.insert(
        TABLE_HEADER.to_string(),
        StyleDef {
            bold: Some(true),
            color: Some(colors.text.primary.clone()),
            ..font_style(&fonts.small)
        },
    );
    styles.insert(TABLE_CELL.to_string(), font_style(&fonts.body));
    styles
}

/// Page setup from the template's layout, overridden by explicit options.
pub fn page_setup(template: &Template, options: &ExportOptions) -> PageSetup {
    let layout = &template.layout_config;
    let size = options.page_size.unwrap_or(layout.page_size);
    let orientation = options.orientation.unwrap_or(layout.orientation);
    let (width, height) = page_dimensions(size, orientation);
    let background = &template.style_config.colors.background.page;

    PageSetup {
        size,
        orientation,
        width,
        height,
        margins: options.margins.unwrap_or(layout.margins),
        background: Some(background.clone()).filter(|c| !is_white(c)),
    }
}

fn is_white(color: &str) -> bool {
    matches!(color.to_ascii_lowercase().as_str(), "#fff" | "#ffffff")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Margins, Orientation, PageSize};
    use crate::templates::builtin;

    #[test]
    fn test_page_setup_uses_template_then_options() {
        let template = builtin::minimal();
        let page = page_setup(&template, &ExportOptions::default());
        assert_eq!(page.size, PageSize::Letter);
        assert_eq!(page.margins, Margins::uniform(60.0));
        assert_eq!(page.background, None);

        let options = ExportOptions {
            page_size: Some(PageSize::A4),
            orientation: Some(Orientation::Landscape),
            margins: Some(Margins::uniform(20.0)),
            ..Default::default()
        };
        let page = page_setup(&template, &options);
        assert_eq!(page.size, PageSize::A4);
        assert!(page.width > page.height);
        assert_eq!(page.content_width(), page.width - 40.0);
    }

    #[test]
    fn test_styles_follow_template_fonts_and_colors() {
        let template = builtin::modern();
        let styles = build_styles(&template);
        let name = &styles[NAME];
        assert_eq!(name.font_size, Some(template.style_config.fonts.name.size));
        assert_eq!(name.color.as_deref(), Some("#2563eb"));
        assert_eq!(name.alignment, Some(Alignment::Center));
        assert_eq!(styles[DATE].alignment, Some(Alignment::Right));
        assert_eq!(styles[ITEM_TITLE].bold, Some(true));
    }
}
