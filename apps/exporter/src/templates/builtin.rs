//! Built-in templates shipped with the exporter.

use crate::layout::{Alignment, Margins, Orientation, PageSize};
use crate::templates::{
    BackgroundColors, BorderColors, ColorConfig, ComponentStyles, FontConfig, FontSpec,
    LayoutConfig, LayoutStyle, SectionTitleStyle, SectionType, SpacingConfig, StyleConfig,
    Template, TextColors,
};

pub const DEFAULT_TEMPLATE_ID: &str = "modern";

fn font(family: &str, size: f32, bold: bool) -> FontSpec {
    FontSpec {
        family: family.to_string(),
        size,
        bold,
    }
}

fn full_order() -> Vec<SectionType> {
    vec![
        SectionType::PersonalInfo,
        SectionType::Summary,
        SectionType::Experience,
        SectionType::Education,
        SectionType::Skills,
        SectionType::Projects,
        SectionType::Certifications,
        SectionType::Awards,
        SectionType::Languages,
        SectionType::References,
        SectionType::Custom,
    ]
}

/// Sans-serif, blue accents, centered header.
pub fn modern() -> Template {
    Template {
        id: "modern".to_string(),
        name: "Modern".to_string(),
        description: "Clean sans-serif layout with a blue accent and centered header".to_string(),
        style_config: StyleConfig {
            fonts: FontConfig {
                name: font("Inter", 22.0, true),
                heading: font("Inter", 13.0, true),
                body: font("Inter", 10.0, false),
                small: font("Inter", 8.5, false),
            },
            colors: ColorConfig {
                primary: "#2563eb".to_string(),
                accent: "#3b82f6".to_string(),
                text: TextColors {
                    primary: "#111827".to_string(),
                    secondary: "#374151".to_string(),
                    muted: "#6b7280".to_string(),
                },
                background: BackgroundColors {
                    page: "#ffffff".to_string(),
                    header: "#ffffff".to_string(),
                    section: "#ffffff".to_string(),
                },
                border: BorderColors {
                    light: "#e5e7eb".to_string(),
                    strong: "#2563eb".to_string(),
                },
            },
            spacing: SpacingConfig {
                section_gap: 14.0,
                item_gap: 8.0,
                paragraph_gap: 3.0,
                line_height: 1.3,
            },
            layout: LayoutStyle {
                header_alignment: Alignment::Center,
                show_avatar: false,
                title_column_percent: 70.0,
            },
            components: ComponentStyles {
                section_title: SectionTitleStyle {
                    uppercase: true,
                    color: "#2563eb".to_string(),
                    margin_bottom: 6.0,
                },
                contact_separator: " | ".to_string(),
                date_color: "#6b7280".to_string(),
                table_header_fill: "#eff6ff".to_string(),
            },
        },
        layout_config: LayoutConfig {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margins: Margins::uniform(40.0),
        },
        section_order: full_order(),
    }
}

/// Serif, black and white, education before experience.
pub fn classic() -> Template {
    let mut t = modern();
    t.id = "classic".to_string();
    t.name = "Classic".to_string();
    t.description = "Traditional serif layout suited to academic and formal applications".to_string();
    t.style_config.fonts = FontConfig {
        name: font("Times New Roman", 20.0, true),
        heading: font("Times New Roman", 12.5, true),
        body: font("Times New Roman", 10.5, false),
        small: font("Times New Roman", 9.0, false),
    };
    t.style_config.colors.primary = "#000000".to_string();
    t.style_config.colors.accent = "#333333".to_string();
    t.style_config.colors.border.strong = "#000000".to_string();
    t.style_config.components.section_title.color = "#000000".to_string();
    t.style_config.components.table_header_fill = "#f3f4f6".to_string();
    t.style_config.spacing.line_height = 1.25;
    t.layout_config.margins = Margins::uniform(54.0);
    t.section_order = vec![
        SectionType::PersonalInfo,
        SectionType::Summary,
        SectionType::Education,
        SectionType::Experience,
        SectionType::Projects,
        SectionType::Skills,
        SectionType::Awards,
        SectionType::Certifications,
        SectionType::Languages,
        SectionType::References,
        SectionType::Custom,
    ];
    t
}

/// Left-aligned header, muted palette, no references.
pub fn minimal() -> Template {
    let mut t = modern();
    t.id = "minimal".to_string();
    t.name = "Minimal".to_string();
    t.description = "Understated single-column layout with generous whitespace".to_string();
    t.style_config.fonts.name = font("Helvetica", 20.0, false);
    t.style_config.fonts.heading = font("Helvetica", 11.0, true);
    t.style_config.colors.primary = "#111827".to_string();
    t.style_config.colors.accent = "#9ca3af".to_string();
    t.style_config.components.section_title.uppercase = false;
    t.style_config.components.section_title.color = "#111827".to_string();
    t.style_config.components.contact_separator = "  ·  ".to_string();
    t.style_config.layout.header_alignment = Alignment::Left;
    t.style_config.spacing.section_gap = 18.0;
    t.layout_config.page_size = PageSize::Letter;
    t.layout_config.margins = Margins::uniform(60.0);
    t.section_order = vec![
        SectionType::PersonalInfo,
        SectionType::Summary,
        SectionType::Experience,
        SectionType::Projects,
        SectionType::Education,
        SectionType::Skills,
    ];
    t
}

/// Dense corporate layout with a dark teal accent and avatar slot.
pub fn professional() -> Template {
    let mut t = modern();
    t.id = "professional".to_string();
    t.name = "Professional".to_string();
    t.description = "Compact corporate layout with a photo slot and teal accents".to_string();
    t.style_config.fonts.name = font("Helvetica", 24.0, true);
    t.style_config.fonts.body = font("Helvetica", 9.5, false);
    t.style_config.colors.primary = "#0f766e".to_string();
    t.style_config.colors.accent = "#14b8a6".to_string();
    t.style_config.colors.background.header = "#f0fdfa".to_string();
    t.style_config.colors.border.strong = "#0f766e".to_string();
    t.style_config.components.section_title.color = "#0f766e".to_string();
    t.style_config.components.table_header_fill = "#ccfbf1".to_string();
    t.style_config.layout.show_avatar = true;
    t.style_config.layout.header_alignment = Alignment::Left;
    t.style_config.layout.title_column_percent = 75.0;
    t.style_config.spacing.section_gap = 10.0;
    t.style_config.spacing.item_gap = 6.0;
    t.layout_config.margins = Margins {
        top: 36.0,
        right: 42.0,
        bottom: 36.0,
        left: 42.0,
    };
    t
}

pub fn all() -> Vec<Template> {
    vec![modern(), classic(), minimal(), professional()]
}
