//! Writes composed pages into a PDF with `lopdf`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::errors::RenderError;
use crate::export::definition::DocumentDefinition;
use crate::export::engine::compose::{DrawOp, Rgb};
use crate::layout::StandardFont;

/// Resource name of the CJK font used for text the standard fonts can't encode.
pub const WIDE_FONT_RESOURCE: &str = "F7";
const WIDE_BASE_FONT: &str = "STSong-Light";
const WIDE_ENCODING: &str = "UniGB-UCS2-H";

fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        '\u{20AC}' => Some(0x80),
        '\u{2026}' => Some(0x85),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        c if (' '..='~').contains(&c) => Some(c as u8),
        c if ('\u{A0}'..='\u{FF}').contains(&c) => Some(c as u32 as u8),
        _ => None,
    }
}

fn ucs2_code(c: char) -> Option<u16> {
    if c.is_control() {
        return None;
    }
    u16::try_from(c as u32).ok()
}

/// Encodes text for the standard fonts' WinAnsi encoding. Characters outside
/// it become `?`.
pub fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

/// True when `c` can be drawn by either the standard fonts or the CJK font.
pub fn is_encodable(c: char) -> bool {
    win_ansi_byte(c).is_some() || ucs2_code(c).is_some()
}

/// A stretch of text drawn with a single font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRun {
    /// WinAnsi bytes for the standard font.
    Standard(Vec<u8>),
    /// Big-endian UCS-2 codes for the CJK font.
    Wide(Vec<u8>),
}

/// Splits `text` into font runs. Characters neither font can draw become a
/// standard-font `?`.
pub fn text_runs(text: &str) -> Vec<TextRun> {
    let mut runs: Vec<TextRun> = Vec::new();
    for c in text.chars() {
        match (win_ansi_byte(c), ucs2_code(c)) {
            (None, Some(code)) => match runs.last_mut() {
                Some(TextRun::Wide(bytes)) => bytes.extend_from_slice(&code.to_be_bytes()),
                _ => runs.push(TextRun::Wide(code.to_be_bytes().to_vec())),
            },
            (byte, _) => {
                let byte = byte.unwrap_or(b'?');
                match runs.last_mut() {
                    Some(TextRun::Standard(bytes)) => bytes.push(byte),
                    _ => runs.push(TextRun::Standard(vec![byte])),
                }
            }
        }
    }
    runs
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![color.0.into(), color.1.into(), color.2.into()]
}

fn operations(ops: &[DrawOp], page_height: f32) -> Vec<Operation> {
    let mut out = Vec::with_capacity(ops.len() * 4);
    for op in ops {
        match op {
            DrawOp::Text {
                x,
                baseline,
                font,
                size,
                color,
                text,
            } => {
                if text.trim().is_empty() {
                    continue;
                }
                out.push(Operation::new("BT", vec![]));
                out.push(Operation::new("rg", color_operands(*color)));
                out.push(Operation::new(
                    "Td",
                    vec![(*x).into(), (page_height - baseline).into()],
                ));
                for run in text_runs(text) {
                    let (resource, string) = match run {
                        TextRun::Standard(bytes) => (
                            font.resource_name(),
                            Object::String(bytes, StringFormat::Literal),
                        ),
                        TextRun::Wide(bytes) => (
                            WIDE_FONT_RESOURCE,
                            Object::String(bytes, StringFormat::Hexadecimal),
                        ),
                    };
                    out.push(Operation::new(
                        "Tf",
                        vec![Object::Name(resource.as_bytes().to_vec()), (*size).into()],
                    ));
                    out.push(Operation::new("Tj", vec![string]));
                }
                out.push(Operation::new("ET", vec![]));
            }
            DrawOp::FillRect {
                x,
                top,
                width,
                height,
                color,
            } => {
                out.push(Operation::new("rg", color_operands(*color)));
                out.push(Operation::new(
                    "re",
                    vec![
                        (*x).into(),
                        (page_height - top - height).into(),
                        (*width).into(),
                        (*height).into(),
                    ],
                ));
                out.push(Operation::new("f", vec![]));
            }
            DrawOp::StrokeRect {
                x,
                top,
                width,
                height,
                color,
            } => {
                out.push(Operation::new("w", vec![0.5_f32.into()]));
                out.push(Operation::new("RG", color_operands(*color)));
                out.push(Operation::new(
                    "re",
                    vec![
                        (*x).into(),
                        (page_height - top - height).into(),
                        (*width).into(),
                        (*height).into(),
                    ],
                ));
                out.push(Operation::new("S", vec![]));
            }
            DrawOp::Line {
                x1,
                x2,
                y,
                thickness,
                color,
            } => {
                let pdf_y = page_height - y;
                out.push(Operation::new("w", vec![(*thickness).into()]));
                out.push(Operation::new("RG", color_operands(*color)));
                out.push(Operation::new("m", vec![(*x1).into(), pdf_y.into()]));
                out.push(Operation::new("l", vec![(*x2).into(), pdf_y.into()]));
                out.push(Operation::new("S", vec![]));
            }
        }
    }
    out
}

fn literal(text: &str) -> Object {
    Object::String(to_win_ansi(text), StringFormat::Literal)
}

/// Info strings holding non-Latin text are written as UTF-16BE with a BOM.
fn text_string(text: &str) -> Object {
    if text.chars().all(|c| win_ansi_byte(c).is_some()) {
        return literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Non-embedded Adobe-GB1 font, resolved by the viewer's CJK font pack.
fn add_wide_font(doc: &mut Document) -> ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => WIDE_BASE_FONT,
        "Flags" => 6,
        "FontBBox" => vec![
            Object::Integer(-25),
            Object::Integer(-254),
            Object::Integer(1000),
            Object::Integer(880),
        ],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 880,
        "StemV" => 93,
    });
    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => WIDE_BASE_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("GB1"),
            "Supplement" => 2,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => WIDE_BASE_FONT,
        "Encoding" => WIDE_ENCODING,
        "DescendantFonts" => vec![Object::Reference(descendant_id)],
    })
}

/// Serializes composed pages. Output is deterministic for identical input.
pub fn write_pdf(
    def: &DocumentDefinition,
    pages: &[Vec<DrawOp>],
    compress: bool,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in StandardFont::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    fonts.set(WIDE_FONT_RESOURCE, add_wide_font(&mut doc));
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let page = &def.page;
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for ops in pages {
        let content = Content {
            operations: operations(ops, page.height),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.0_f32.into(), 0.0_f32.into(), page.width.into(), page.height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info = &def.info;
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&info.title),
        "Author" => text_string(&info.author),
        "Subject" => text_string(&info.subject),
        "Keywords" => text_string(&info.keywords.join(", ")),
        "Producer" => literal("exporter"),
        "CreationDate" => literal(&info.creation_date.format("D:%Y%m%d%H%M%SZ").to_string()),
    });
    doc.trailer.set("Info", info_id);

    if compress {
        doc.compress();
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Layout(format!("PDF serialization failed: {e}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_maps_typographic_marks() {
        assert_eq!(to_win_ansi("a•b"), vec![b'a', 0x95, b'b']);
        assert_eq!(to_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(to_win_ansi("张"), vec![b'?']);
        assert_eq!(to_win_ansi("·"), vec![0xB7]);
    }

    #[test]
    fn test_text_runs_switch_to_wide_font_for_cjk() {
        assert_eq!(
            text_runs("Li 张三!"),
            vec![
                TextRun::Standard(b"Li ".to_vec()),
                TextRun::Wide(vec![0x5F, 0x20, 0x4E, 0x09]),
                TextRun::Standard(b"!".to_vec()),
            ]
        );
        assert_eq!(text_runs("Café"), vec![TextRun::Standard(vec![b'C', b'a', b'f', 0xE9])]);
    }

    #[test]
    fn test_characters_outside_both_fonts_become_question_marks() {
        assert!(!is_encodable('😀'));
        assert!(is_encodable('经'));
        assert!(is_encodable('é'));
        assert_eq!(text_runs("a😀"), vec![TextRun::Standard(b"a?".to_vec())]);
    }

    #[test]
    fn test_info_strings_keep_non_latin_text() {
        assert_eq!(text_string("Ada"), Object::String(b"Ada".to_vec(), StringFormat::Literal));
        assert_eq!(
            text_string("张"),
            Object::String(vec![0xFE, 0xFF, 0x5F, 0x20], StringFormat::Hexadecimal)
        );
    }
}
