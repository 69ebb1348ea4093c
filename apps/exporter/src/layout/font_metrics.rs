//! Static font-metric tables for the PDF standard fonts used by the built-in engine.
//!
//! Character widths are in em units (relative to font size), taken from the
//! Adobe core-font AFM files and rounded to two decimals. Bold and serif cuts are
//! close enough to their regular siblings that a small table per family keeps
//! wrapping within a percent or two of what a viewer draws.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Standard font enum
// ────────────────────────────────────────────────────────────────────────────

/// The PDF standard-14 faces the engine can reference without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

impl StandardFont {
    pub const ALL: [StandardFont; 6] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::Courier,
        StandardFont::CourierBold,
    ];

    /// Maps a template font family name onto a standard face.
    ///
    /// Unknown families fall back to Helvetica; templates may name web fonts
    /// the engine cannot embed.
    pub fn resolve(family: &str, bold: bool) -> Self {
        let family = family.to_ascii_lowercase();
        let serif = family.contains("times")
            || family.contains("garamond")
            || family.contains("georgia")
            || (family.contains("serif") && !family.contains("sans"));
        let mono = family.contains("courier") || family.contains("mono");
        match (mono, serif, bold) {
            (true, _, false) => StandardFont::Courier,
            (true, _, true) => StandardFont::CourierBold,
            (false, true, false) => StandardFont::TimesRoman,
            (false, true, true) => StandardFont::TimesBold,
            (false, false, false) => StandardFont::Helvetica,
            (false, false, true) => StandardFont::HelveticaBold,
        }
    }

    /// The `/BaseFont` name written into the PDF font dictionary.
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
        }
    }

    /// Resource name used inside content streams (`/F1` .. `/F6`).
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::HelveticaBold => "F2",
            StandardFont::TimesRoman => "F3",
            StandardFont::TimesBold => "F4",
            StandardFont::Courier => "F5",
            StandardFont::CourierBold => "F6",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a font.
///
/// `widths[i]` = width of ASCII character `(i + 32)`, covering 0x20 (space) through 0x7E (~).
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for Latin-1 and other non-ASCII characters.
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    ///
    /// Ideographic characters count as one full em; other non-ASCII characters
    /// fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    fn char_width(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else if is_ideographic(c) {
            1.0
        } else {
            self.average_char_width
        }
    }

    /// Greedy word-wrap of `text` into lines no wider than `max_width_em`.
    ///
    /// Whitespace-separated words wrap as units; a word wider than the line
    /// (including runs of ideographic text, which has no spaces) is broken
    /// between characters.
    pub fn wrap(&self, text: &str, max_width_em: f32) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in text.split_whitespace() {
            let word_w = self.measure_str(word);
            let space_w = if current.is_empty() {
                0.0
            } else {
                self.space_width
            };

            if current_width + space_w + word_w <= max_width_em {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width += space_w + word_w;
                continue;
            }

            if word_w <= max_width_em {
                // Word fits on a fresh line.
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.push_str(word);
                current_width = word_w;
                continue;
            }

            // Oversized word: fill the current line character by character.
            if !current.is_empty() {
                current.push(' ');
                current_width += self.space_width;
            }
            for c in word.chars() {
                let w = self.char_width(c);
                if current_width + w > max_width_em && !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current).trim_end().to_string());
                    current_width = 0.0;
                }
                current.push(c);
                current_width += w;
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// CJK ideographs, kana and hangul syllables.
pub fn is_ideographic(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF   // hiragana, katakana
        | 0x3400..=0x4DBF // CJK extension A
        | 0x4E00..=0x9FFF // CJK unified ideographs
        | 0xAC00..=0xD7AF // hangul syllables
        | 0xF900..=0xFAFF // CJK compatibility ideographs
        | 0x20000..=0x2A6DF)
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.28, 0.28, 0.36, 0.56, 0.56, 0.89, 0.67, 0.19, 0.33, 0.33, 0.39, 0.58, 0.28, 0.33, 0.28, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.58, 0.58, 0.58, 0.56, 1.02,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.67, 0.67, 0.72, 0.72, 0.67, 0.61, 0.78, 0.72, 0.28, 0.50, 0.67, 0.56, 0.83,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.78, 0.67, 0.78, 0.72, 0.67, 0.61, 0.72, 0.67, 0.94, 0.67, 0.67, 0.61,
        // [     \     ]     ^     _     `
        0.28, 0.28, 0.28, 0.47, 0.56, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.56, 0.56, 0.50, 0.56, 0.56, 0.28, 0.56, 0.56, 0.22, 0.22, 0.50, 0.22, 0.83,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.56, 0.56, 0.56, 0.56, 0.33, 0.50, 0.28, 0.56, 0.50, 0.72, 0.50, 0.50, 0.50,
        // {     |     }     ~
        0.33, 0.26, 0.33, 0.58,
    ],
    average_char_width: 0.56,
    space_width: 0.28,
};

static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.28, 0.33, 0.47, 0.56, 0.56, 0.89, 0.72, 0.24, 0.33, 0.33, 0.39, 0.58, 0.28, 0.33, 0.28, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // :     ;     <     =     >     ?     @
        0.33, 0.33, 0.58, 0.58, 0.58, 0.61, 0.98,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.72, 0.72, 0.72, 0.72, 0.67, 0.61, 0.78, 0.72, 0.28, 0.56, 0.72, 0.61, 0.83,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.78, 0.67, 0.78, 0.72, 0.67, 0.61, 0.72, 0.67, 0.94, 0.67, 0.67, 0.61,
        // [     \     ]     ^     _     `
        0.33, 0.28, 0.33, 0.58, 0.56, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.56, 0.61, 0.56, 0.61, 0.56, 0.33, 0.61, 0.61, 0.28, 0.28, 0.56, 0.28, 0.89,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.61, 0.61, 0.61, 0.61, 0.39, 0.56, 0.33, 0.61, 0.56, 0.78, 0.56, 0.56, 0.50,
        // {     |     }     ~
        0.39, 0.28, 0.39, 0.58,
    ],
    average_char_width: 0.59,
    space_width: 0.28,
};

static TIMES_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.25, 0.33, 0.41, 0.50, 0.50, 0.83, 0.78, 0.18, 0.33, 0.33, 0.50, 0.56, 0.25, 0.33, 0.25, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.56, 0.56, 0.56, 0.44, 0.92,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.72, 0.67, 0.67, 0.72, 0.61, 0.56, 0.72, 0.72, 0.33, 0.39, 0.72, 0.61, 0.89,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.72, 0.56, 0.72, 0.67, 0.56, 0.61, 0.72, 0.72, 0.94, 0.72, 0.72, 0.61,
        // [     \     ]     ^     _     `
        0.33, 0.28, 0.33, 0.47, 0.50, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.44, 0.50, 0.44, 0.50, 0.44, 0.33, 0.50, 0.50, 0.28, 0.28, 0.50, 0.28, 0.78,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.50, 0.50, 0.50, 0.50, 0.33, 0.39, 0.28, 0.50, 0.50, 0.72, 0.50, 0.50, 0.44,
        // {     |     }     ~
        0.48, 0.20, 0.48, 0.54,
    ],
    average_char_width: 0.48,
    space_width: 0.25,
};

static TIMES_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.25, 0.33, 0.56, 0.50, 0.50, 1.00, 0.83, 0.28, 0.33, 0.33, 0.50, 0.57, 0.25, 0.33, 0.25, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50,
        // :     ;     <     =     >     ?     @
        0.33, 0.33, 0.57, 0.57, 0.57, 0.50, 0.93,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.72, 0.67, 0.72, 0.72, 0.67, 0.61, 0.78, 0.78, 0.39, 0.50, 0.78, 0.67, 0.94,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.78, 0.61, 0.78, 0.72, 0.56, 0.67, 0.72, 0.72, 1.00, 0.72, 0.72, 0.67,
        // [     \     ]     ^     _     `
        0.33, 0.28, 0.33, 0.58, 0.50, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.50, 0.56, 0.44, 0.56, 0.44, 0.33, 0.50, 0.56, 0.28, 0.33, 0.56, 0.28, 0.83,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.56, 0.50, 0.56, 0.56, 0.44, 0.39, 0.33, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
        // {     |     }     ~
        0.39, 0.22, 0.39, 0.52,
    ],
    average_char_width: 0.52,
    space_width: 0.25,
};

/// Courier is monospaced: every glyph is 0.6em.
static COURIER_TABLE: FontMetricTable = FontMetricTable {
    widths: [0.60; 95],
    average_char_width: 0.60,
    space_width: 0.60,
};

/// Returns the static metric table for a given standard font.
pub fn get_metrics(font: StandardFont) -> &'static FontMetricTable {
    match font {
        StandardFont::Helvetica => &HELVETICA_TABLE,
        StandardFont::HelveticaBold => &HELVETICA_BOLD_TABLE,
        StandardFont::TimesRoman => &TIMES_TABLE,
        StandardFont::TimesBold => &TIMES_BOLD_TABLE,
        StandardFont::Courier | StandardFont::CourierBold => &COURIER_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
