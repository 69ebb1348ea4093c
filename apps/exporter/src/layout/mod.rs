// Page geometry shared by templates, converters and the PDF engine.

pub mod font_metrics;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use font_metrics::{get_metrics, FontMetricTable, StandardFont};

/// Paper sizes accepted by the export options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    A3,
    A4,
    Letter,
    Legal,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [PageSize::A4, PageSize::A3, PageSize::Letter, PageSize::Legal];

    /// Portrait width and height in PDF points (1/72 in).
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageSize::A3 => "A3",
            PageSize::A4 => "A4",
            PageSize::Letter => "Letter",
            PageSize::Legal => "Legal",
        };
        f.write_str(name)
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a3" => Ok(PageSize::A3),
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            other => Err(format!("unsupported page size '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!("unsupported orientation '{other}'")),
        }
    }
}

/// Page width and height in points for a size/orientation pair.
pub fn page_dimensions(size: PageSize, orientation: Orientation) -> (f32, f32) {
    let (w, h) = size.dimensions_pt();
    match orientation {
        Orientation::Portrait => (w, h),
        Orientation::Landscape => (h, w),
    }
}

/// Margins in points, clockwise from the top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn uniform(v: f32) -> Self {
        Margins {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub const fn zero() -> Self {
        Margins::uniform(0.0)
    }

    pub fn is_non_negative(&self) -> bool {
        self.top >= 0.0 && self.right >= 0.0 && self.bottom >= 0.0 && self.left >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}
