use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::layout::{Margins, Orientation, PageSize};
use crate::templates::builtin::DEFAULT_TEMPLATE_ID;
use crate::templates::SectionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    /// The document definition itself, as pretty-printed JSON.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported format '{other}'")),
        }
    }
}

/// Shape of the payload handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    Blob,
    Base64,
    Buffer,
    DataUrl,
}

impl OutputType {
    pub const ALL: [OutputType; 4] = [
        OutputType::Blob,
        OutputType::Base64,
        OutputType::Buffer,
        OutputType::DataUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputType::Blob => "blob",
            OutputType::Base64 => "base64",
            OutputType::Buffer => "buffer",
            OutputType::DataUrl => "data-url",
        }
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputType::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported output type '{s}'"))
    }
}

/// Fully-resolved options for one export.
///
/// `page_size`, `orientation` and `margins` fall back to the template's
/// `layoutConfig` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub page_size: Option<PageSize>,
    pub orientation: Option<Orientation>,
    pub margins: Option<Margins>,
    pub output: OutputType,
    pub compress: bool,
    pub template_id: String,
    pub include_empty_sections: bool,
    pub locale: Option<String>,
    pub page_break_before: Vec<SectionType>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Pdf,
            page_size: None,
            orientation: None,
            margins: None,
            output: OutputType::Blob,
            compress: true,
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            include_empty_sections: false,
            locale: None,
            page_break_before: Vec::new(),
            title: None,
            author: None,
        }
    }
}

impl ExportOptions {
    /// Layers a partial override on top of these options.
    pub fn merged(&self, patch: &ExportOptionsPatch) -> ExportOptions {
        let mut out = self.clone();
        if let Some(v) = patch.format {
            out.format = v;
        }
        if let Some(v) = patch.page_size {
            out.page_size = Some(v);
        }
        if let Some(v) = patch.orientation {
            out.orientation = Some(v);
        }
        if let Some(v) = patch.margins {
            out.margins = Some(v);
        }
        if let Some(v) = patch.output {
            out.output = v;
        }
        if let Some(v) = patch.compress {
            out.compress = v;
        }
        if let Some(v) = &patch.template_id {
            out.template_id = v.clone();
        }
        if let Some(v) = patch.include_empty_sections {
            out.include_empty_sections = v;
        }
        if let Some(v) = &patch.locale {
            out.locale = Some(v.clone());
        }
        if let Some(v) = &patch.page_break_before {
            out.page_break_before = v.clone();
        }
        if let Some(v) = &patch.title {
            out.title = Some(v.clone());
        }
        if let Some(v) = &patch.author {
            out.author = Some(v.clone());
        }
        out
    }
}

/// Caller-supplied subset of [`ExportOptions`]; unset fields keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptionsPatch {
    pub format: Option<ExportFormat>,
    pub page_size: Option<PageSize>,
    pub orientation: Option<Orientation>,
    pub margins: Option<Margins>,
    pub output: Option<OutputType>,
    pub compress: Option<bool>,
    pub template_id: Option<String>,
    pub include_empty_sections: Option<bool>,
    pub locale: Option<String>,
    pub page_break_before: Option<Vec<SectionType>>,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Values a caller may choose from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedOptions {
    pub formats: Vec<ExportFormat>,
    pub page_sizes: Vec<PageSize>,
    pub orientations: Vec<Orientation>,
    pub outputs: Vec<OutputType>,
    pub templates: Vec<String>,
    pub section_types: Vec<SectionType>,
}

impl SupportedOptions {
    pub fn new(templates: Vec<String>) -> Self {
        Self {
            formats: vec![ExportFormat::Pdf, ExportFormat::Json],
            page_sizes: PageSize::ALL.to_vec(),
            orientations: vec![Orientation::Portrait, Orientation::Landscape],
            outputs: OutputType::ALL.to_vec(),
            templates,
            section_types: SectionType::ALL.to_vec(),
        }
    }
}
