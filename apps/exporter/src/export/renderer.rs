use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::errors::RenderError;
use crate::export::convert;
use crate::export::definition::DocumentDefinition;
use crate::export::engine::{RenderEngine, RenderSettings};
use crate::export::options::{ExportFormat, ExportOptions, OutputType};

/// The artifact in the output form the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Blob { bytes: Bytes, mime_type: String },
    Base64(String),
    Buffer(Bytes),
    /// `data:<mime>;base64,...`, suitable for an inline preview.
    DataUrl(String),
}

impl ExportPayload {
    pub fn output_type(&self) -> OutputType {
        match self {
            ExportPayload::Blob { .. } => OutputType::Blob,
            ExportPayload::Base64(_) => OutputType::Base64,
            ExportPayload::Buffer(_) => OutputType::Buffer,
            ExportPayload::DataUrl(_) => OutputType::DataUrl,
        }
    }

    /// Length of the payload as handed out (encoded length for text forms).
    pub fn len(&self) -> usize {
        match self {
            ExportPayload::Blob { bytes, .. } | ExportPayload::Buffer(bytes) => bytes.len(),
            ExportPayload::Base64(s) | ExportPayload::DataUrl(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw artifact bytes, decoding the text forms.
    pub fn to_bytes(&self) -> Result<Bytes, RenderError> {
        let decode = |encoded: &str| {
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(Bytes::from)
                .map_err(|e| RenderError::Encoding(e.to_string()))
        };
        match self {
            ExportPayload::Blob { bytes, .. } | ExportPayload::Buffer(bytes) => Ok(bytes.clone()),
            ExportPayload::Base64(s) => decode(s),
            ExportPayload::DataUrl(url) => {
                let (_, encoded) = url
                    .split_once(";base64,")
                    .ok_or_else(|| RenderError::Encoding("malformed data URL".to_string()))?;
                decode(encoded)
            }
        }
    }

    /// Writes the payload as handed out: text forms are stored as text,
    /// binary forms as raw bytes. Returns the number of bytes written.
    pub async fn write_to(&self, path: &Path) -> Result<usize, RenderError> {
        let bytes = match self {
            ExportPayload::Base64(text) | ExportPayload::DataUrl(text) => {
                Bytes::copy_from_slice(text.as_bytes())
            }
            other => other.to_bytes()?,
        };
        tokio::fs::write(path, &bytes).await?;
        Ok(bytes.len())
    }
}

/// Façade over a [`RenderEngine`] that also packages the output.
#[derive(Clone)]
pub struct Renderer {
    engine: Arc<dyn RenderEngine>,
}

impl Renderer {
    pub fn new(engine: Arc<dyn RenderEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub async fn render(
        &self,
        definition: Arc<DocumentDefinition>,
        options: &ExportOptions,
        cancel: CancellationToken,
    ) -> Result<ExportPayload, RenderError> {
        let bytes = match options.format {
            ExportFormat::Pdf => {
                let settings = RenderSettings {
                    compress: options.compress,
                };
                self.engine.render(definition, settings, cancel).await?
            }
            ExportFormat::Json => convert::to_json(&definition)?.into_bytes(),
        };
        if bytes.is_empty() {
            return Err(RenderError::Encoding("engine produced no output".to_string()));
        }
        Ok(package(bytes, options.format.mime_type(), options.output))
    }
}

pub fn package(bytes: Vec<u8>, mime_type: &str, output: OutputType) -> ExportPayload {
    let encode = |b: &[u8]| base64::engine::general_purpose::STANDARD.encode(b);
    match output {
        OutputType::Blob => ExportPayload::Blob {
            bytes: Bytes::from(bytes),
            mime_type: mime_type.to_string(),
        },
        OutputType::Buffer => ExportPayload::Buffer(Bytes::from(bytes)),
        OutputType::Base64 => ExportPayload::Base64(encode(&bytes)),
        OutputType::DataUrl => ExportPayload::DataUrl(format!(
            "data:{mime_type};base64,{}",
            encode(&bytes)
        )),
    }
}
