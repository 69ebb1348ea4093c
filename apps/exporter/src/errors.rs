use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::transform::types::ValidationIssue;

/// Coarse failure class reported to callers.
///
/// Lets a caller tell "fix your data" (`Validation`) apart from "try again"
/// (`Processing`, `Rendering`, `Output`, `Timeout`) and queue bookkeeping
/// outcomes (`TaskNotFound`, `Cancelled`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Validation,
    Processing,
    Rendering,
    Output,
    Timeout,
    TaskNotFound,
    Cancelled,
}

impl ErrorKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Processing | ErrorKind::Rendering | ErrorKind::Output | ErrorKind::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Processing => "processing",
            ErrorKind::Rendering => "rendering",
            ErrorKind::Output => "output",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TaskNotFound => "task-not-found",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Errors raised while registering or resolving templates.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template '{id}' is invalid: {}", problems.join("; "))]
    Validation { id: String, problems: Vec<String> },

    #[error("Template already registered: {0}")]
    Duplicate(String),

    #[error("Template override could not be applied: {0}")]
    Override(String),
}

/// Errors raised by a render engine or while packaging its output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Layout failed: {0}")]
    Layout(String),

    #[error("PDF write failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Output encoding failed: {0}")]
    Encoding(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Writing export output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Render worker failed: {0}")]
    Worker(String),
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Layout(_) | RenderError::Pdf(_) | RenderError::Worker(_) => {
                ErrorKind::Rendering
            }
            RenderError::Encoding(_) | RenderError::Json(_) | RenderError::Io(_) => {
                ErrorKind::Output
            }
            RenderError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Export-level error. Every failure that reaches an `ExportResult` or an
/// `ExportTask` passes through this type.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Resume data is invalid: {}", summarize(.0))]
    InvalidData(Vec<ValidationIssue>),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Export attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Task cancelled: {0}")]
    Cancelled(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::InvalidData(_) => ErrorKind::Validation,
            ExportError::Template(TemplateError::Validation { .. })
            | ExportError::Template(TemplateError::Override(_)) => ErrorKind::Validation,
            ExportError::Template(_) => ErrorKind::Processing,
            ExportError::Processing(_) => ErrorKind::Processing,
            ExportError::Render(e) => e.kind(),
            ExportError::Timeout(_) => ErrorKind::Timeout,
            ExportError::TaskNotFound(_) => ErrorKind::TaskNotFound,
            ExportError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Full `source()` chain rendered as one line per cause.
    pub fn details(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\ncaused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}
