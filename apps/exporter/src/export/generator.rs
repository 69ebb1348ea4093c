//! Generator façade: validate → transform → convert → render.
//!
//! [`Generator::generate`] is the fallible core the manager retries;
//! [`Generator::generate_pdf`] wraps one attempt into the standard
//! [`ExportResult`] shape.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ErrorKind, ExportError};
use crate::export::convert::convert_document;
use crate::export::engine::pdf::is_encodable;
use crate::export::engine::RenderEngine;
use crate::export::options::{ExportFormat, ExportOptions};
use crate::export::renderer::{ExportPayload, Renderer};
use crate::models::snapshot::ContentSnapshot;
use crate::templates::TemplateRegistry;
use crate::transform::types::{codes, StyledDocument, ValidationIssue};
use crate::transform::validation::is_valid_email;
use crate::transform::{transform, TransformOptions};

// ────────────────────────────────────────────────────────────────────────────
// Result shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValidation {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// One failure as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportIssue {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The error and its causes, one per line.
    pub details: String,
}

impl ExportIssue {
    /// Validation failures expand into one issue per offending field.
    pub fn from_error(err: &ExportError) -> Vec<ExportIssue> {
        match err {
            ExportError::InvalidData(issues) => issues
                .iter()
                .map(|i| ExportIssue {
                    kind: ErrorKind::Validation,
                    message: i.message.clone(),
                    field: i.field.clone(),
                    details: format!("{}: {}", i.code, i.message),
                })
                .collect(),
            other => vec![ExportIssue {
                kind: other.kind(),
                message: other.to_string(),
                field: None,
                details: other.details(),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: u64,
}

impl Performance {
    pub fn measure(start: DateTime<Utc>, started: Instant) -> Self {
        Self {
            start,
            end: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub success: bool,
    pub payload: Option<ExportPayload>,
    pub filename: Option<String>,
    pub errors: Vec<ExportIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub performance: Performance,
    pub attempts: u32,
    /// True when served from the export cache without rendering.
    pub cached: bool,
}

impl ExportResult {
    pub fn succeeded(artifact: Artifact, performance: Performance, attempts: u32) -> Self {
        Self {
            success: true,
            payload: Some(artifact.payload),
            filename: Some(artifact.filename),
            errors: Vec::new(),
            warnings: artifact.warnings,
            performance,
            attempts,
            cached: false,
        }
    }

    pub fn failed(err: &ExportError, performance: Performance, attempts: u32) -> Self {
        Self {
            success: false,
            payload: None,
            filename: None,
            errors: ExportIssue::from_error(err),
            warnings: Vec::new(),
            performance,
            attempts,
            cached: false,
        }
    }

    /// The kind of the first reported error, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.errors.first().map(|e| e.kind)
    }
}

/// A successful generation before it is wrapped into a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub payload: ExportPayload,
    pub filename: String,
    pub warnings: Vec<ValidationIssue>,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Generator {
    registry: Arc<TemplateRegistry>,
    renderer: Renderer,
}

impl Generator {
    pub fn new(registry: Arc<TemplateRegistry>, engine: Arc<dyn RenderEngine>) -> Self {
        Self {
            registry,
            renderer: Renderer::new(engine),
        }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Export-time checks. A missing name or a missing/invalid email blocks;
    /// an empty work history only warns.
    pub fn validate_data(&self, snapshot: &ContentSnapshot) -> DataValidation {
        let info = &snapshot.personal_info;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if info.full_name.trim().is_empty() {
            errors.push(ValidationIssue::error(
                codes::REQUIRED_FIELD_MISSING,
                "Full name is required",
                Some("personalInfo.fullName".into()),
            ));
        }
        if info.email.trim().is_empty() {
            errors.push(ValidationIssue::error(
                codes::REQUIRED_FIELD_MISSING,
                "Email is required",
                Some("personalInfo.email".into()),
            ));
        } else if !is_valid_email(&info.email) {
            errors.push(ValidationIssue::error(
                codes::INVALID_FORMAT,
                "Email address is not valid",
                Some("personalInfo.email".into()),
            ));
        }
        if snapshot.experience.is_empty() {
            warnings.push(ValidationIssue::warning(
                codes::NO_EXPERIENCE,
                "No work experience recorded",
                Some("experience".into()),
            ));
        }

        DataValidation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// One full generation attempt.
    pub async fn generate(
        &self,
        snapshot: &ContentSnapshot,
        options: &ExportOptions,
        cancel: CancellationToken,
    ) -> Result<Artifact, ExportError> {
        let check = self.validate_data(snapshot);
        if !check.is_valid {
            return Err(ExportError::InvalidData(check.errors));
        }

        let template = self.registry.get(&options.template_id)?;
        let mut transform_options = TransformOptions::new(template);
        transform_options.include_empty_sections = options.include_empty_sections;
        transform_options.locale = options.locale.clone();

        let transformed = transform(snapshot, &transform_options);
        let document = match transformed.data {
            Some(doc) if transformed.success => doc,
            _ => return Err(ExportError::InvalidData(transformed.errors)),
        };

        let definition = Arc::new(convert_document(&document, options));
        debug!(
            template_id = %options.template_id,
            nodes = definition.content.len(),
            engine = self.renderer.engine_name(),
            "Document converted"
        );

        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled("cancelled before render".to_string()));
        }
        let payload = self.renderer.render(definition, options, cancel).await?;

        let mut warnings = check.warnings;
        if options.format == ExportFormat::Pdf {
            warnings.extend(unsupported_glyphs(&document));
        }
        for w in transformed.warnings {
            if !warnings.iter().any(|e| e.code == w.code && e.field == w.field) {
                warnings.push(w);
            }
        }

        Ok(Artifact {
            payload,
            filename: export_filename(&snapshot.personal_info.full_name, options, Utc::now()),
            warnings,
        })
    }

    /// A single attempt wrapped into an [`ExportResult`].
    pub async fn generate_pdf(
        &self,
        snapshot: &ContentSnapshot,
        options: &ExportOptions,
        cancel: CancellationToken,
    ) -> ExportResult {
        let start = Utc::now();
        let started = Instant::now();
        match self.generate(snapshot, options, cancel).await {
            Ok(artifact) => {
                let perf = Performance::measure(start, started);
                info!(
                    filename = %artifact.filename,
                    bytes = artifact.payload.len(),
                    duration_ms = perf.duration_ms,
                    "Export generated"
                );
                ExportResult::succeeded(artifact, perf, 1)
            }
            Err(e) => {
                warn!(kind = e.kind().as_str(), "Export failed: {e}");
                ExportResult::failed(&e, Performance::measure(start, started), 1)
            }
        }
    }
}

/// One warning per visible section holding characters the PDF fonts can't
/// draw. Those characters are written as `?`.
fn unsupported_glyphs(document: &StyledDocument) -> Vec<ValidationIssue> {
    document
        .sections
        .iter()
        .filter(|section| section.visible)
        .filter_map(|section| {
            let mut missing: Vec<char> = Vec::new();
            let fragments = std::iter::once(section.title.as_str())
                .chain(section.content.text_fragments());
            for c in fragments.flat_map(str::chars) {
                if !c.is_whitespace() && !is_encodable(c) && !missing.contains(&c) {
                    missing.push(c);
                }
            }
            if missing.is_empty() {
                return None;
            }
            warn!(section = %section.id, count = missing.len(), "Unsupported glyphs in section");
            Some(ValidationIssue::warning(
                codes::UNSUPPORTED_GLYPHS,
                format!(
                    "Characters {} cannot be drawn by the PDF fonts and are shown as '?'",
                    missing.iter().collect::<String>()
                ),
                Some(format!("sections.{}", section.id)),
            ))
        })
        .collect()
}

/// `<name>_resume_<YYYYMMDD>.<ext>`. Characters other than letters, digits,
/// `-` and `_` are dropped; whitespace becomes `_`.
pub fn export_filename(full_name: &str, options: &ExportOptions, now: DateTime<Utc>) -> String {
    let mut stem = String::new();
    for c in full_name.trim().chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            stem.push(c);
        } else if c.is_whitespace() && !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { "export" } else { stem };
    format!(
        "{stem}_resume_{}.{}",
        now.format("%Y%m%d"),
        options.format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RenderError;
    use crate::export::definition::DocumentDefinition;
    use crate::export::engine::{PdfEngine, RenderSettings};
    use crate::export::options::{ExportFormat, OutputType};
    use crate::models::snapshot::PersonalInfo;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct BrokenEngine;

    #[async_trait]
    impl RenderEngine for BrokenEngine {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn render(
            &self,
            _definition: Arc<DocumentDefinition>,
            _settings: RenderSettings,
            _cancel: CancellationToken,
        ) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Layout("boom".into()))
        }
    }

    fn generator(engine: Arc<dyn RenderEngine>) -> Generator {
        Generator::new(Arc::new(TemplateRegistry::with_builtin_templates()), engine)
    }

    fn snapshot() -> ContentSnapshot {
        ContentSnapshot {
            personal_info: PersonalInfo {
                full_name: "Zhang San".into(),
                email: "zhangsan@example.com".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_filename_sanitizes_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let opts = ExportOptions::default();
        assert_eq!(
            export_filename("  Zhang  San ", &opts, now),
            "Zhang_San_resume_20240309.pdf"
        );
        assert_eq!(export_filename("张三", &opts, now), "张三_resume_20240309.pdf");
        assert_eq!(export_filename("<>/", &opts, now), "export_resume_20240309.pdf");
        let json = ExportOptions {
            format: ExportFormat::Json,
            ..Default::default()
        };
        assert_eq!(export_filename("A B", &json, now), "A_B_resume_20240309.json");
    }

    #[test]
    fn test_validate_data_blocks_on_bad_email_and_warns_on_no_experience() {
        let gen = generator(Arc::new(PdfEngine::new()));
        let mut s = snapshot();
        s.personal_info.email = "not-an-email".into();
        let check = gen.validate_data(&s);
        assert!(!check.is_valid);
        assert_eq!(check.errors[0].code, codes::INVALID_FORMAT);
        assert_eq!(check.warnings[0].code, codes::NO_EXPERIENCE);
    }

    #[tokio::test]
    async fn test_generate_pdf_success() {
        let gen = generator(Arc::new(PdfEngine::new()));
        let result = gen
            .generate_pdf(&snapshot(), &ExportOptions::default(), CancellationToken::new())
            .await;
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.attempts, 1);
        assert!(result.filename.unwrap().starts_with("Zhang_San_resume_"));
        let bytes = result.payload.unwrap().to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(result.warnings.iter().any(|w| w.code == codes::NO_EXPERIENCE));
        assert_eq!(
            result
                .warnings
                .iter()
                .filter(|w| w.code == codes::NO_EXPERIENCE)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_generate_pdf_reports_validation_errors_with_fields() {
        let gen = generator(Arc::new(PdfEngine::new()));
        let mut s = snapshot();
        s.personal_info.full_name = String::new();
        let result = gen
            .generate_pdf(&s, &ExportOptions::default(), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(result.errors[0].field.as_deref(), Some("personalInfo.fullName"));
    }

    #[tokio::test]
    async fn test_generate_pdf_reports_rendering_errors() {
        let gen = generator(Arc::new(BrokenEngine));
        let result = gen
            .generate_pdf(&snapshot(), &ExportOptions::default(), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::Rendering));
        assert!(result.errors[0].message.contains("boom"));
    }

    #[tokio::test]
    async fn test_unknown_template_is_processing_error() {
        let gen = generator(Arc::new(PdfEngine::new()));
        let opts = ExportOptions {
            template_id: "nope".into(),
            ..Default::default()
        };
        let result = gen
            .generate_pdf(&snapshot(), &opts, CancellationToken::new())
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Processing));
    }

    #[tokio::test]
    async fn test_chinese_text_exports_without_glyph_warning() {
        let gen = generator(Arc::new(PdfEngine::new()));
        let mut s = snapshot();
        s.personal_info.full_name = "张三".into();
        s.personal_info.summary = Some("资深工程师".into());
        let opts = ExportOptions {
            locale: Some("zh-CN".into()),
            ..Default::default()
        };
        let result = gen.generate_pdf(&s, &opts, CancellationToken::new()).await;
        assert!(result.success, "{:?}", result.errors);
        assert!(!result.warnings.iter().any(|w| w.code == codes::UNSUPPORTED_GLYPHS));
    }

    #[tokio::test]
    async fn test_undrawable_characters_raise_warning() {
        let gen = generator(Arc::new(PdfEngine::new()));
        let mut s = snapshot();
        s.personal_info.summary = Some("Ships fast 🚀🚀".into());
        let result = gen
            .generate_pdf(&s, &ExportOptions::default(), CancellationToken::new())
            .await;
        assert!(result.success, "{:?}", result.errors);
        let warning = result
            .warnings
            .iter()
            .find(|w| w.code == codes::UNSUPPORTED_GLYPHS)
            .expect("glyph warning");
        assert!(warning.message.contains('🚀'));
        assert_eq!(warning.message.matches('🚀').count(), 1);
        assert!(warning.field.as_deref().unwrap().starts_with("sections."));
    }

    #[tokio::test]
    async fn test_json_format_emits_definition() {
        let gen = generator(Arc::new(BrokenEngine));
        let opts = ExportOptions {
            format: ExportFormat::Json,
            output: OutputType::Buffer,
            ..Default::default()
        };
        let result = gen
            .generate_pdf(&snapshot(), &opts, CancellationToken::new())
            .await;
        assert!(result.success);
        let bytes = result.payload.unwrap().to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["info"]["author"], "Zhang San");
    }
}
