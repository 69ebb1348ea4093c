//! Render engines: document definition in, artifact bytes out.
//!
//! The engine is a trait so the renderer can be driven by the built-in
//! [`PdfEngine`] in production and by counting or failing mocks in tests.

pub mod compose;
pub mod pdf;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::RenderError;
use crate::export::definition::DocumentDefinition;

use self::compose::Composer;

/// Per-call knobs that are not part of the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub compress: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self { compress: true }
    }
}

#[async_trait]
pub trait RenderEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Renders a definition. Implementations should stop early with
    /// `RenderError::Cancelled` once `cancel` fires.
    async fn render(
        &self,
        definition: Arc<DocumentDefinition>,
        settings: RenderSettings,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, RenderError>;
}

/// PDF engine over the standard-14 fonts. Layout and serialization are CPU
/// bound and run on the blocking pool.
#[derive(Debug, Default, Clone)]
pub struct PdfEngine;

impl PdfEngine {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous layout and serialization.
    pub fn render_sync(
        definition: &DocumentDefinition,
        settings: RenderSettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RenderError> {
        let started = Instant::now();
        let pages = Composer::new(definition).compose(cancel)?;
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        let bytes = pdf::write_pdf(definition, &pages, settings.compress)?;
        debug!(
            pages = pages.len(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PDF rendered"
        );
        Ok(bytes)
    }
}

#[async_trait]
impl RenderEngine for PdfEngine {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn render(
        &self,
        definition: Arc<DocumentDefinition>,
        settings: RenderSettings,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, RenderError> {
        tokio::task::spawn_blocking(move || Self::render_sync(&definition, settings, &cancel))
            .await
            .map_err(|e| RenderError::Worker(format!("spawn_blocking failed in PDF render: {e}")))?
    }
}
