//! Export pipeline: converters, render engines, the generator façade, the
//! task queue and the caching manager on top.

pub mod cache;
pub mod convert;
pub mod definition;
pub mod engine;
pub mod generator;
pub mod manager;
pub mod options;
pub mod queue;
pub mod renderer;

pub use cache::{cache_key, CacheStats, ExportCache};
pub use convert::convert_document;
pub use definition::{ContentNode, DocumentDefinition};
pub use engine::{PdfEngine, RenderEngine, RenderSettings};
pub use generator::{Artifact, DataValidation, ExportIssue, ExportResult, Generator, Performance};
pub use manager::{ExportManager, ManagerConfig, ManagerConfigUpdate};
pub use options::{ExportFormat, ExportOptions, ExportOptionsPatch, OutputType, SupportedOptions};
pub use queue::{ExportQueue, ExportTask, QueueStatus, RetryPolicy, TaskStatus};
pub use renderer::{ExportPayload, Renderer};
