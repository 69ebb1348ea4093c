//! Resume export core: snapshot → styled document → document definition →
//! PDF (or JSON), behind a caching, retrying, bounded-concurrency manager.

pub mod config;
pub mod errors;
pub mod export;
pub mod layout;
pub mod models;
pub mod templates;
pub mod transform;

pub use errors::{ErrorKind, ExportError, RenderError, TemplateError};
pub use export::{ExportManager, ExportOptions, ExportResult, ManagerConfig, PdfEngine};
pub use models::ContentSnapshot;
pub use templates::{Template, TemplateRegistry};
pub use transform::{transform, TransformOptions, TransformResult};
