use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exporter::config::Config;
use exporter::export::{
    ExportFormat, ExportManager, ExportOptionsPatch, ExportResult, OutputType, PdfEngine,
};
use exporter::{ContentSnapshot, TemplateRegistry};

/// Render a resume snapshot (JSON) to a PDF or document-definition file.
#[derive(Debug, Parser)]
#[command(name = "exporter", version)]
struct Cli {
    /// Path to the content snapshot JSON.
    snapshot: PathBuf,

    /// Output file or directory. Defaults to the generated filename in the
    /// current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Template id.
    #[arg(short, long)]
    template: Option<String>,

    #[arg(short, long, value_parser = parse_format)]
    format: Option<ExportFormat>,

    /// Payload form written to disk: blob, buffer, base64 or data-url.
    #[arg(long, value_parser = parse_output)]
    output_type: Option<OutputType>,

    /// Locale for section titles and dates, e.g. `zh-CN`.
    #[arg(long)]
    locale: Option<String>,

    /// Keep sections with no content as hidden placeholders.
    #[arg(long)]
    include_empty: bool,

    /// Run through the task queue instead of the direct path.
    #[arg(long = "async")]
    run_async: bool,

    /// Only validate the snapshot and print the findings.
    #[arg(long)]
    validate_only: bool,
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

fn parse_output(s: &str) -> Result<OutputType, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting exporter v{}", env!("CARGO_PKG_VERSION"));

    let raw = tokio::fs::read_to_string(&cli.snapshot)
        .await
        .with_context(|| format!("Failed to read snapshot {}", cli.snapshot.display()))?;
    let snapshot: ContentSnapshot =
        serde_json::from_str(&raw).context("Snapshot is not valid resume JSON")?;

    let registry = Arc::new(TemplateRegistry::with_builtin_templates());
    let manager = ExportManager::new(registry, Arc::new(PdfEngine::new()), config.manager_config());

    let validation = manager.validate_resume_data(&snapshot);
    for issue in validation.errors.iter().chain(&validation.warnings) {
        warn!(code = %issue.code, field = ?issue.field, "{}", issue.message);
    }
    if cli.validate_only {
        println!("{}", serde_json::to_string_pretty(&validation)?);
        return Ok(());
    }

    let patch = ExportOptionsPatch {
        format: cli.format,
        output: cli.output_type,
        template_id: cli.template.clone(),
        locale: cli.locale.clone(),
        include_empty_sections: cli.include_empty.then_some(true),
        ..Default::default()
    };

    let result = if cli.run_async {
        let id = manager.export_pdf_async(snapshot, Some(patch));
        info!(task_id = %id, "Waiting for export task");
        let task = manager.wait_for_task(id).await?;
        task.result
            .with_context(|| format!("Export task {id} finished without a result"))?
    } else {
        manager.export_pdf(&snapshot, Some(patch)).await
    };

    write_result(&result, cli.output).await
}

async fn write_result(result: &ExportResult, output: Option<PathBuf>) -> Result<()> {
    if !result.success {
        for err in &result.errors {
            eprintln!("{}", err.details);
        }
        bail!(
            "Export failed after {} attempt(s) ({})",
            result.attempts,
            result.error_kind().map(|k| k.as_str()).unwrap_or("unknown")
        );
    }

    let (Some(payload), Some(filename)) = (&result.payload, &result.filename) else {
        bail!("Export succeeded without a payload");
    };

    let path = match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path,
        None => PathBuf::from(filename),
    };

    let written = payload
        .write_to(&path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        path = %path.display(),
        bytes = written,
        duration_ms = result.performance.duration_ms,
        "Export written"
    );
    Ok(())
}
