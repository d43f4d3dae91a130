//! Upload command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the upload command.
pub async fn run_upload(file: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Upload, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let path = Path::new(file);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("Not a file: {}", file))?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", file))?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Processing {}...", filename));

    match orchestrator.ingest(&filename, data).await {
        Ok(result) => {
            spinner.finish_and_clear();
            Output::success(&format!("Uploaded {}", result.filename));
            Output::kv("Document ID", &result.document_id);
            Output::kv("Chunks", &result.num_chunks.to_string());
            Output::kv("Characters", &result.stats.total_characters.to_string());
            Output::kv("Average chunk size", &result.stats.avg_chunk_size.to_string());
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to process {}: {}", filename, e));
            return Err(e.into());
        }
    }

    Ok(())
}
