//! Extract command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the extract command.
pub async fn run_extract(document_id: &str, json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Extract, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Extracting shipment data...");
    let result = orchestrator.extract(document_id).await;
    spinner.finish_and_clear();

    let data = match result {
        Ok(data) => data,
        Err(e) => {
            Output::error(&format!("Failed to extract shipment data: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    Output::header("Shipment Data");
    for (field, value) in data.fields() {
        Output::kv(field, value.unwrap_or("-"));
    }

    if data.is_empty() {
        println!();
        Output::warning("No shipment fields could be extracted from this document.");
    }

    Ok(())
}
