//! Delete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::DocumentLibrary;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(document_id: &str, settings: Settings) -> Result<()> {
    let library = DocumentLibrary::open(&settings)?;

    match library.delete(document_id).await {
        Ok(removed) => {
            Output::success(&format!(
                "Deleted document {} ({} chunks removed)",
                document_id, removed
            ));
        }
        Err(e) => {
            Output::error(&format!("Failed to delete document: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
