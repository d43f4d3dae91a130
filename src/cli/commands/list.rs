//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::DocumentLibrary;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let library = DocumentLibrary::open(&settings)?;

    match library.list_documents().await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info("No documents uploaded yet. Use 'tms-ai upload <file>' to add one.");
            } else {
                Output::header(&format!("Uploaded Documents ({})", documents.len()));
                println!();

                for doc in &documents {
                    Output::document_info(
                        &doc.filename,
                        &doc.document_id,
                        doc.num_chunks,
                        &doc.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }

                let total_chunks: u32 = documents.iter().map(|d| d.num_chunks).sum();
                println!();
                Output::kv("Total documents", &documents.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
