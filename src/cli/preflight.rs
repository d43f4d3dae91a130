//! Pre-flight checks before calling hosted models.
//!
//! Validates that API keys are configured before starting operations that
//! would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, TmsError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Uploading builds the full pipeline and embeds document chunks.
    Upload,
    /// Asking embeds the question and calls the chat model.
    Ask,
    /// Extraction embeds the extraction query and calls the chat model.
    Extract,
    /// The API server answers every kind of request.
    Serve,
    /// Listing and deleting only touch the local store.
    Manage,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Upload | Operation::Ask | Operation::Extract | Operation::Serve => {
            check_api_key(&settings.embedding.api_key_env)?;
            check_api_key(&settings.llm.api_key_env)?;
        }
        Operation::Manage => {}
    }
    Ok(())
}

/// Check that an API key environment variable is set.
fn check_api_key(env_name: &str) -> Result<()> {
    Settings::api_key(env_name).map(|_| ()).map_err(|_| {
        TmsError::Config(format!(
            "{} is not set. Set it with: export {}='...'",
            env_name, env_name
        ))
    })
}
