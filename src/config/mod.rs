//! Configuration module for TMS AI.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ExtractionPrompts, Prompts, RagPrompts, NOT_FOUND_SENTINEL};
pub use settings::{
    ChunkingSettings, ConfidenceSettings, EmbeddingSettings, GeneralSettings, LlmSettings,
    PromptSettings, RetrievalSettings, RetrySettings, ServerSettings, Settings, UploadSettings,
    VectorStoreSettings,
};
