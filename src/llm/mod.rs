//! Completion models used to answer questions and extract shipment data.

mod openai;

pub use openai::ChatCompletionModel;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Send a single prompt and return the model's reply.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Name of the underlying model.
    fn model_name(&self) -> &str;
}
