//! Chat completions over an OpenAI-compatible API (Groq by default).

use super::CompletionModel;
use crate::config::LlmSettings;
use crate::error::{Result, TmsError};
use crate::openai::{create_client_with_timeout, map_error};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Completion model backed by a hosted chat completions endpoint.
pub struct ChatCompletionModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl ChatCompletionModel {
    /// Create a model from settings, reading the API key from the environment.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = crate::config::Settings::api_key(&settings.api_key_env)?;
        let client = create_client_with_timeout(
            &settings.api_base,
            &api_key,
            Duration::from_secs(settings.timeout_seconds),
        )?;

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    /// Create a model with an explicit client.
    pub fn with_client(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.0,
        }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| TmsError::Generation(e.to_string()))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TmsError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| map_error(e, TmsError::Generation))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TmsError::Generation("Empty response from model".to_string()))?
            .message
            .content
            .unwrap_or_default();

        debug!("Model replied with {} characters", answer.len());
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
