//! Clients for OpenAI-compatible provider APIs.

use crate::error::{Result, TmsError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for provider requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create a client for an OpenAI-compatible API at `api_base`.
pub fn create_client(api_base: &str, api_key: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_base, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom request timeout.
///
/// The built-in backoff of `async-openai` is disabled; retries are driven by
/// [`crate::retry::RetryPolicy`] so every provider call follows one schedule.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    let no_backoff = backoff::ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    };

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_backoff))
}

/// Map an `async-openai` error onto the crate error taxonomy.
pub fn map_error(err: async_openai::error::OpenAIError, fallback: fn(String) -> TmsError) -> TmsError {
    use async_openai::error::OpenAIError;

    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => TmsError::Timeout(e.to_string()),
        OpenAIError::Reqwest(e) if e.is_connect() => TmsError::Http(e),
        OpenAIError::Reqwest(e) => {
            if let Some(status) = e.status() {
                match status.as_u16() {
                    429 => return TmsError::RateLimited(e.to_string()),
                    503 => return TmsError::ServiceUnavailable(e.to_string()),
                    _ => {}
                }
            }
            TmsError::from_api_message(e.to_string(), fallback)
        }
        other => TmsError::from_api_message(other.to_string(), fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::OpenAIError;

    #[test]
    fn test_map_api_error_rate_limit() {
        let err = OpenAIError::StreamError("429 Too Many Requests: rate limit reached".to_string());
        assert!(matches!(map_error(err, TmsError::Generation), TmsError::RateLimited(_)));
    }

    #[test]
    fn test_map_api_error_permanent() {
        let err = OpenAIError::InvalidArgument("missing model".to_string());
        assert!(matches!(map_error(err, TmsError::Embedding), TmsError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_retriable() {
        // Reserve a port, then close it so the connection is refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/v1/models", addr))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_connect());

        let mapped = map_error(OpenAIError::Reqwest(err), TmsError::Generation);
        assert!(matches!(mapped, TmsError::Http(_)));
        assert!(mapped.is_retriable());
    }

    #[test]
    fn test_create_client() {
        assert!(create_client("https://api.groq.com/openai/v1/", "test-key").is_ok());
    }
}
