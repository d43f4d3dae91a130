//! Error types for TMS AI.

use thiserror::Error;

/// Library-level error type for TMS AI operations.
#[derive(Error, Debug)]
pub enum TmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Token limit exceeded: {0}")]
    TokenLimit(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to parse document {filename}: {reason}")]
    DocumentParse { filename: String, reason: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TmsError {
    /// Whether the failure is transient and the call may be retried.
    pub fn is_retriable(&self) -> bool {
        match self {
            TmsError::RateLimited(_)
            | TmsError::TokenLimit(_)
            | TmsError::ServiceUnavailable(_)
            | TmsError::Timeout(_) => true,
            TmsError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Classify an error message returned by a hosted model provider.
    ///
    /// Messages mentioning rate limits, token limits, service outages or
    /// timeouts map to the retriable variants; anything else is wrapped
    /// with `fallback`.
    pub fn from_api_message(message: impl Into<String>, fallback: fn(String) -> TmsError) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("rate limit") || lower.contains("429") {
            TmsError::RateLimited(message)
        } else if lower.contains("token limit") || lower.contains("tokens") {
            TmsError::TokenLimit(message)
        } else if lower.contains("503") || lower.contains("service unavailable") {
            TmsError::ServiceUnavailable(message)
        } else if lower.contains("timeout") || lower.contains("timed out") {
            TmsError::Timeout(message)
        } else {
            fallback(message)
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TmsError::Config(_) => "ConfigError",
            TmsError::Embedding(_) => "EmbeddingError",
            TmsError::Generation(_) => "GenerationError",
            TmsError::VectorStore(_) => "VectorStoreError",
            TmsError::Extraction(_) => "ExtractionError",
            TmsError::RateLimited(_) => "RateLimitError",
            TmsError::TokenLimit(_) => "TokenLimitError",
            TmsError::ServiceUnavailable(_) => "ServiceUnavailableError",
            TmsError::Timeout(_) => "TimeoutError",
            TmsError::Io(_) => "IoError",
            TmsError::Json(_) => "JsonError",
            TmsError::TomlParse(_) => "TomlError",
            TmsError::Http(_) => "HttpError",
            TmsError::Database(_) => "DatabaseError",
            TmsError::DocumentParse { .. } => "DocumentParseError",
            TmsError::UnsupportedFileType(_) => "UnsupportedFileType",
            TmsError::FileTooLarge { .. } => "FileTooLarge",
            TmsError::DocumentNotFound(_) => "DocumentNotFound",
            TmsError::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Result type alias for TMS AI operations.
pub type Result<T> = std::result::Result<T, TmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_api_messages() {
        let e = TmsError::from_api_message("HTTP 429 Too Many Requests", TmsError::Generation);
        assert!(matches!(e, TmsError::RateLimited(_)));

        let e = TmsError::from_api_message("Rate limit reached for model", TmsError::Generation);
        assert!(matches!(e, TmsError::RateLimited(_)));

        let e = TmsError::from_api_message("Request too large: 9000 tokens", TmsError::Generation);
        assert!(matches!(e, TmsError::TokenLimit(_)));

        let e = TmsError::from_api_message("503 Service Unavailable", TmsError::Embedding);
        assert!(matches!(e, TmsError::ServiceUnavailable(_)));

        let e = TmsError::from_api_message("operation timed out", TmsError::Embedding);
        assert!(matches!(e, TmsError::Timeout(_)));

        let e = TmsError::from_api_message("invalid api key", TmsError::Embedding);
        assert!(matches!(e, TmsError::Embedding(_)));
    }

    #[test]
    fn test_retriable_classes() {
        assert!(TmsError::RateLimited("x".into()).is_retriable());
        assert!(TmsError::TokenLimit("x".into()).is_retriable());
        assert!(TmsError::ServiceUnavailable("x".into()).is_retriable());
        assert!(TmsError::Timeout("x".into()).is_retriable());
        assert!(!TmsError::Generation("x".into()).is_retriable());
        assert!(!TmsError::DocumentNotFound("x".into()).is_retriable());
    }
}
