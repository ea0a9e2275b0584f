//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Exporter error type
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// HTTP client error (connection refused, timeout, ...)
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Upstream answered with a status that is not retried and not successful
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Upstream kept answering with a retryable status
    #[error("Retries exhausted after {attempts} attempts (last status {status})")]
    RetriesExhausted {
        /// Last HTTP status code received
        status: u16,
        /// Number of attempts made
        attempts: u32,
    },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Metrics server error (bind, serve)
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;

/// Result type alias (Exporter)
pub type ExporterResult<T> = Result<T, ExporterError>;
