//! Error types for ETL operations.

use polars::prelude::PolarsError;

/// Result type for ETL operations
pub type EtlResult<T> = Result<T, EtlError>;

/// Error type for ETL operations
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        EtlError::InvalidArgument(message.into())
    }
}
