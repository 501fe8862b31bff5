use thiserror::Error;

/// Main error type for the optimizer application
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// Inventory service errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Utilization metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Inventory-service errors
///
/// A failure listing resources is fatal to the whole analysis run:
/// recommendations built on an unknown inventory would be misleading.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Service returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Metrics-query errors
///
/// Transient per-resource failures: the owning pass retries once, then
/// skips the resource and records a diagnostic.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Query execution error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Threshold ordering violation
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),
}

/// Helper type alias for Results
pub type Result<T> = std::result::Result<T, OptimizerError>;
