//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tool identifier not recognised.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Color string is not `#rrggbb`.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Text annotation not found.
    #[error("Text item not found: {0}")]
    TextNotFound(String),

    /// Configuration or script serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
