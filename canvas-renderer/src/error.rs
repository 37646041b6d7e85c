//! Renderer error types.

use canvas_core::CanvasError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while rendering, saving or loading.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error from the core model.
    #[error(transparent)]
    Core(#[from] CanvasError),

    /// Save requested while the canvas holds no tiles.
    #[error("Canvas is empty, nothing to save")]
    EmptyCanvas,

    /// Image data handed to the loader is unusable.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Font data could not be parsed.
    #[error("Invalid font: {0}")]
    InvalidFont(String),

    /// Composite could not be produced.
    #[error("Export failed: {0}")]
    Export(String),

    /// Encoding or decoding through the image crate failed.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
