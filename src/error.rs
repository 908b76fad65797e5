//! Error types for scene export.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error while writing the destination or a side file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode a surface texture.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Formatting into an in-memory section buffer failed.
    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Failed to parse a scene document.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The destination could not be opened; nothing was written.
    #[error("cannot open {}: {source}", .path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No driver is registered under this name.
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    /// Scene parameters that make the camera transform meaningless.
    #[error("Invalid scene: {0}")]
    InvalidScene(String),
}
