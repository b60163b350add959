//! Error types for authlens_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while preparing model inputs.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
