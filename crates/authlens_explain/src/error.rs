//! Error types for authlens_explain.

use authlens_core::TargetLayer;
use thiserror::Error;

/// Result type alias using [`ExplainError`].
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Errors that can occur while computing or rendering an explanation.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// The designated target layer does not exist in the model. This is a
    /// misconfiguration of the explainer, not a per-input data problem.
    #[error("Target layer '{0}' does not exist in this model")]
    TargetLayerNotFound(TargetLayer),

    /// The backward pass produced no gradient for the captured activation.
    #[error("No gradient reached the captured activation at '{0}'")]
    MissingGradient(TargetLayer),

    /// Tensor data conversion error.
    #[error("Tensor data error: {0}")]
    TensorData(String),

    /// Overlay image encoding error.
    #[error("Image encode error: {0}")]
    ImageEncode(String),
}
