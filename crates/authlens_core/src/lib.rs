//! # authlens_core
//!
//! Core types for authlens media authenticity analysis.
//!
//! This crate provides:
//! - [`Label`] and [`Prediction`] for classifier outputs
//! - [`TargetLayer`] for designating the explanation capture point
//! - [`CaptureClassifier`] trait implemented by detector architectures
//! - Image preprocessing into normalized model input tensors
//! - Error types and backend aliases
//!
//! ## Input Convention
//!
//! Model inputs follow the convention `(B, C, H, W)`:
//! - `B`: Batch size (the inference path always uses 1)
//! - `C`: Color channels (3, RGB)
//! - `H`, `W`: Spatial resolution (299 x 299 after preprocessing)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod label;
mod layer;
mod model_trait;
mod preprocess;

pub use error::{CoreError, Result};
pub use label::{round2, Label, Prediction};
pub use layer::TargetLayer;
pub use model_trait::CaptureClassifier;
pub use preprocess::{decode_rgb, to_input_tensor, INPUT_SIZE, NORM_MEAN, NORM_STD};

/// Backend type aliases for convenience.
pub mod backend {
    pub use burn_autodiff::Autodiff;
    pub use burn_ndarray::NdArray;

    /// Autodiff-capable CPU backend used for the explanation backward pass.
    pub type AdNdArray = Autodiff<NdArray>;
}
