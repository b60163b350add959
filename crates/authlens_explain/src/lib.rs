//! # authlens_explain
//!
//! GradCAM explanation for the authlens detector.
//!
//! This crate provides:
//! - Request-scoped activation capture
//! - Gradient-weighted class activation mapping ([`grad_cam`])
//! - Heatmap rendering: bilinear upscale, jet colormap, alpha-blended
//!   overlay, JPEG encoding

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cam;
mod capture;
mod error;
mod explainer;
pub mod render;

pub use cam::{grad_cam, Cam, Heatmap, NORM_EPSILON};
pub use capture::ActivationCapture;
pub use error::{ExplainError, Result};
pub use explainer::{explain, Explanation};
