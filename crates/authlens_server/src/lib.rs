//! # authlens_server
//!
//! HTTP inference service for authlens deepfake detection.
//!
//! Exposes `POST /predict`, which accepts one uploaded image and responds
//! with the predicted class, the confidence, and - for images classified as
//! manipulated - a GradCAM overlay encoded as base64 JPEG.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
mod error;
mod routes;

pub use engine::{Analysis, DetectionEngine, EngineError};
pub use error::ApiError;
pub use routes::{app, AppState, PredictResponse};
