//! # authlens_model
//!
//! Detector architectures and checkpointing for authlens.
//!
//! This crate provides:
//! - [`XceptionNet`], the Xception-style CNN used for real/manipulated
//!   classification of 299x299 RGB images
//! - Checkpoint save/load via Burn's named-MessagePack records

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
mod xception;

pub use checkpoint::{load_model, save_model, CheckpointError, CheckpointMetadata};
pub use xception::{SeparableConv2d, XceptionBlock, XceptionNet, XceptionNetConfig};
