//! Model checkpointing and serialization utilities.
//!
//! Provides utilities for saving and loading detector weights using Burn's
//! record system. The export pipeline that trains the detector is expected to
//! produce weights in this format.
//!
//! # Supported Formats
//!
//! - **Named MessagePack** (`*.mpk`): binary format including parameter names
//!
//! # Example
//!
//! ```rust,ignore
//! use authlens_model::{load_model, save_model, XceptionNetConfig};
//!
//! let config = XceptionNetConfig::default();
//! let model = config.init::<NdArray>(&device);
//!
//! save_model(&model, "detector.mpk")?;
//! let loaded = load_model::<NdArray>(&config, "detector.mpk", &device)?;
//! ```

use std::path::Path;

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use serde::Serialize;

use crate::{XceptionNet, XceptionNetConfig};

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Checkpoint-related errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Error saving checkpoint.
    #[error("Failed to save checkpoint: {0}")]
    Save(String),

    /// Error loading checkpoint.
    #[error("Failed to load checkpoint: {0}")]
    Load(String),
}

/// Save a model to a named-MessagePack checkpoint file.
///
/// # Arguments
///
/// * `model` - The model to save
/// * `path` - Output path
pub fn save_model<B, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path.as_ref().to_path_buf(), &recorder)
        .map_err(|e| CheckpointError::Save(e.to_string()))
}

/// Load an [`XceptionNet`] from a named-MessagePack checkpoint file.
///
/// The configuration must match the architecture the checkpoint was saved
/// with; a mismatch surfaces as [`CheckpointError::Load`].
///
/// # Arguments
///
/// * `config` - Architecture configuration
/// * `path` - Path to checkpoint
/// * `device` - Device to load the model onto
pub fn load_model<B: Backend>(
    config: &XceptionNetConfig,
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<XceptionNet<B>> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.as_ref().to_path_buf(), device)
        .map_err(|e| CheckpointError::Load(e.to_string()))?;

    Ok(config.init::<B>(device).load_record(record))
}

/// Model checkpoint metadata, stored as a JSON sidecar by the export
/// pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckpointMetadata {
    /// Model architecture name.
    pub arch: String,
    /// Model configuration as JSON.
    pub config_json: String,
    /// Validation accuracy (if recorded during training).
    pub val_acc: Option<f32>,
    /// Additional metadata.
    pub extra: std::collections::HashMap<String, String>,
}

impl CheckpointMetadata {
    /// Create new metadata for a model.
    pub fn new(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            config_json: String::new(),
            val_acc: None,
            extra: std::collections::HashMap::new(),
        }
    }

    /// Set the config JSON.
    #[must_use]
    pub fn with_config<C: Serialize>(mut self, config: &C) -> Self {
        self.config_json = serde_json::to_string(config).unwrap_or_default();
        self
    }

    /// Set the validation accuracy.
    #[must_use]
    pub fn with_val_acc(mut self, acc: f32) -> Self {
        self.val_acc = Some(acc);
        self
    }

    /// Add extra metadata.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::Save(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| CheckpointError::Save(e.to_string()))?;
        Ok(())
    }

    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).map_err(|e| CheckpointError::Load(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::Load(e.to_string()))
    }
}
