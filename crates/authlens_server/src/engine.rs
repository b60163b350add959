//! Inference engine: preprocessing, classification and explanation.

use std::sync::{Mutex, PoisonError};

use burn::prelude::*;
use thiserror::Error;

use authlens_core::backend::{AdNdArray, NdArray};
use authlens_core::{
    decode_rgb, to_input_tensor, CaptureClassifier, CoreError, Label, Prediction, TargetLayer,
};
use authlens_explain::{explain, render, ExplainError};

/// Result of analyzing one uploaded image.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The classifier's decision.
    pub prediction: Prediction,
    /// JPEG overlay of the GradCAM heatmap on the original image; present
    /// exactly when the image was classified as manipulated.
    pub overlay_jpeg: Option<Vec<u8>>,
}

/// Errors produced while analyzing an upload.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The upload could not be decoded or preprocessed.
    #[error(transparent)]
    Input(#[from] CoreError),

    /// The explanation pass failed.
    #[error(transparent)]
    Explain(#[from] ExplainError),
}

/// A detector model paired with its explanation target layer.
///
/// The model sits behind a mutex; [`analyze`](Self::analyze) holds the lock
/// for the whole classify-explain cycle, so at most one forward+backward
/// capture cycle runs per engine at any time and the engine can be shared
/// across threads.
pub struct DetectionEngine<M>
where
    M: CaptureClassifier<AdNdArray>,
{
    model: Mutex<M>,
    target: TargetLayer,
    device: <AdNdArray as Backend>::Device,
}

impl<M> DetectionEngine<M>
where
    M: CaptureClassifier<AdNdArray>,
{
    /// Create an engine, validating the target layer against the model.
    ///
    /// An unsupported target is a configuration error and is rejected here,
    /// at startup, rather than on the first manipulated-image request.
    pub fn new(
        model: M,
        target: TargetLayer,
        device: <AdNdArray as Backend>::Device,
    ) -> Result<Self, EngineError> {
        if !model.supports_target(target) {
            return Err(EngineError::Explain(ExplainError::TargetLayerNotFound(
                target,
            )));
        }
        Ok(Self {
            model: Mutex::new(model),
            target,
            device,
        })
    }

    /// The configured explanation target.
    pub fn target(&self) -> TargetLayer {
        self.target
    }

    /// Analyze one uploaded image.
    ///
    /// Decodes and normalizes the upload, classifies it in evaluation mode
    /// on the inner backend, and - only when the predicted class is
    /// manipulated - runs the autodiff forward pass with a capture,
    /// backpropagates from the predicted logit and renders the GradCAM
    /// overlay at the original image's dimensions.
    pub fn analyze(&self, upload: &[u8]) -> Result<Analysis, EngineError> {
        let original = decode_rgb(upload)?;

        let model = self
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let input = to_input_tensor::<NdArray>(&original, &self.device);
        let (prediction, _logits) = model.classify(input);
        tracing::debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            "classified upload"
        );

        if prediction.label == Label::Real {
            return Ok(Analysis {
                prediction,
                overlay_jpeg: None,
            });
        }

        let input = to_input_tensor::<AdNdArray>(&original, &self.device);
        let explanation = explain(&*model, input, self.target)?;
        let overlay = render::render_overlay(&original, &explanation.heatmap)?;

        Ok(Analysis {
            // The explanation recomputes the forward pass; report its view
            // of the decision so prediction and heatmap always agree.
            prediction: explanation.prediction,
            overlay_jpeg: Some(overlay),
        })
    }
}
