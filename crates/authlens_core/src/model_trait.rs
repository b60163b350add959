//! Detector model trait.
//!
//! Defines the contract an image-authenticity architecture must implement to
//! work with the inference and explanation pipelines.

use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::backend::AutodiffBackend;

use crate::{round2, Label, Prediction, TargetLayer};

/// Trait for binary image-authenticity classifiers that can expose an
/// intermediate activation for explanation.
///
/// Plain classification runs on the inner backend in evaluation mode
/// ([`forward_eval`](Self::forward_eval)); the autodiff backend is reserved
/// for the capture-and-backward explanation path. Implementors only need to
/// be `Send`: the engine wraps the model in a lock, so shared access never
/// requires `Sync`.
pub trait CaptureClassifier<B: AutodiffBackend>: Send {
    /// Gradient-tracked forward pass returning logits.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape (batch, channels, height, width)
    ///
    /// # Returns
    ///
    /// Logits tensor of shape (batch, n_classes)
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Evaluation-mode forward pass on the inner backend.
    ///
    /// Runs without autodiff tracking, so normalization layers apply their
    /// running statistics rather than the batch's own.
    fn forward_eval(&self, x: Tensor<B::InnerBackend, 4>) -> Tensor<B::InnerBackend, 2>;

    /// Forward pass that additionally captures the designated layer's output.
    ///
    /// The captured tensor is inserted into the computation graph as a leaf
    /// (`detach().require_grad()`) so that a subsequent backward pass can
    /// read the gradient flowing into it. Returns `None` for the capture
    /// when the target does not exist in this architecture.
    fn forward_with_capture(
        &self,
        x: Tensor<B, 4>,
        target: TargetLayer,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 4>>);

    /// Whether this architecture has an activation for the given target.
    fn supports_target(&self, target: TargetLayer) -> bool;

    /// Classify a single image tensor (batch size 1) in evaluation mode.
    ///
    /// # Returns
    ///
    /// The prediction (argmax class plus max probability as a percentage,
    /// rounded to two decimals) together with the raw logits.
    fn classify(&self, x: Tensor<B::InnerBackend, 4>) -> (Prediction, Tensor<B::InnerBackend, 2>) {
        let logits = self.forward_eval(x);
        let probs = softmax(logits.clone(), 1);

        let class = probs.clone().argmax(1).into_scalar().elem::<i64>() as usize;
        let confidence = round2(probs.max().into_scalar().elem::<f32>() * 100.0);

        (
            Prediction {
                label: Label::from_index(class),
                confidence,
            },
            logits,
        )
    }
}
