//! GradCAM explanation pipeline.

use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::backend::AutodiffBackend;

use authlens_core::{round2, CaptureClassifier, Label, Prediction, TargetLayer};

use crate::{grad_cam, ActivationCapture, ExplainError, Heatmap, Result};

/// A prediction together with the spatial explanation of what drove it.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// The classifier's decision for this input.
    pub prediction: Prediction,
    /// Normalized importance map over the target layer's spatial grid.
    pub heatmap: Heatmap,
}

/// Compute a GradCAM explanation for a single input tensor.
///
/// Runs a full forward pass (recomputed rather than reusing an earlier
/// prediction, so the backward pass sees a consistent graph), selects the
/// predicted class, then backpropagates from that class's logit alone and
/// reduces the captured activation and its gradient to a normalized
/// importance map.
///
/// The capture is a local of this function; it is dropped on every exit
/// path, so no capture state can leak into a later call.
///
/// # Arguments
///
/// * `model` - The detector
/// * `input` - Normalized input tensor of shape (1, channels, height, width)
/// * `target` - The layer whose activations are explained
///
/// # Errors
///
/// [`ExplainError::TargetLayerNotFound`] when the model has no activation
/// for `target`; [`ExplainError::MissingGradient`] when the backward pass
/// does not reach the capture.
pub fn explain<B, M>(model: &M, input: Tensor<B, 4>, target: TargetLayer) -> Result<Explanation>
where
    B: AutodiffBackend,
    M: CaptureClassifier<B> + ?Sized,
{
    let (logits, captured) = model.forward_with_capture(input, target);
    let capture = ActivationCapture::new(
        captured.ok_or(ExplainError::TargetLayerNotFound(target))?,
        target,
    );

    let probs = softmax(logits.clone(), 1);
    let class = probs.clone().argmax(1).into_scalar().elem::<i64>() as usize;
    let confidence = round2(probs.max().into_scalar().elem::<f32>() * 100.0);

    // Backward seeded from the predicted class's logit only. Burn builds a
    // fresh gradient container per backward call, so there is no accumulated
    // gradient state to reset.
    let score = logits.slice([0..1, class..class + 1]);
    let grads = score.backward();

    let gradient = capture
        .gradient(&grads)
        .ok_or(ExplainError::MissingGradient(target))?;
    let activations = capture.into_activations();

    let heatmap = grad_cam(activations, gradient).normalize().into_heatmap()?;

    Ok(Explanation {
        prediction: Prediction {
            label: Label::from_index(class),
            confidence,
        },
        heatmap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use authlens_model::XceptionNetConfig;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    fn test_input(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 4> {
        Tensor::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            device,
        )
    }

    #[test]
    fn test_explain_produces_normalized_heatmap() {
        let device = Default::default();
        let model = XceptionNetConfig::new(3, 64, 2)
            .with_filters(8)
            .with_n_blocks(2)
            .init::<TestBackend>(&device);

        let explanation = explain(&model, test_input(&device), TargetLayer::Block(1)).unwrap();

        // CAM lives on the target layer's spatial grid: 64 -> 32 -> 16 -> 8
        assert_eq!(explanation.heatmap.width(), 8);
        assert_eq!(explanation.heatmap.height(), 8);
        assert!(explanation
            .heatmap
            .values()
            .iter()
            .all(|v| (0.0..=1.0).contains(v)));

        let pred = explanation.prediction;
        assert!(pred.confidence >= 0.0 && pred.confidence <= 100.0);
    }

    #[test]
    fn test_explain_missing_target_layer() {
        let device = Default::default();
        let model = XceptionNetConfig::new(3, 64, 2)
            .with_filters(8)
            .with_n_blocks(2)
            .init::<TestBackend>(&device);

        let err = explain(&model, test_input(&device), TargetLayer::Block(9)).unwrap_err();
        assert!(matches!(err, ExplainError::TargetLayerNotFound(_)));
    }

    #[test]
    fn test_explain_is_deterministic() {
        let device = Default::default();
        let model = XceptionNetConfig::new(3, 64, 2)
            .with_filters(8)
            .with_n_blocks(2)
            .init::<TestBackend>(&device);

        let input = test_input(&device);
        let a = explain(&model, input.clone(), TargetLayer::Block(1)).unwrap();
        let b = explain(&model, input, TargetLayer::Block(1)).unwrap();

        assert_eq!(a.prediction, b.prediction);
        assert_eq!(a.heatmap, b.heatmap);
    }

    #[test]
    fn test_explain_matches_classify() {
        use authlens_core::CaptureClassifier;

        let device = Default::default();
        let model = XceptionNetConfig::new(3, 64, 2)
            .with_filters(8)
            .with_n_blocks(2)
            .init::<TestBackend>(&device);

        let input = test_input(&device);
        let (prediction, _) = model.classify(input.clone().inner());
        let explanation = explain(&model, input, TargetLayer::Block(1)).unwrap();

        // Evaluation-mode classification and the tracked explanation pass
        // normalize with the same running statistics, so they agree.
        assert_eq!(explanation.prediction, prediction);
    }
}
