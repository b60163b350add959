//! Request-scoped activation capture.
//!
//! A capture is created inside one explanation call and dropped at its end,
//! so two in-flight explanations can never observe each other's activations
//! or gradients. There is no model-attached capture state.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use authlens_core::TargetLayer;

/// The output of a designated layer, recorded during a forward pass.
///
/// The held tensor is a gradient-tracked leaf of the computation graph; the
/// gradient that flowed into the layer's output during a backward pass is
/// read out of the [`Gradients`](AutodiffBackend::Gradients) container
/// produced by that pass.
#[derive(Debug, Clone)]
pub struct ActivationCapture<B: AutodiffBackend> {
    tensor: Tensor<B, 4>,
    layer: TargetLayer,
}

impl<B: AutodiffBackend> ActivationCapture<B> {
    /// Record a captured activation for the given layer.
    pub fn new(tensor: Tensor<B, 4>, layer: TargetLayer) -> Self {
        Self { tensor, layer }
    }

    /// The layer this capture belongs to.
    pub fn layer(&self) -> TargetLayer {
        self.layer
    }

    /// Shape of the captured activation (batch, channels, height, width).
    pub fn shape(&self) -> [usize; 4] {
        self.tensor.dims()
    }

    /// Gradient of the backward pass's seed with respect to this activation.
    ///
    /// Returns `None` when the backward pass never reached the capture.
    pub fn gradient(&self, grads: &B::Gradients) -> Option<Tensor<B::InnerBackend, 4>> {
        self.tensor.grad(grads)
    }

    /// Consume the capture, yielding the activation values on the inner
    /// (non-autodiff) backend.
    pub fn into_activations(self) -> Tensor<B::InnerBackend, 4> {
        self.tensor.inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_capture_gradient_roundtrip() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 2, 3, 3], &device).require_grad();
        let capture = ActivationCapture::new(x.clone(), TargetLayer::Entry);

        // d(sum(3x))/dx = 3 everywhere
        let grads = (x * 3.0).sum().backward();
        let grad = capture.gradient(&grads).expect("gradient present");

        let values: Vec<f32> = grad.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (*v - 3.0).abs() < 1e-6));
    }

    #[test]
    fn test_capture_without_backward() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 2, 3, 3], &device).require_grad();
        let unrelated = Tensor::<TestBackend, 1>::ones([1], &device).require_grad();
        let capture = ActivationCapture::new(x, TargetLayer::Block(0));

        let grads = unrelated.sum().backward();
        assert!(capture.gradient(&grads).is_none());
        assert_eq!(capture.shape(), [1, 2, 3, 3]);
    }
}
