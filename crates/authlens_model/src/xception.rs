//! XceptionNet detector architecture.
//!
//! Based on the Xception architecture with depthwise separable convolutions,
//! sized for 299x299 RGB input and a binary real/manipulated head.
//!
//! Reference: "Xception: Deep Learning with Depthwise Separable Convolutions"
//! by Chollet (2017).

use burn::module::AutodiffModule;
use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
    BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use authlens_core::{CaptureClassifier, TargetLayer};

/// Configuration for the XceptionNet detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XceptionNetConfig {
    /// Number of input color channels.
    pub n_channels: usize,
    /// Expected input resolution (square).
    pub image_size: usize,
    /// Number of output classes.
    pub n_classes: usize,
    /// Number of filters in the entry flow.
    pub n_filters: usize,
    /// Kernel size for separable convolutions.
    pub kernel_size: usize,
    /// Number of Xception blocks.
    pub n_blocks: usize,
    /// Dropout rate (kept for training-pipeline parity; inactive at inference).
    pub dropout: f64,
}

impl Default for XceptionNetConfig {
    fn default() -> Self {
        Self {
            n_channels: 3,
            image_size: 299,
            n_classes: 2,
            n_filters: 32,
            kernel_size: 3,
            n_blocks: 4,
            dropout: 0.0,
        }
    }
}

impl XceptionNetConfig {
    /// Create a new config with specified dimensions.
    pub fn new(n_channels: usize, image_size: usize, n_classes: usize) -> Self {
        Self {
            n_channels,
            image_size,
            n_classes,
            ..Default::default()
        }
    }

    /// Set the number of entry filters.
    #[must_use]
    pub fn with_filters(mut self, n_filters: usize) -> Self {
        self.n_filters = n_filters;
        self
    }

    /// Set the kernel size.
    #[must_use]
    pub fn with_kernel_size(mut self, kernel_size: usize) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    /// Set the number of blocks.
    #[must_use]
    pub fn with_n_blocks(mut self, n_blocks: usize) -> Self {
        self.n_blocks = n_blocks;
        self
    }

    /// Initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> XceptionNet<B> {
        XceptionNet::new(self.clone(), device)
    }
}

/// Batch norm applied with the stored running statistics, regardless of
/// backend mode.
///
/// Burn's `BatchNorm::forward` switches to per-batch statistics whenever the
/// autodiff backend is active, which skews single-image inference and
/// advances the running statistics on every tracked pass. Inference always
/// wants the stored statistics, gradient tracking included, so the
/// normalization is applied directly here.
fn batch_norm_eval<B: Backend>(bn: &BatchNorm<B, 2>, x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, channels, _, _] = x.dims();
    let shape = [1, channels, 1, 1];

    let mean = bn.running_mean.value().reshape(shape);
    let std = (bn.running_var.value().reshape(shape) + bn.epsilon).sqrt();
    let gamma = bn.gamma.val().reshape(shape);
    let beta = bn.beta.val().reshape(shape);

    (x - mean) / std * gamma + beta
}

/// Depthwise separable convolution block.
///
/// Consists of:
/// 1. Depthwise convolution (groups = in_channels)
/// 2. Pointwise convolution (1x1 conv)
/// 3. Batch normalization
/// 4. ReLU activation
#[derive(Module, Debug)]
pub struct SeparableConv2d<B: Backend> {
    /// Depthwise convolution.
    depthwise: Conv2d<B>,
    /// Pointwise convolution.
    pointwise: Conv2d<B>,
    /// Batch normalization.
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> SeparableConv2d<B> {
    /// Create a new separable convolution.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        // Depthwise: each input channel is convolved separately
        let depthwise = Conv2dConfig::new([in_channels, in_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .with_groups(in_channels)
            .with_bias(false)
            .init(device);

        // Pointwise: 1x1 convolution to mix channels
        let pointwise = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_bias(false)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        Self {
            depthwise,
            pointwise,
            bn,
        }
    }

    /// Forward pass.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.depthwise.forward(x);
        let out = self.pointwise.forward(out);
        let out = batch_norm_eval(&self.bn, out);
        Relu::new().forward(out)
    }
}

/// Xception block with residual connection and spatial downsampling.
#[derive(Module, Debug)]
pub struct XceptionBlock<B: Backend> {
    /// First separable convolution.
    sep_conv1: SeparableConv2d<B>,
    /// Second separable convolution.
    sep_conv2: SeparableConv2d<B>,
    /// Residual convolution (channel matching + downsampling).
    residual_conv: Conv2d<B>,
    /// Residual batch norm.
    residual_bn: BatchNorm<B, 2>,
    /// Strided max pooling.
    maxpool: MaxPool2d,
}

impl<B: Backend> XceptionBlock<B> {
    /// Create a new Xception block.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        let sep_conv1 = SeparableConv2d::new(in_channels, out_channels, kernel_size, device);
        let sep_conv2 = SeparableConv2d::new(out_channels, out_channels, kernel_size, device);

        let residual_conv = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_stride([2, 2])
            .with_bias(false)
            .init(device);
        let residual_bn = BatchNormConfig::new(out_channels).init(device);

        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        Self {
            sep_conv1,
            sep_conv2,
            residual_conv,
            residual_bn,
            maxpool,
        }
    }

    /// Forward pass with residual connection.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        // Main path
        let out = self.sep_conv1.forward(x.clone());
        let out = self.sep_conv2.forward(out);
        let out = self.maxpool.forward(out);

        // Residual path
        let residual = self.residual_conv.forward(x);
        let residual = batch_norm_eval(&self.residual_bn, residual);

        // Add residual
        Relu::new().forward(out + residual)
    }
}

/// XceptionNet detector for image authenticity classification.
///
/// Architecture:
/// - Entry flow: strided convolution + batch norm + ReLU
/// - Middle flow: Xception blocks with separable convolutions, each halving
///   the spatial resolution
/// - Exit flow: global average pooling + linear head
///
/// Every block boundary is a capture point for explanation; see
/// [`TargetLayer`].
///
/// # Example
///
/// ```rust,ignore
/// use authlens_model::{XceptionNet, XceptionNetConfig};
///
/// let config = XceptionNetConfig::new(3, 299, 2).with_n_blocks(4);
/// let model = config.init::<NdArray>(&device);
///
/// let x = Tensor::random([1, 3, 299, 299], Distribution::Normal(0.0, 1.0), &device);
/// let logits = model.forward(x);
/// // logits shape: [1, 2]
/// ```
#[derive(Module, Debug)]
pub struct XceptionNet<B: Backend> {
    /// Entry convolution.
    entry_conv: Conv2d<B>,
    /// Entry batch norm.
    entry_bn: BatchNorm<B, 2>,
    /// Xception blocks.
    blocks: Vec<XceptionBlock<B>>,
    /// Global average pooling.
    gap: AdaptiveAvgPool2d,
    /// Final classifier.
    fc: Linear<B>,
}

impl<B: Backend> XceptionNet<B> {
    /// Create a new XceptionNet model.
    pub fn new(config: XceptionNetConfig, device: &B::Device) -> Self {
        // Entry flow: stride-2 convolution
        let entry_conv = Conv2dConfig::new(
            [config.n_channels, config.n_filters],
            [config.kernel_size, config.kernel_size],
        )
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device);
        let entry_bn = BatchNormConfig::new(config.n_filters).init(device);

        // Middle flow: Xception blocks with widening channels
        let mut blocks = Vec::new();
        for i in 0..config.n_blocks {
            let in_channels = if i == 0 {
                config.n_filters
            } else {
                config.n_filters * 2_usize.pow(i as u32 - 1).min(8)
            };
            let out_channels = config.n_filters * 2_usize.pow(i as u32).min(8);

            blocks.push(XceptionBlock::new(
                in_channels,
                out_channels,
                config.kernel_size,
                device,
            ));
        }

        let final_channels = config.n_filters * 2_usize.pow((config.n_blocks - 1) as u32).min(8);

        // Exit flow
        let gap = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc = LinearConfig::new(final_channels, config.n_classes).init(device);

        Self {
            entry_conv,
            entry_bn,
            blocks,
            gap,
            fc,
        }
    }

    /// Number of Xception blocks.
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Shared forward path, optionally capturing one activation.
    ///
    /// When a capture point is hit, the activation is re-inserted into the
    /// graph as a gradient-tracked leaf so the backward pass can read the
    /// gradient flowing into it.
    fn run(
        &self,
        x: Tensor<B, 4>,
        target: Option<TargetLayer>,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 4>>) {
        let mut captured = None;

        let mut capture_here = |out: Tensor<B, 4>, here: TargetLayer| {
            if target == Some(here) {
                let leaf = out.detach().require_grad();
                captured = Some(leaf.clone());
                leaf
            } else {
                out
            }
        };

        // Entry flow
        let mut out = self.entry_conv.forward(x);
        out = batch_norm_eval(&self.entry_bn, out);
        out = Relu::new().forward(out);
        out = capture_here(out, TargetLayer::Entry);

        // Middle flow
        for (i, block) in self.blocks.iter().enumerate() {
            out = block.forward(out);
            out = capture_here(out, TargetLayer::Block(i));
        }

        // Exit flow
        let out = self.gap.forward(out);
        let [batch, channels, _, _] = out.dims();
        let out = out.reshape([batch, channels]);
        (self.fc.forward(out), captured)
    }
}

impl<B: AutodiffBackend> CaptureClassifier<B> for XceptionNet<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        self.run(x, None).0
    }

    fn forward_eval(&self, x: Tensor<B::InnerBackend, 4>) -> Tensor<B::InnerBackend, 2> {
        // Plain classification needs no graph; run on the inner backend.
        self.valid().run(x, None).0
    }

    fn forward_with_capture(
        &self,
        x: Tensor<B, 4>,
        target: TargetLayer,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 4>>) {
        self.run(x, Some(target))
    }

    fn supports_target(&self, target: TargetLayer) -> bool {
        match target {
            TargetLayer::Entry => true,
            TargetLayer::Block(i) => i < self.blocks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_xception_config_default() {
        let config = XceptionNetConfig::default();
        assert_eq!(config.n_channels, 3);
        assert_eq!(config.image_size, 299);
        assert_eq!(config.n_classes, 2);
        assert_eq!(config.n_blocks, 4);
    }

    #[test]
    fn test_xception_config_builder() {
        let config = XceptionNetConfig::new(3, 128, 2)
            .with_filters(16)
            .with_kernel_size(5)
            .with_n_blocks(3);

        assert_eq!(config.image_size, 128);
        assert_eq!(config.n_filters, 16);
        assert_eq!(config.kernel_size, 5);
        assert_eq!(config.n_blocks, 3);
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let config = XceptionNetConfig::new(3, 64, 2).with_filters(8).with_n_blocks(2);
        let model = config.init::<TestBackend>(&device);

        let x = Tensor::zeros([2, 3, 64, 64], &device);
        let logits = model.forward(x);
        assert_eq!(logits.dims(), [2, 2]);
    }

    #[test]
    fn test_forward_with_capture_shapes() {
        let device = Default::default();
        let config = XceptionNetConfig::new(3, 64, 2).with_filters(8).with_n_blocks(2);
        let model = config.init::<TestBackend>(&device);

        let x = Tensor::zeros([1, 3, 64, 64], &device);
        let (logits, capture) = model.forward_with_capture(x, TargetLayer::Block(1));

        assert_eq!(logits.dims(), [1, 2]);
        let capture = capture.expect("block 1 exists");
        // 64 -> 32 (entry) -> 16 (block 0) -> 8 (block 1), 8 * 2 channels
        assert_eq!(capture.dims(), [1, 16, 8, 8]);
    }

    #[test]
    fn test_capture_missing_layer() {
        let device = Default::default();
        let config = XceptionNetConfig::new(3, 64, 2).with_filters(8).with_n_blocks(2);
        let model = config.init::<TestBackend>(&device);

        let x = Tensor::zeros([1, 3, 64, 64], &device);
        let (_, capture) = model.forward_with_capture(x, TargetLayer::Block(7));
        assert!(capture.is_none());

        assert!(model.supports_target(TargetLayer::Entry));
        assert!(model.supports_target(TargetLayer::Block(1)));
        assert!(!model.supports_target(TargetLayer::Block(2)));
    }

    #[test]
    fn test_classify_single_image() {
        use authlens_core::Label;

        let device = Default::default();
        let config = XceptionNetConfig::new(3, 64, 2).with_filters(8).with_n_blocks(2);
        let model = config.init::<TestBackend>(&device);

        let x = Tensor::<NdArray, 4>::zeros([1, 3, 64, 64], &device);
        let (prediction, logits) = model.classify(x);

        assert_eq!(logits.dims(), [1, 2]);
        assert!(prediction.confidence >= 0.0 && prediction.confidence <= 100.0);
        assert!(matches!(prediction.label, Label::Real | Label::Manipulated));
    }

    #[test]
    fn test_inference_uses_running_statistics() {
        let device = Default::default();
        let config = XceptionNetConfig::new(3, 64, 2).with_filters(8).with_n_blocks(2);
        let model = config.init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 4>::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );

        // The gradient-tracked pass must normalize with the same running
        // statistics as the evaluation pass; per-batch statistics would
        // make the two diverge on a single image.
        let tracked: Vec<f32> = model.forward(x.clone()).inner().into_data().to_vec().unwrap();
        let eval: Vec<f32> = model
            .forward_eval(x.clone().inner())
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(tracked, eval);

        // And the tracked pass must not advance the running statistics.
        let again: Vec<f32> = model.forward(x).inner().into_data().to_vec().unwrap();
        assert_eq!(tracked, again);
    }
}
