//! Class activation map computation.

use burn::prelude::*;

use crate::{ExplainError, Result};

/// Stabilizer for heatmap normalization; a uniform map normalizes to all
/// zeros instead of dividing by zero.
pub const NORM_EPSILON: f32 = 1e-10;

/// Spatial class activation map over an intermediate layer.
///
/// Shape is (batch, 1, height, width).
#[derive(Debug, Clone)]
pub struct Cam<B: Backend> {
    /// The importance values.
    pub values: Tensor<B, 4>,
}

impl<B: Backend> Cam<B> {
    /// Shape of the map.
    pub fn shape(&self) -> [usize; 4] {
        self.values.dims()
    }

    /// Normalize the map to `[0, 1]` as `(v - min) / (max - min + eps)`.
    ///
    /// A degenerate map (all values equal) yields all zeros.
    #[must_use]
    pub fn normalize(self) -> Self {
        let min_val: f32 = self.values.clone().min().into_scalar().elem();
        let max_val: f32 = self.values.clone().max().into_scalar().elem();

        Self {
            values: (self.values - min_val) / (max_val - min_val + NORM_EPSILON),
        }
    }

    /// Extract the map as a single-channel grid (batch size must be 1).
    pub fn into_heatmap(self) -> Result<Heatmap> {
        let [batch, channels, height, width] = self.values.dims();
        if batch != 1 || channels != 1 {
            return Err(ExplainError::TensorData(format!(
                "expected shape [1, 1, h, w], got [{batch}, {channels}, {height}, {width}]"
            )));
        }

        let values: Vec<f32> = self
            .values
            .into_data()
            .to_vec()
            .map_err(|e| ExplainError::TensorData(format!("{e:?}")))?;

        Ok(Heatmap {
            values,
            width,
            height,
        })
    }
}

/// A single-channel 2D grid of importance scores in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    values: Vec<f32>,
    width: usize,
    height: usize,
}

impl Heatmap {
    /// Build a heatmap from row-major values.
    ///
    /// Returns an error when `values.len() != width * height`.
    pub fn from_values(values: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        if values.len() != width * height {
            return Err(ExplainError::TensorData(format!(
                "heatmap of {}x{} requires {} values, got {}",
                width,
                height,
                width * height,
                values.len()
            )));
        }
        Ok(Self {
            values,
            width,
            height,
        })
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major importance values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Importance score at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }
}

/// Compute the GradCAM importance map for a captured activation.
///
/// Each feature-map channel is weighted by the spatial average of the
/// gradient flowing into it, the weighted channels are averaged, and
/// negative contributions are clamped to zero: only regions that push the
/// score of the predicted class up are highlighted.
///
/// # Arguments
///
/// * `activations` - Target layer output (batch, channels, height, width)
/// * `gradients` - Gradients w.r.t. the activations, same shape
///
/// # Returns
///
/// Unnormalized map of shape (batch, 1, height, width).
pub fn grad_cam<B: Backend>(activations: Tensor<B, 4>, gradients: Tensor<B, 4>) -> Cam<B> {
    // Spatial-average gradient per channel: (b, c, h, w) -> (b, c, 1, 1)
    let weights = gradients.mean_dim(3).mean_dim(2);

    // Weight the activations and average across channels: -> (b, 1, h, w)
    let weighted = activations * weights;
    let cam = weighted.mean_dim(1);

    // Keep only positive contributions
    Cam {
        values: cam.clamp_min(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_grad_cam_shape() {
        let device = Default::default();
        let activations = Tensor::<TestBackend, 4>::ones([1, 16, 10, 10], &device);
        let gradients = Tensor::<TestBackend, 4>::ones([1, 16, 10, 10], &device);

        let cam = grad_cam(activations, gradients);
        assert_eq!(cam.shape(), [1, 1, 10, 10]);
    }

    #[test]
    fn test_grad_cam_clamps_negative_contributions() {
        let device = Default::default();
        let activations = Tensor::<TestBackend, 4>::ones([1, 4, 5, 5], &device);
        // Negative gradients everywhere -> negative contributions -> clamped
        let gradients = Tensor::<TestBackend, 4>::ones([1, 4, 5, 5], &device) * -1.0;

        let cam = grad_cam(activations, gradients);
        let sum: f32 = cam.values.sum().into_scalar().elem();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn test_normalize_min_zero_max_one() {
        let device = Default::default();
        let data: Vec<f32> = (0..25).map(|i| i as f32).collect();
        let values = Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &device)
            .reshape([1, 1, 5, 5]);

        let cam = Cam { values }.normalize();
        let heatmap = cam.into_heatmap().unwrap();

        let min = heatmap.values().iter().cloned().fold(f32::MAX, f32::min);
        let max = heatmap.values().iter().cloned().fold(f32::MIN, f32::max);
        assert!(min.abs() < 1e-6);
        assert!((max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_uniform_map_is_all_zero() {
        let device = Default::default();
        let values = Tensor::<TestBackend, 4>::ones([1, 1, 8, 8], &device) * 0.7;

        let cam = Cam { values }.normalize();
        let heatmap = cam.into_heatmap().unwrap();
        assert!(heatmap.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_into_heatmap_rejects_batches() {
        let device = Default::default();
        let values = Tensor::<TestBackend, 4>::ones([2, 1, 4, 4], &device);
        assert!(Cam { values }.into_heatmap().is_err());
    }

    #[test]
    fn test_heatmap_indexing() {
        let heatmap = Heatmap::from_values(vec![0.0, 0.25, 0.5, 1.0], 2, 2).unwrap();
        assert_eq!(heatmap.get(1, 0), 0.25);
        assert_eq!(heatmap.get(0, 1), 0.5);
        assert!(Heatmap::from_values(vec![0.0; 3], 2, 2).is_err());
    }
}
