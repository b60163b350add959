//! Image decoding and normalization into model input tensors.

use burn::prelude::*;
use image::{imageops::FilterType, RgbImage};

use crate::{CoreError, Result};

/// Spatial resolution the detector expects.
pub const INPUT_SIZE: u32 = 299;

/// Per-channel normalization mean.
pub const NORM_MEAN: f32 = 0.5;

/// Per-channel normalization scale.
pub const NORM_STD: f32 = 0.5;

/// Decode raw upload bytes into a 3-channel RGB image.
///
/// Any raster format supported by the `image` crate is accepted; alpha and
/// grayscale inputs are converted to RGB.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|e| CoreError::ImageDecode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Resize and normalize an image into a model input tensor.
///
/// The image is resized to [`INPUT_SIZE`] x [`INPUT_SIZE`] (bilinear),
/// scaled to `[0, 1]` and normalized per channel with mean [`NORM_MEAN`]
/// and scale [`NORM_STD`], matching the transform the detector was trained
/// with.
///
/// # Returns
///
/// Tensor of shape (1, 3, [`INPUT_SIZE`], [`INPUT_SIZE`]) in CHW layout.
pub fn to_input_tensor<B: Backend>(image: &RgbImage, device: &B::Device) -> Tensor<B, 4> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let (w, h) = (INPUT_SIZE as usize, INPUT_SIZE as usize);
    let mut data = vec![0.0f32; 3 * h * w];

    // HWC u8 -> normalized CHW f32
    for (y, x, pixel) in resized
        .rows()
        .enumerate()
        .flat_map(|(y, row)| row.enumerate().map(move |(x, p)| (y, x, p)))
    {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            data[c * h * w + y * w + x] = (value - NORM_MEAN) / NORM_STD;
        }
    }

    Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape([1, 3, h, w])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NdArray;
    use image::Rgb;

    #[test]
    fn test_decode_rgb_valid_png() {
        let img = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let decoded = decode_rgb(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_rgb_garbage() {
        let err = decode_rgb(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CoreError::ImageDecode(_)));
    }

    #[test]
    fn test_to_input_tensor_shape_and_range() {
        let device = Default::default();
        let img = RgbImage::from_pixel(50, 40, Rgb([255, 0, 128]));
        let tensor = to_input_tensor::<NdArray>(&img, &device);

        assert_eq!(
            tensor.dims(),
            [1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize]
        );

        // (x/255 - 0.5) / 0.5 maps [0, 255] into [-1, 1]
        let max: f32 = tensor.clone().max().into_scalar().elem();
        let min: f32 = tensor.min().into_scalar().elem();
        assert!(max <= 1.0 + 1e-6);
        assert!(min >= -1.0 - 1e-6);
    }

    #[test]
    fn test_to_input_tensor_solid_color_values() {
        let device = Default::default();
        // 255 -> (1.0 - 0.5) / 0.5 = 1.0, 0 -> -1.0
        let img = RgbImage::from_pixel(299, 299, Rgb([255, 0, 255]));
        let tensor = to_input_tensor::<NdArray>(&img, &device);

        let mean_r: f32 = tensor
            .clone()
            .slice([0..1, 0..1])
            .mean()
            .into_scalar()
            .elem();
        let mean_g: f32 = tensor.slice([0..1, 1..2]).mean().into_scalar().elem();
        assert!((mean_r - 1.0).abs() < 1e-5);
        assert!((mean_g + 1.0).abs() < 1e-5);
    }
}
