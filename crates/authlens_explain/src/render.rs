//! Heatmap rendering: upscale, colorize, blend, encode.
//!
//! Turns a normalized importance map into the overlay returned to clients:
//! the map is bilinearly upscaled to the original image's dimensions,
//! quantized to 8 bits, mapped through a jet palette (blue for low
//! importance, red for high), and alpha-blended onto the original image.

use image::RgbImage;

use crate::{ExplainError, Heatmap, Result};

/// Blend weight of the original image in the overlay.
pub const ORIGINAL_WEIGHT: f32 = 0.6;

/// Blend weight of the colorized heatmap in the overlay.
pub const HEATMAP_WEIGHT: f32 = 0.4;

/// JPEG quality used for the encoded overlay.
const JPEG_QUALITY: u8 = 90;

/// Bilinearly resize a heatmap to the given dimensions.
pub fn resize_bilinear(map: &Heatmap, width: usize, height: usize) -> Heatmap {
    let (src_w, src_h) = (map.width(), map.height());
    let mut values = Vec::with_capacity(width * height);

    let scale_x = src_w as f32 / width as f32;
    let scale_y = src_h as f32 / height as f32;

    for y in 0..height {
        // Sample at pixel centers
        let sy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (src_h - 1) as f32);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;

        for x in 0..width {
            let sx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (src_w - 1) as f32);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            let top = map.get(x0, y0) * (1.0 - fx) + map.get(x1, y0) * fx;
            let bottom = map.get(x0, y1) * (1.0 - fx) + map.get(x1, y1) * fx;
            values.push(top * (1.0 - fy) + bottom * fy);
        }
    }

    Heatmap::from_values(values, width, height).expect("computed dimensions are consistent")
}

/// Map an 8-bit intensity through the jet palette.
///
/// Low intensities map to blue, mid intensities to green/yellow, high
/// intensities to red.
pub fn jet_color(intensity: u8) -> [u8; 3] {
    let v = intensity as f32 / 255.0 * 4.0;
    let channel = |center: f32| ((1.5 - (v - center).abs()).clamp(0.0, 1.0) * 255.0) as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Blend a colorized heatmap onto the original image.
///
/// The heatmap is upscaled to the image's dimensions, quantized to 8 bits,
/// colorized with [`jet_color`] and blended as
/// `0.6 * original + 0.4 * color`.
pub fn overlay(original: &RgbImage, map: &Heatmap) -> RgbImage {
    let (width, height) = original.dimensions();
    let resized = resize_bilinear(map, width as usize, height as usize);

    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let intensity = (resized.get(x as usize, y as usize).clamp(0.0, 1.0) * 255.0) as u8;
        let color = jet_color(intensity);
        let base = original.get_pixel(x, y);

        for c in 0..3 {
            pixel.0[c] = (base.0[c] as f32 * ORIGINAL_WEIGHT + color[c] as f32 * HEATMAP_WEIGHT)
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Encode an image as JPEG bytes.
pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|e| ExplainError::ImageEncode(e.to_string()))?;
    Ok(bytes)
}

/// Render the full overlay: upscale, colorize, blend and JPEG-encode.
pub fn render_overlay(original: &RgbImage, map: &Heatmap) -> Result<Vec<u8>> {
    encode_jpeg(&overlay(original, map))
}
