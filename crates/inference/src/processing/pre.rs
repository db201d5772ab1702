use crate::config::DEFAULT_INPUT_SIZE;
use crate::processing::post::TransformParams;
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

pub struct PreProcessor {
    pub input_size: (u32, u32),
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    /// Letterbox `image` into the model input and return the NCHW tensor
    /// together with the parameters needed to map boxes back.
    pub fn preprocess(
        &self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, TransformParams)> {
        let _s = span!("preprocess");

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot preprocess an empty {}x{} image", width, height);
        }
        let (input_width, input_height) = self.input_size;
        if input_width == 0 || input_height == 0 {
            anyhow::bail!("Invalid model input size {}x{}", input_width, input_height);
        }

        tracing::trace!(width, height, "Preprocessing image");

        let (letterboxed, transform) = self.resize_and_letterbox(image)?;
        let input = self.normalize(&letterboxed)?;

        Ok((input, transform))
    }

    fn resize_and_letterbox(&self, image: &RgbImage) -> anyhow::Result<(Vec<u8>, TransformParams)> {
        let _s = span!("resize_and_letterbox");

        let (width, height) = image.dimensions();
        let (input_width, input_height) = self.input_size;

        let scale = (input_width as f32 / width as f32).min(input_height as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, input_width);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, input_height);

        let offset_x = (input_width - new_width) / 2;
        let offset_y = (input_height - new_height) / 2;

        let src = ImageRef::new(width, height, image.as_raw(), PixelType::U8x3)?;
        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        let mut letterboxed = vec![LETTERBOX_COLOR; (input_width * input_height * 3) as usize];

        let resized_data = resized.buffer();
        let row_bytes = (new_width * 3) as usize;
        let stride = input_width * 3;

        for y in 0..new_height {
            let src_row = y as usize * row_bytes;
            let dst_row = ((y + offset_y) * stride + offset_x * 3) as usize;

            letterboxed[dst_row..dst_row + row_bytes]
                .copy_from_slice(&resized_data[src_row..src_row + row_bytes]);
        }

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            input_width,
            input_height,
            scale,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        };

        Ok((letterboxed, transform))
    }

    fn normalize(&self, letterboxed: &[u8]) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in letterboxed.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new((DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_output_shape_matches_input_size() {
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));

        let (output, _) = PreProcessor::default().preprocess(&img).unwrap();
        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    #[test]
    fn test_zero_input_size_is_rejected() {
        let img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        assert!(PreProcessor::new((0, 0)).preprocess(&img).is_err());
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let img = RgbImage::new(0, 0);
        let result = PreProcessor::default().preprocess(&img);

        assert!(result.is_err(), "Empty image should return error");
    }

    /// Test letterboxing preserves aspect ratio
    #[test]
    fn test_letterboxing_preserves_aspect_ratio() {
        // 800x600 image (4:3 aspect ratio)
        let img = RgbImage::from_pixel(800, 600, Rgb([128, 128, 128]));

        let (output, transform) = PreProcessor::default().preprocess(&img).unwrap();

        // Scale = min(640/800, 640/600) = 0.8
        // Resized: 640x480, offset Y = (640 - 480) / 2 = 80
        assert!((transform.scale - 0.8).abs() < 1e-6);
        assert_eq!(transform.offset_x, 0.0, "X offset should be 0 for wide image");
        assert_eq!(transform.offset_y, 80.0, "Y offset should center vertically");
        assert_eq!((transform.orig_width, transform.orig_height), (800, 600));

        // Padding rows keep the letterbox colour, content rows the image colour
        let pad = LETTERBOX_COLOR as f32 / 255.0;
        let content = 128.0 / 255.0;
        assert!((output[[0, 0, 10, 320]] - pad).abs() < 1e-6);
        assert!((output[[0, 0, 320, 320]] - content).abs() < 1e-2);
        assert!((output[[0, 2, 630, 320]] - pad).abs() < 1e-6);
    }

    #[test]
    fn test_tall_image_pads_horizontally() {
        let img = RgbImage::from_pixel(300, 600, Rgb([0, 0, 0]));

        let (_, transform) = PreProcessor::new((320, 320)).preprocess(&img).unwrap();

        // Scale = min(320/300, 320/600) = 0.5333, resized 160x320
        assert_eq!(transform.offset_x, 80.0);
        assert_eq!(transform.offset_y, 0.0);
    }

    #[test]
    fn test_channels_are_planar_and_scaled() {
        let img = RgbImage::from_pixel(640, 640, Rgb([255, 0, 51]));

        let (output, transform) = PreProcessor::default().preprocess(&img).unwrap();

        assert_eq!(transform.scale, 1.0);
        assert!((output[[0, 0, 100, 100]] - 1.0).abs() < 1e-6);
        assert!(output[[0, 1, 100, 100]].abs() < 1e-6);
        assert!((output[[0, 2, 100, 100]] - 0.2).abs() < 1e-6);
    }
}
