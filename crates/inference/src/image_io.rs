use crate::error::{InferenceError, Result};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

pub const JPEG_QUALITY: u8 = 85;

/// Decode an encoded image (JPEG, PNG, WebP, BMP) into RGB8.
pub fn image_from_bytes(bytes: &[u8]) -> Result<RgbImage> {
    let decoded = image::load_from_memory(bytes).map_err(InferenceError::ImageDecode)?;
    Ok(decoded.into_rgb8())
}

/// Encode an RGB image as JPEG.
pub fn bytes_from_image(image: &RgbImage) -> Result<Vec<u8>> {
    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY)
        .encode_image(image)
        .map_err(InferenceError::ImageEncode)?;
    Ok(jpeg_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_round_trip_preserves_dimensions() {
        let img = RgbImage::from_fn(123, 45, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));

        let bytes = bytes_from_image(&img).unwrap();
        let decoded = image_from_bytes(&bytes).unwrap();

        assert_eq!(decoded.dimensions(), (123, 45));
    }

    #[test]
    fn test_encodes_jpeg() {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 10, 10]));
        let bytes = bytes_from_image(&img).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker expected");
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            ImageFormat::Jpeg,
            "Encoded bytes should be detected as JPEG"
        );
    }

    #[test]
    fn test_png_with_alpha_is_converted_to_rgb() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128]));
        let mut png = Cursor::new(Vec::new());
        rgba.write_to(&mut png, ImageFormat::Png).unwrap();

        let decoded = image_from_bytes(png.get_ref()).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let result = image_from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(InferenceError::ImageDecode(_))));
    }
}
