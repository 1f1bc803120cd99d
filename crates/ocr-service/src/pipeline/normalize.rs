use crate::pipeline::error::{PipelineError, PipelineResult};
use image::{DynamicImage, RgbImage};

/// Canonicalize a decoded image into the 3-channel form the rest of the
/// pipeline works on.
///
/// Grayscale input is replicated across channels, RGBA loses its alpha
/// channel, RGB passes through untouched. Any other layout (16-bit, float,
/// luma+alpha) is rejected rather than silently converted.
pub fn normalize(image: DynamicImage) -> PipelineResult<RgbImage> {
    match image {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb),
        DynamicImage::ImageLuma8(gray) => Ok(DynamicImage::ImageLuma8(gray).to_rgb8()),
        DynamicImage::ImageRgba8(rgba) => Ok(DynamicImage::ImageRgba8(rgba).to_rgb8()),
        other => Err(PipelineError::InvalidImage(format!(
            "{:?} is not a supported channel layout",
            other.color()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, LumaA, Rgb, Rgba, RgbaImage};

    #[test]
    fn grayscale_replicates_into_three_channels() {
        let mut gray = GrayImage::new(4, 3);
        gray.put_pixel(1, 1, Luma([200]));

        let rgb = normalize(DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([200, 200, 200]));
    }

    #[test]
    fn rgb_passes_through_unchanged() {
        let mut src = RgbImage::new(2, 2);
        src.put_pixel(0, 0, Rgb([10, 20, 30]));

        let rgb = normalize(DynamicImage::ImageRgb8(src.clone())).unwrap();
        assert_eq!(rgb, src);
    }

    #[test]
    fn rgba_drops_alpha() {
        let mut src = RgbaImage::new(2, 2);
        src.put_pixel(0, 0, Rgba([10, 20, 30, 128]));

        let rgb = normalize(DynamicImage::ImageRgba8(src)).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn other_layouts_are_rejected() {
        let luma_alpha =
            image::ImageBuffer::<LumaA<u8>, _>::from_pixel(2, 2, LumaA([1, 255]));
        let result = normalize(DynamicImage::ImageLumaA8(luma_alpha));
        assert!(matches!(result, Err(PipelineError::InvalidImage(_))));

        let sixteen_bit = image::ImageBuffer::<Luma<u16>, _>::new(2, 2);
        let result = normalize(DynamicImage::ImageLuma16(sixteen_bit));
        assert!(matches!(result, Err(PipelineError::InvalidImage(_))));
    }
}
