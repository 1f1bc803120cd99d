use crate::pipeline::error::{PipelineError, PipelineResult};
use common::plate::BoundingBox;
use image::RgbImage;

/// Clamp a raw detector box against the canvas.
///
/// Coordinates are clipped into `[0, width]` x `[0, height]` independently
/// before validity is checked; a clipped box without positive extent means
/// the detector returned a region entirely outside the image.
pub fn clip_box(raw: BoundingBox, width: u32, height: u32) -> PipelineResult<BoundingBox> {
    let clipped = BoundingBox::new(
        raw.x1.min(width),
        raw.y1.min(height),
        raw.x2.min(width),
        raw.y2.min(height),
    );
    if clipped.x2 <= clipped.x1 || clipped.y2 <= clipped.y1 {
        return Err(PipelineError::InvalidCrop);
    }
    Ok(clipped)
}

/// Grow a clipped box by `ratio` of its own height on every side, re-clipped
/// to the canvas. The margin keeps the recognizer from reading characters
/// clipped at the plate edge.
pub fn expand_box(bbox: BoundingBox, ratio: f32, width: u32, height: u32) -> BoundingBox {
    let margin = (bbox.height() as f32 * ratio).round() as u32;
    BoundingBox::new(
        bbox.x1.saturating_sub(margin),
        bbox.y1.saturating_sub(margin),
        bbox.x2.saturating_add(margin).min(width),
        bbox.y2.saturating_add(margin).min(height),
    )
}

/// Clip, expand, and crop the plate region out of the source image.
///
/// Returns the crop together with the clipped (pre-expansion) box, which is
/// what callers report as the plate location.
pub fn expand_and_crop(
    image: &RgbImage,
    raw: BoundingBox,
    ratio: f32,
) -> PipelineResult<(RgbImage, BoundingBox)> {
    let (width, height) = image.dimensions();
    let clipped = clip_box(raw, width, height)?;
    let expanded = expand_box(clipped, ratio, width, height);

    let crop = image::imageops::crop_imm(
        image,
        expanded.x1,
        expanded.y1,
        expanded.width(),
        expanded.height(),
    )
    .to_image();

    if crop.width() == 0 || crop.height() == 0 {
        return Err(PipelineError::EmptyCrop);
    }
    Ok((crop, clipped))
}
