use crate::capability::PlateReader;
use crate::pipeline::error::PipelineResult;
use common::plate::RecognitionOutput;
use image::RgbImage;

/// Run the recognizer once and fold its tokens into a joined string and a
/// single confidence value.
///
/// An unreadable plate region is a valid low-confidence outcome: no tokens
/// means empty text with confidence exactly 0.0, never an error.
pub async fn recognize(reader: &dyn PlateReader, crop: &RgbImage) -> PipelineResult<(String, f32)> {
    let output = reader.read(crop).await?;
    Ok(aggregate(&output))
}

/// Tokens joined with single spaces in returned order; confidence is the
/// arithmetic mean of the token scores.
pub fn aggregate(output: &RecognitionOutput) -> (String, f32) {
    if output.texts.is_empty() {
        return (String::new(), 0.0);
    }
    let text = output.texts.join(" ");
    let confidence = if output.scores.is_empty() {
        0.0
    } else {
        output.scores.iter().sum::<f32>() / output.scores.len() as f32
    };
    (text, confidence)
}
