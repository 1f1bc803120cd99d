use crate::capability::{DetectOptions, PlateDetector};
use crate::pipeline::error::{PipelineError, PipelineResult};
use common::plate::DetectionCandidate;
use image::RgbImage;

/// Ask the detector for plate regions and pick the single best one.
///
/// Zero candidates is a terminal outcome for the image, not an empty result.
pub async fn localize(
    detector: &dyn PlateDetector,
    image: &RgbImage,
    opts: DetectOptions,
) -> PipelineResult<DetectionCandidate> {
    let candidates = detector.detect(image, opts).await?;
    best_candidate(candidates).ok_or(PipelineError::NoPlateDetected)
}

/// Strictly maximal confidence wins; ties keep the candidate the detector
/// returned first, so repeated calls on the same output are deterministic.
fn best_candidate(candidates: Vec<DetectionCandidate>) -> Option<DetectionCandidate> {
    let mut best: Option<DetectionCandidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.confidence <= current.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::MockPlateDetector;
    use common::plate::BoundingBox;

    fn candidate(x1: u32, confidence: f32) -> DetectionCandidate {
        DetectionCandidate {
            bbox: BoundingBox::new(x1, 10, x1 + 50, 40),
            confidence,
        }
    }

    #[test]
    fn unique_maximum_wins_regardless_of_position() {
        let candidates = vec![candidate(0, 0.4), candidate(100, 0.9), candidate(200, 0.7)];
        let best = best_candidate(candidates).unwrap();
        assert_eq!(best.bbox.x1, 100);

        let reordered = vec![candidate(100, 0.9), candidate(0, 0.4), candidate(200, 0.7)];
        assert_eq!(best_candidate(reordered).unwrap().bbox.x1, 100);
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let candidates = vec![candidate(0, 0.8), candidate(100, 0.8), candidate(200, 0.8)];
        assert_eq!(best_candidate(candidates).unwrap().bbox.x1, 0);
    }

    #[test]
    fn empty_input_has_no_best() {
        assert!(best_candidate(vec![]).is_none());
    }

    #[tokio::test]
    async fn zero_detections_is_a_terminal_failure() {
        let detector = MockPlateDetector::empty();
        let image = RgbImage::new(64, 48);
        let opts = DetectOptions {
            confidence_threshold: 0.3,
            resolution: 320,
        };

        let result = localize(&detector, &image, opts).await;
        assert!(matches!(result, Err(PipelineError::NoPlateDetected)));
    }
}
