//! The two model capabilities the pipeline consumes. Both are opaque: the
//! pipeline never assumes anything about model internals beyond these
//! contracts, so concrete backends can be swapped or mocked freely.

pub mod mock;
pub mod onnx;

use anyhow::Result;
use async_trait::async_trait;
use common::plate::{DetectionCandidate, RecognitionOutput};
use image::RgbImage;

/// Per-call options forwarded to the detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectOptions {
    /// Candidates below this confidence are discarded.
    pub confidence_threshold: f32,

    /// Square resolution the detector infers at.
    pub resolution: u32,
}

/// Plate localization capability: propose plate regions for an image.
#[async_trait]
pub trait PlateDetector: Send + Sync {
    /// Candidate boxes in source-image pixel coordinates, in the order the
    /// model produced them.
    async fn detect(
        &self,
        image: &RgbImage,
        opts: DetectOptions,
    ) -> Result<Vec<DetectionCandidate>>;
}

/// Text recognition capability: read the tokens printed on a cropped plate.
#[async_trait]
pub trait PlateReader: Send + Sync {
    /// Token texts with index-aligned scores. Empty output means the region
    /// was unreadable, which is a valid outcome, not an error.
    async fn read(&self, crop: &RgbImage) -> Result<RecognitionOutput>;
}
