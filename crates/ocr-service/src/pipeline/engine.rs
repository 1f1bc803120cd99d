use crate::capability::{DetectOptions, PlateDetector, PlateReader};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::{crop, localize, normalize, recognize, text};
use common::plate::{BoundingBox, PlateOcrResponse};
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Engine settings, immutable after construction and shared read-only by
/// every inference call.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Detector candidates below this confidence are discarded.
    pub confidence_threshold: f32,

    /// Square resolution the detector infers at.
    pub detector_resolution: u32,

    /// Fractional margin added around the detected plate before recognition.
    pub expand_ratio: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            detector_resolution: 320,
            expand_ratio: 0.2,
        }
    }
}

/// Final artifact of one completed inference call.
#[derive(Debug, Clone)]
pub struct PlateOcrOutcome {
    /// Normalized plate text; empty when the region was unreadable.
    pub text: String,

    /// Mean recognizer token score in [0, 1].
    pub confidence: f32,

    /// Clipped plate box in source-image pixel coordinates.
    pub bbox: BoundingBox,

    /// Where the expanded crop was persisted, if requested.
    pub crop_path: Option<PathBuf>,
}

impl PlateOcrOutcome {
    /// Wire form of this outcome.
    pub fn to_response(&self, processing_time_ms: f64) -> PlateOcrResponse {
        PlateOcrResponse {
            plate_text: self.text.clone(),
            confidence: self.confidence,
            bbox_xyxy: self.bbox.xyxy(),
            crop_path: self
                .crop_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            processing_time_ms,
        }
    }
}

/// End-to-end plate OCR: normalize, localize, crop with safety expansion,
/// recognize, postprocess.
///
/// The engine holds the two model capabilities but enforces no concurrency
/// discipline of its own; callers serialize access through
/// [`crate::state::OcrServiceState`].
pub struct PlateOcrEngine {
    detector: Arc<dyn PlateDetector>,
    reader: Arc<dyn PlateReader>,
    config: EngineConfig,
}

impl PlateOcrEngine {
    pub fn new(
        detector: Arc<dyn PlateDetector>,
        reader: Arc<dyn PlateReader>,
        config: EngineConfig,
    ) -> Self {
        Self {
            detector,
            reader,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One inference call. No step is retried; localization and cropping
    /// failures abort with their originating error.
    pub async fn infer(
        &self,
        image: DynamicImage,
        save_crop_to: Option<&Path>,
    ) -> PipelineResult<PlateOcrOutcome> {
        let image = normalize::normalize(image)?;

        let opts = DetectOptions {
            confidence_threshold: self.config.confidence_threshold,
            resolution: self.config.detector_resolution,
        };

        let detect_started = Instant::now();
        let best = localize::localize(self.detector.as_ref(), &image, opts).await?;
        telemetry::metrics::PLATE_OCR_STAGE_TIME
            .with_label_values(&["detect"])
            .observe(detect_started.elapsed().as_secs_f64());

        let (plate_crop, bbox) = crop::expand_and_crop(&image, best.bbox, self.config.expand_ratio)?;

        let recognize_started = Instant::now();
        let (raw_text, confidence) =
            recognize::recognize(self.reader.as_ref(), &plate_crop).await?;
        telemetry::metrics::PLATE_OCR_STAGE_TIME
            .with_label_values(&["recognize"])
            .observe(recognize_started.elapsed().as_secs_f64());

        let text = text::normalize_plate_text(&raw_text);

        let crop_path = match save_crop_to {
            Some(dest) => Some(persist_crop(&plate_crop, dest)?),
            None => None,
        };

        tracing::debug!(
            plate = %text,
            confidence,
            detector_confidence = best.confidence,
            "inference complete"
        );

        Ok(PlateOcrOutcome {
            text,
            confidence,
            bbox,
            crop_path,
        })
    }
}

/// Save the expanded crop, creating parent directories as needed. A side
/// effect only; failure here does not invalidate the recognition result but
/// is surfaced so callers learn the path is missing.
fn persist_crop(plate_crop: &RgbImage, dest: &Path) -> PipelineResult<PathBuf> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PipelineError::Internal(anyhow::Error::new(e)))?;
        }
    }
    plate_crop
        .save(dest)
        .map_err(|e| PipelineError::Internal(anyhow::Error::new(e)))?;
    Ok(dest.to_path_buf())
}
