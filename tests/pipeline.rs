/// Engine-level tests for the inference pipeline, run against scripted
/// model capabilities.
use common::plate::{BoundingBox, DetectionCandidate, RecognitionOutput};
use image::DynamicImage;
use ocr_service::{
    capability::mock::{MockPlateDetector, MockPlateReader},
    pipeline::{EngineConfig, PipelineError, PlateOcrEngine},
};
use std::sync::Arc;

fn engine(detector: MockPlateDetector, reader: MockPlateReader) -> PlateOcrEngine {
    PlateOcrEngine::new(
        Arc::new(detector),
        Arc::new(reader),
        EngineConfig::default(),
    )
}

fn gray_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([90, 90, 90]),
    ))
}

fn spec_candidate() -> DetectionCandidate {
    DetectionCandidate {
        bbox: BoundingBox::new(100, 100, 200, 150),
        confidence: 0.9,
    }
}

fn spec_recognition() -> RecognitionOutput {
    RecognitionOutput {
        texts: vec!["51F".to_string(), "123.45".to_string()],
        scores: vec![0.95, 0.85],
    }
}

#[tokio::test]
async fn test_reference_scenario() {
    let engine = engine(
        MockPlateDetector::returning(vec![spec_candidate()]),
        MockPlateReader::returning(spec_recognition()),
    );

    let outcome = engine.infer(gray_image(640, 480), None).await.unwrap();
    assert_eq!(outcome.text, "51F123.45");
    assert!((outcome.confidence - 0.90).abs() < 1e-6);
    assert_eq!(outcome.bbox, BoundingBox::new(100, 100, 200, 150));
    assert!(outcome.crop_path.is_none());
}

#[tokio::test]
async fn test_selection_prefers_highest_confidence() {
    let candidates = vec![
        DetectionCandidate {
            bbox: BoundingBox::new(10, 10, 60, 40),
            confidence: 0.5,
        },
        spec_candidate(),
        DetectionCandidate {
            bbox: BoundingBox::new(300, 300, 400, 350),
            confidence: 0.7,
        },
    ];
    let engine = engine(
        MockPlateDetector::returning(candidates),
        MockPlateReader::returning(spec_recognition()),
    );

    let outcome = engine.infer(gray_image(640, 480), None).await.unwrap();
    assert_eq!(outcome.bbox, BoundingBox::new(100, 100, 200, 150));
}

#[tokio::test]
async fn test_below_threshold_candidates_mean_no_plate() {
    let faint = DetectionCandidate {
        bbox: BoundingBox::new(100, 100, 200, 150),
        confidence: 0.1,
    };
    let engine = engine(
        MockPlateDetector::returning(vec![faint]),
        MockPlateReader::returning(spec_recognition()),
    );

    let result = engine.infer(gray_image(640, 480), None).await;
    assert!(matches!(result, Err(PipelineError::NoPlateDetected)));
}

#[tokio::test]
async fn test_crop_is_persisted_with_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("crops").join("today").join("plate.png");

    let engine = engine(
        MockPlateDetector::returning(vec![spec_candidate()]),
        MockPlateReader::returning(spec_recognition()),
    );

    let outcome = engine
        .infer(gray_image(640, 480), Some(&dest))
        .await
        .unwrap();

    assert_eq!(outcome.crop_path.as_deref(), Some(dest.as_path()));
    assert!(dest.is_file());

    // The persisted crop carries the expanded geometry: (90,90)-(210,160).
    let saved = image::open(&dest).unwrap();
    assert_eq!(saved.width(), 120);
    assert_eq!(saved.height(), 70);
}

#[tokio::test]
async fn test_persistence_does_not_change_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("plate.png");

    let with_save = engine(
        MockPlateDetector::returning(vec![spec_candidate()]),
        MockPlateReader::returning(spec_recognition()),
    )
    .infer(gray_image(640, 480), Some(&dest))
    .await
    .unwrap();

    let without_save = engine(
        MockPlateDetector::returning(vec![spec_candidate()]),
        MockPlateReader::returning(spec_recognition()),
    )
    .infer(gray_image(640, 480), None)
    .await
    .unwrap();

    assert_eq!(with_save.text, without_save.text);
    assert_eq!(with_save.confidence, without_save.confidence);
    assert_eq!(with_save.bbox, without_save.bbox);
}

#[tokio::test]
async fn test_detector_fault_surfaces_as_internal() {
    let engine = engine(
        MockPlateDetector::failing(),
        MockPlateReader::returning(spec_recognition()),
    );

    let result = engine.infer(gray_image(640, 480), None).await;
    assert!(matches!(result, Err(PipelineError::Internal(_))));
}

#[tokio::test]
async fn test_unsupported_layout_is_rejected_before_detection() {
    // A failing detector proves normalization rejects the image first.
    let engine = engine(MockPlateDetector::failing(), MockPlateReader::silent());

    let sixteen_bit =
        DynamicImage::ImageLuma16(image::ImageBuffer::<image::Luma<u16>, _>::new(64, 48));
    let result = engine.infer(sixteen_bit, None).await;
    assert!(matches!(result, Err(PipelineError::InvalidImage(_))));
}
