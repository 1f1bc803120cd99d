//! Command-line plate OCR: one image in, one JSON result record out.

use anyhow::{Context, Result};
use clap::Parser;
use ocr_service::{
    capability::onnx::{Device, OnnxPlateDetector, OnnxPlateReader, ReaderSettings},
    pipeline::{EngineConfig, PlateOcrEngine},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Detect and read a vehicle registration plate from an image
#[derive(Parser, Debug)]
#[command(name = "plate-ocr-cli")]
#[command(about = "Detect and read a vehicle registration plate from an image")]
struct Args {
    /// Path to the input image
    #[arg(long)]
    image: PathBuf,

    /// Inference device (auto/cpu/cuda[:id])
    #[arg(long, default_value = "auto")]
    device: String,

    /// Detector confidence threshold
    #[arg(long, default_value_t = 0.3)]
    conf: f32,

    /// Where to save the expanded plate crop (optional)
    #[arg(long)]
    save_crop: Option<PathBuf>,

    /// Path to the plate detector ONNX model
    #[arg(long, default_value = "models/plate_detector.onnx")]
    detector_model: PathBuf,

    /// Path to the text recognizer ONNX model
    #[arg(long, default_value = "models/plate_recognizer.onnx")]
    recognizer_model: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_logging("plate-ocr-cli");

    let args = Args::parse();
    let device: Device = args.device.parse()?;

    let image = image::open(&args.image)
        .with_context(|| format!("could not read image from {}", args.image.display()))?;

    let detector = OnnxPlateDetector::load(&args.detector_model, device)?;
    let reader = OnnxPlateReader::load(&args.recognizer_model, device, ReaderSettings::default())?;
    let engine = PlateOcrEngine::new(
        Arc::new(detector),
        Arc::new(reader),
        EngineConfig {
            confidence_threshold: args.conf,
            ..EngineConfig::default()
        },
    );

    let started = Instant::now();
    let outcome = engine.infer(image, args.save_crop.as_deref()).await?;
    let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let response = outcome.to_response(processing_time_ms);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
