use crate::capability::onnx::Device;
use crate::pipeline::EngineConfig;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once from the environment at startup and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: String,

    /// Path to the plate detector ONNX model
    pub detector_model: PathBuf,

    /// Path to the text recognizer ONNX model
    pub recognizer_model: PathBuf,

    /// Inference device (auto/cpu/cuda[:id])
    pub device: Device,

    /// Detector confidence threshold
    pub confidence_threshold: f32,

    /// Square resolution the detector infers at
    pub detector_resolution: u32,

    /// Fractional margin added around detected plates
    pub expand_ratio: f32,

    /// Directory to persist plate crops into (disabled when unset)
    pub crop_dir: Option<PathBuf>,

    /// Identifier for this service instance
    pub instance_id: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            env::var("PLATE_OCR_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let detector_model = PathBuf::from(
            env::var("PLATE_DETECTOR_MODEL")
                .unwrap_or_else(|_| "models/plate_detector.onnx".to_string()),
        );
        let recognizer_model = PathBuf::from(
            env::var("PLATE_RECOGNIZER_MODEL")
                .unwrap_or_else(|_| "models/plate_recognizer.onnx".to_string()),
        );

        let device = env::var("PLATE_OCR_DEVICE")
            .unwrap_or_else(|_| "auto".to_string())
            .parse::<Device>()
            .context("invalid PLATE_OCR_DEVICE")?;

        let confidence_threshold = parse_or("PLATE_OCR_CONFIDENCE", 0.3)?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            bail!("PLATE_OCR_CONFIDENCE must be within [0, 1]");
        }

        let detector_resolution: u32 = parse_or("PLATE_OCR_RESOLUTION", 320)?;
        if detector_resolution == 0 {
            bail!("PLATE_OCR_RESOLUTION must be positive");
        }

        let expand_ratio = parse_or("PLATE_OCR_EXPAND_RATIO", 0.2)?;
        if expand_ratio < 0.0 {
            bail!("PLATE_OCR_EXPAND_RATIO must not be negative");
        }

        let crop_dir = env::var("PLATE_OCR_CROP_DIR").ok().map(PathBuf::from);

        let instance_id = env::var("INSTANCE_ID").unwrap_or_else(|_| {
            format!(
                "plate-ocr-{}",
                hostname::get()
                    .ok()
                    .and_then(|h| h.into_string().ok())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
            )
        });

        Ok(Self {
            bind_addr,
            detector_model,
            recognizer_model,
            device,
            confidence_threshold,
            detector_resolution,
            expand_ratio,
            crop_dir,
            instance_id,
        })
    }

    /// The subset of settings the engine carries per call.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            confidence_threshold: self.confidence_threshold,
            detector_resolution: self.detector_resolution,
            expand_ratio: self.expand_ratio,
        }
    }
}

fn parse_or<T>(var: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {var}: {raw}")),
        Err(_) => Ok(default),
    }
}
