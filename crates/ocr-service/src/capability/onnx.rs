//! ONNX Runtime backends for the two model capabilities: a YOLO-format
//! plate detector and a CTC text recognizer. Sessions are built once at
//! startup and reused for the life of the process.

use super::{DetectOptions, PlateDetector, PlateReader};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use common::plate::{BoundingBox, DetectionCandidate, RecognitionOutput};
use image::RgbImage;
use ndarray::{Array, IxDyn};
use ort::{
    execution_providers::{CPUExecutionProvider, CUDAExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const DEFAULT_INTRA_THREADS: usize = 4;
const DETECTOR_IOU_THRESHOLD: f32 = 0.45;

/// Output names seen across exported detector models.
const DETECTOR_OUTPUT_NAMES: &[&str] = &["output0", "output"];
/// Output names seen across exported recognizer models.
const READER_OUTPUT_NAMES: &[&str] = &["output", "output0", "logits"];

/// Inference device selector (`auto` / `cpu` / `cuda[:id]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// Prefer CUDA, fall back to CPU when unavailable.
    Auto,
    Cpu,
    Cuda(i32),
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let token = raw.trim().to_lowercase();
        if token.is_empty() || token == "auto" {
            return Ok(Self::Auto);
        }
        if token == "cpu" {
            return Ok(Self::Cpu);
        }
        if token == "cuda" {
            return Ok(Self::Cuda(0));
        }
        if let Some(id) = token.strip_prefix("cuda:") {
            let id = id
                .parse()
                .with_context(|| format!("invalid CUDA device id in {raw:?}"))?;
            return Ok(Self::Cuda(id));
        }
        // A bare ordinal selects that CUDA device.
        if let Ok(id) = token.parse::<i32>() {
            return Ok(Self::Cuda(id));
        }
        bail!("unrecognized device selector: {raw:?}")
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(id) => write!(f, "cuda:{id}"),
        }
    }
}

fn session_builder() -> Result<ort::session::builder::SessionBuilder> {
    Ok(Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(DEFAULT_INTRA_THREADS)?)
}

/// Build a session for the selected device. CUDA registration failures fall
/// back to a plain CPU session rather than aborting startup.
fn build_session(model_path: &Path, device: Device) -> Result<Session> {
    match device {
        Device::Cpu => {
            tracing::info!(model = %model_path.display(), "loading ONNX session on CPU");
            session_builder()?
                .commit_from_file(model_path)
                .with_context(|| format!("failed to load model from {}", model_path.display()))
        }
        Device::Auto | Device::Cuda(_) => {
            let device_id = match device {
                Device::Cuda(id) => id,
                _ => 0,
            };
            let result = session_builder()?
                .with_execution_providers([
                    CUDAExecutionProvider::default()
                        .with_device_id(device_id)
                        .build(),
                    CPUExecutionProvider::default().build(),
                ])?
                .commit_from_file(model_path);

            match result {
                Ok(session) => {
                    tracing::info!(
                        model = %model_path.display(),
                        device = %device,
                        "loaded ONNX session with CUDA provider chain"
                    );
                    Ok(session)
                }
                Err(e) => {
                    tracing::warn!(
                        model = %model_path.display(),
                        error = %e,
                        "CUDA session failed, retrying on CPU"
                    );
                    session_builder()?
                        .commit_from_file(model_path)
                        .with_context(|| {
                            format!("failed to load model from {}", model_path.display())
                        })
                }
            }
        }
    }
}

/// Run one forward pass and hand back the first matching output tensor as an
/// owned (shape, data) pair. Runs on a blocking thread; the session mutex
/// guards ort's mutable run state.
fn run_inference(
    session: Arc<Mutex<Session>>,
    input: Array<f32, IxDyn>,
    output_names: &'static [&'static str],
) -> Result<(Vec<usize>, Vec<f32>)> {
    let input_tensor = Value::from_array(input)?;
    let mut session = session
        .lock()
        .map_err(|e| anyhow!("model session lock poisoned: {e}"))?;
    let outputs = session.run(ort::inputs![input_tensor])?;

    let output_value = output_names
        .iter()
        .find_map(|name| outputs.get(*name))
        .with_context(|| format!("no output tensor found (tried: {})", output_names.join(", ")))?;
    let (shape, data) = output_value.try_extract_tensor::<f32>()?;
    let shape: Vec<usize> = shape.as_ref().iter().map(|&d| d as usize).collect();
    Ok((shape, data.to_vec()))
}

/// Resize to a square NCHW float tensor normalized to [0, 1].
fn preprocess_rgb(image: &RgbImage, size: u32) -> Array<f32, IxDyn> {
    let resized = image::imageops::resize(image, size, size, image::imageops::FilterType::Triangle);

    let mut input = Array::zeros(IxDyn(&[1, 3, size as usize, size as usize]));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Resize to the recognizer's geometry and collapse to a grayscale NCHW
/// tensor normalized to [0, 1].
fn preprocess_gray(crop: &RgbImage, width: u32, height: u32) -> Array<f32, IxDyn> {
    let resized =
        image::imageops::resize(crop, width, height, image::imageops::FilterType::Triangle);
    let gray = image::DynamicImage::ImageRgb8(resized).to_luma8();

    let mut input = Array::zeros(IxDyn(&[1, 1, height as usize, width as usize]));
    for (x, y, pixel) in gray.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
    }
    input
}

/// Intersection over union of two corner-form boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = if x2 > x1 && y2 > y1 {
        ((x2 - x1) * (y2 - y1)) as f32
    } else {
        0.0
    };

    let union =
        (a.width() * a.height()) as f32 + (b.width() * b.height()) as f32 - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy NMS; the survivors come out in descending confidence order.
fn nms(mut candidates: Vec<DetectionCandidate>, iou_threshold: f32) -> Vec<DetectionCandidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<DetectionCandidate> = Vec::new();
    for candidate in candidates {
        if keep
            .iter()
            .all(|kept| iou(&kept.bbox, &candidate.bbox) < iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Decode a YOLO-format `[1, 5, N]` detection head (cx, cy, w, h,
/// confidence at inference resolution) into source-coordinate candidates.
fn decode_boxes(
    output: &Array<f32, IxDyn>,
    opts: DetectOptions,
    orig_width: u32,
    orig_height: u32,
    iou_threshold: f32,
) -> Vec<DetectionCandidate> {
    let scale_x = orig_width as f32 / opts.resolution as f32;
    let scale_y = orig_height as f32 / opts.resolution as f32;
    let num_predictions = output.shape()[2];

    let mut candidates = Vec::new();
    for i in 0..num_predictions {
        let confidence = output[[0, 4, i]];
        if confidence < opts.confidence_threshold {
            continue;
        }

        let cx = output[[0, 0, i]];
        let cy = output[[0, 1, i]];
        let w = output[[0, 2, i]];
        let h = output[[0, 3, i]];

        let x1 = ((cx - w / 2.0) * scale_x).max(0.0) as u32;
        let y1 = ((cy - h / 2.0) * scale_y).max(0.0) as u32;
        let x2 = ((cx + w / 2.0) * scale_x).min(orig_width as f32) as u32;
        let y2 = ((cy + h / 2.0) * scale_y).min(orig_height as f32) as u32;

        candidates.push(DetectionCandidate {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence,
        });
    }

    nms(candidates, iou_threshold)
}

/// Plate detector backed by a YOLO-format ONNX model.
pub struct OnnxPlateDetector {
    session: Arc<Mutex<Session>>,
    iou_threshold: f32,
}

impl OnnxPlateDetector {
    pub fn load(model_path: &Path, device: Device) -> Result<Self> {
        let session = build_session(model_path, device)?;
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            iou_threshold: DETECTOR_IOU_THRESHOLD,
        })
    }
}

#[async_trait]
impl PlateDetector for OnnxPlateDetector {
    async fn detect(
        &self,
        image: &RgbImage,
        opts: DetectOptions,
    ) -> Result<Vec<DetectionCandidate>> {
        let (orig_width, orig_height) = image.dimensions();
        let input = preprocess_rgb(image, opts.resolution);

        let session = Arc::clone(&self.session);
        let (shape, data) =
            tokio::task::spawn_blocking(move || run_inference(session, input, DETECTOR_OUTPUT_NAMES))
                .await
                .context("detector inference task aborted")??;

        if shape.len() != 3 || shape[1] < 5 {
            bail!("unexpected detector output shape {shape:?}");
        }
        let output = Array::from_shape_vec(IxDyn(&shape), data)?;

        Ok(decode_boxes(
            &output,
            opts,
            orig_width,
            orig_height,
            self.iou_threshold,
        ))
    }
}

/// Recognizer input geometry and vocabulary.
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub input_width: u32,
    pub input_height: u32,

    /// CTC vocabulary; blank sits at class 0, characters start at 1.
    pub vocab: String,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            input_width: 200,
            input_height: 64,
            vocab: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-.".to_string(),
        }
    }
}

/// Text recognizer backed by a CTC ONNX model.
pub struct OnnxPlateReader {
    session: Arc<Mutex<Session>>,
    settings: ReaderSettings,
    vocab: Vec<char>,
}

impl OnnxPlateReader {
    pub fn load(model_path: &Path, device: Device, settings: ReaderSettings) -> Result<Self> {
        let session = build_session(model_path, device)?;
        let vocab = settings.vocab.chars().collect();
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            settings,
            vocab,
        })
    }
}

#[async_trait]
impl PlateReader for OnnxPlateReader {
    async fn read(&self, crop: &RgbImage) -> Result<RecognitionOutput> {
        let input = preprocess_gray(crop, self.settings.input_width, self.settings.input_height);

        let session = Arc::clone(&self.session);
        let (shape, data) =
            tokio::task::spawn_blocking(move || run_inference(session, input, READER_OUTPUT_NAMES))
                .await
                .context("recognizer inference task aborted")??;

        if shape.len() != 3 {
            bail!("unexpected recognizer output shape {shape:?}");
        }
        let output = Array::from_shape_vec(IxDyn(&shape), data)?;

        Ok(ctc_decode(&output, &self.vocab))
    }
}

/// Greedy CTC decode over a `[1, T, V]` head: skip blanks and repeats, map
/// surviving classes through the vocabulary. The whole decode is one token
/// whose score is the mean softmax probability of its emitted characters.
fn ctc_decode(output: &Array<f32, IxDyn>, vocab: &[char]) -> RecognitionOutput {
    let steps = output.shape()[1];
    let classes = output.shape()[2];

    let mut text = String::new();
    let mut char_probs: Vec<f32> = Vec::new();
    let mut prev_class = 0usize;

    for t in 0..steps {
        let mut max_logit = f32::NEG_INFINITY;
        let mut max_class = 0usize;
        for c in 0..classes {
            let logit = output[[0, t, c]];
            if logit > max_logit {
                max_logit = logit;
                max_class = c;
            }
        }

        // Softmax probability of the winning class, stabilized on the max.
        let denom: f32 = (0..classes)
            .map(|c| (output[[0, t, c]] - max_logit).exp())
            .sum();
        let prob = 1.0 / denom;

        if max_class != 0 && max_class != prev_class {
            if let Some(&ch) = vocab.get(max_class - 1) {
                text.push(ch);
                char_probs.push(prob);
            }
        }
        prev_class = max_class;
    }

    if text.is_empty() {
        return RecognitionOutput::default();
    }
    let score = char_probs.iter().sum::<f32>() / char_probs.len() as f32;
    RecognitionOutput {
        texts: vec![text],
        scores: vec![score],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_selector_parsing() {
        assert_eq!("auto".parse::<Device>().unwrap(), Device::Auto);
        assert_eq!("".parse::<Device>().unwrap(), Device::Auto);
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Cuda(1));
        assert_eq!("1".parse::<Device>().unwrap(), Device::Cuda(1));
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::new(10, 10, 60, 60);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-3);

        let b = BoundingBox::new(100, 100, 150, 150);
        assert_eq!(iou(&a, &b), 0.0);

        let c = BoundingBox::new(30, 30, 80, 80);
        let partial = iou(&a, &c);
        assert!(partial > 0.0 && partial < 1.0);
    }

    #[test]
    fn nms_suppresses_overlapping_boxes() {
        let candidates = vec![
            DetectionCandidate {
                bbox: BoundingBox::new(10, 10, 60, 60),
                confidence: 0.8,
            },
            DetectionCandidate {
                bbox: BoundingBox::new(12, 12, 62, 62),
                confidence: 0.9,
            },
            DetectionCandidate {
                bbox: BoundingBox::new(100, 100, 150, 150),
                confidence: 0.7,
            },
        ];

        let kept = nms(candidates, 0.45);
        assert_eq!(kept.len(), 2);
        // Highest confidence survives first; its overlapping rival is gone.
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn decode_boxes_rescales_to_source_coordinates() {
        // Two predictions at 320x320 inference resolution; one below
        // threshold, one centered at (50, 50) with a 20x10 extent.
        let mut output = Array::zeros(IxDyn(&[1, 5, 2]));
        output[[0, 0, 0]] = 50.0;
        output[[0, 1, 0]] = 50.0;
        output[[0, 2, 0]] = 20.0;
        output[[0, 3, 0]] = 10.0;
        output[[0, 4, 0]] = 0.9;
        output[[0, 4, 1]] = 0.1;

        let opts = DetectOptions {
            confidence_threshold: 0.3,
            resolution: 320,
        };
        let candidates = decode_boxes(&output, opts, 640, 480, 0.45);

        assert_eq!(candidates.len(), 1);
        let best = &candidates[0];
        assert_eq!(best.bbox, BoundingBox::new(80, 67, 120, 82));
        assert!((best.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn ctc_decode_skips_blanks_and_repeats() {
        // Vocabulary "AB"; classes: 0 = blank, 1 = 'A', 2 = 'B'.
        let vocab: Vec<char> = "AB".chars().collect();
        let mut output = Array::zeros(IxDyn(&[1, 4, 3]));
        // t0: blank, t1: 'A', t2: 'A' repeated, t3: 'B'
        output[[0, 0, 0]] = 5.0;
        output[[0, 1, 1]] = 5.0;
        output[[0, 2, 1]] = 5.0;
        output[[0, 3, 2]] = 5.0;

        let decoded = ctc_decode(&output, &vocab);
        assert_eq!(decoded.texts, vec!["AB".to_string()]);
        assert_eq!(decoded.scores.len(), 1);
        assert!(decoded.scores[0] > 0.0 && decoded.scores[0] <= 1.0);
    }

    #[test]
    fn ctc_decode_of_all_blanks_is_empty() {
        let vocab: Vec<char> = "AB".chars().collect();
        let mut output = Array::zeros(IxDyn(&[1, 3, 3]));
        for t in 0..3 {
            output[[0, t, 0]] = 5.0;
        }

        let decoded = ctc_decode(&output, &vocab);
        assert!(decoded.is_empty());
        assert!(decoded.scores.is_empty());
    }
}
