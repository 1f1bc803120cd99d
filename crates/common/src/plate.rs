//! Plate OCR contracts shared between the service, its binaries, and the
//! integration suites: detection geometry, recognizer output, and the wire
//! format returned by the HTTP boundary.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel coordinates.
///
/// A box handed past clipping always satisfies `x1 < x2` and `y1 < y2`;
/// anything else is a detection failure upstream, never an empty box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Corner form used on the wire.
    pub fn xyxy(&self) -> [u32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One plate region proposed by the detector for an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub bbox: BoundingBox,

    /// Detector certainty in [0, 1]; not a calibrated probability.
    pub confidence: f32,
}

/// Raw recognizer output for one cropped plate: text tokens and their
/// index-aligned scores (`scores[i]` belongs to `texts[i]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutput {
    pub texts: Vec<String>,
    pub scores: Vec<f32>,
}

impl RecognitionOutput {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Body returned by `POST /api/plate-ocr` on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateOcrResponse {
    /// Normalized plate text; empty when the plate region was unreadable.
    pub plate_text: String,

    /// Mean recognizer token score in [0, 1]; 0.0 when nothing was read.
    pub confidence: f32,

    /// Selected plate box as `[x1, y1, x2, y2]` in source-image pixels.
    pub bbox_xyxy: [u32; 4],

    /// Where the expanded crop was persisted, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_path: Option<String>,

    /// Wall time spent inside the serialized inference call.
    pub processing_time_ms: f64,
}

/// JSON error body shared by every failure status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_extent() {
        let bbox = BoundingBox::new(100, 100, 200, 150);
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 50);
        assert_eq!(bbox.xyxy(), [100, 100, 200, 150]);
    }

    #[test]
    fn response_wire_shape() {
        let response = PlateOcrResponse {
            plate_text: "51F12345".to_string(),
            confidence: 0.9,
            bbox_xyxy: [100, 100, 200, 150],
            crop_path: None,
            processing_time_ms: 12.5,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["plate_text"], "51F12345");
        assert_eq!(value["bbox_xyxy"], serde_json::json!([100, 100, 200, 150]));
        // Absent crop paths stay off the wire entirely.
        assert!(value.get("crop_path").is_none());
    }
}
