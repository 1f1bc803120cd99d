//! Scripted model capabilities for tests and model-free development runs.

use super::{DetectOptions, PlateDetector, PlateReader};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use common::plate::{DetectionCandidate, RecognitionOutput};
use image::RgbImage;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared log of (enter, exit) instants, one pair per capability call.
/// Lets tests assert that model use never overlaps across requests.
pub type CallIntervals = Arc<Mutex<Vec<(Instant, Instant)>>>;

pub fn call_intervals() -> CallIntervals {
    Arc::new(Mutex::new(Vec::new()))
}

/// Detector that returns a scripted candidate list.
#[derive(Default)]
pub struct MockPlateDetector {
    candidates: Vec<DetectionCandidate>,
    fail: bool,
    work: Duration,
    intervals: Option<CallIntervals>,
}

impl MockPlateDetector {
    pub fn returning(candidates: Vec<DetectionCandidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    /// Detector that never finds a plate.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Detector whose backend faults on every call.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Simulate model latency; useful for overlap assertions.
    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    pub fn with_intervals(mut self, intervals: CallIntervals) -> Self {
        self.intervals = Some(intervals);
        self
    }
}

#[async_trait]
impl PlateDetector for MockPlateDetector {
    async fn detect(
        &self,
        _image: &RgbImage,
        opts: DetectOptions,
    ) -> Result<Vec<DetectionCandidate>> {
        let entered = Instant::now();
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }

        let result = if self.fail {
            Err(anyhow!("scripted detector failure"))
        } else {
            Ok(self
                .candidates
                .iter()
                .copied()
                .filter(|c| c.confidence >= opts.confidence_threshold)
                .collect())
        };

        if let Some(log) = &self.intervals {
            log.lock().push((entered, Instant::now()));
        }
        result
    }
}

/// Reader that returns a scripted recognition output.
#[derive(Default)]
pub struct MockPlateReader {
    output: RecognitionOutput,
    fail: bool,
    work: Duration,
    intervals: Option<CallIntervals>,
}

impl MockPlateReader {
    pub fn returning(output: RecognitionOutput) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    /// Reader that finds no text at all.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_work(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    pub fn with_intervals(mut self, intervals: CallIntervals) -> Self {
        self.intervals = Some(intervals);
        self
    }
}

#[async_trait]
impl PlateReader for MockPlateReader {
    async fn read(&self, _crop: &RgbImage) -> Result<RecognitionOutput> {
        let entered = Instant::now();
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }

        let result = if self.fail {
            Err(anyhow!("scripted reader failure"))
        } else {
            Ok(self.output.clone())
        };

        if let Some(log) = &self.intervals {
            log.lock().push((entered, Instant::now()));
        }
        result
    }
}
