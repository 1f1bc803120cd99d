use crate::pipeline::{PipelineError, PipelineResult, PlateOcrEngine, PlateOcrOutcome};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Shared service state.
///
/// The engine slot starts empty and is filled exactly once when background
/// model initialization completes; until then every inference request is
/// rejected as not-ready instead of queueing. The inference gate serializes
/// all access to the shared model sessions: waiters queue fairly in arrival
/// order, and the guard is released on every exit path.
#[derive(Clone)]
pub struct OcrServiceState {
    inner: Arc<OcrServiceStateInner>,
}

struct OcrServiceStateInner {
    instance_id: String,
    engine: RwLock<Option<Arc<PlateOcrEngine>>>,
    infer_gate: Mutex<()>,
    crop_dir: Option<PathBuf>,
}

/// RAII wrapper around the queue-depth gauge so a caller abandoned while
/// waiting still decrements it.
struct GateWaiter;

impl GateWaiter {
    fn enter() -> Self {
        telemetry::metrics::PLATE_OCR_GATE_WAITERS.inc();
        Self
    }
}

impl Drop for GateWaiter {
    fn drop(&mut self) {
        telemetry::metrics::PLATE_OCR_GATE_WAITERS.dec();
    }
}

impl OcrServiceState {
    pub fn new(instance_id: String, crop_dir: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(OcrServiceStateInner {
                instance_id,
                engine: RwLock::new(None),
                infer_gate: Mutex::new(()),
                crop_dir,
            }),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    /// Install the engine once startup initialization finishes; flips the
    /// service to ready.
    pub async fn install_engine(&self, engine: PlateOcrEngine) {
        let mut slot = self.inner.engine.write().await;
        *slot = Some(Arc::new(engine));
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.engine.read().await.is_some()
    }

    /// One serialized inference call. Returns the outcome together with the
    /// wall time spent, queueing included.
    pub async fn infer(
        &self,
        image: DynamicImage,
    ) -> PipelineResult<(PlateOcrOutcome, f64)> {
        let engine = self
            .inner
            .engine
            .read()
            .await
            .clone()
            .ok_or(PipelineError::ModelUninitialized)?;

        let started = Instant::now();
        let waiter = GateWaiter::enter();
        let _gate = self.inner.infer_gate.lock().await;
        drop(waiter);

        let save_to = self.crop_destination();
        let result = engine.infer(image, save_to.as_deref()).await;

        let elapsed = started.elapsed();
        telemetry::metrics::PLATE_OCR_PROCESSING_TIME.observe(elapsed.as_secs_f64());

        result.map(|outcome| (outcome, elapsed.as_secs_f64() * 1000.0))
    }

    /// Fresh crop destination under the configured directory, if any.
    fn crop_destination(&self) -> Option<PathBuf> {
        self.inner
            .crop_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.jpg", uuid::Uuid::new_v4())))
    }
}
