use thiserror::Error;

/// Failure taxonomy for one inference call.
///
/// The first four variants are domain outcomes of the input image, not
/// system faults; `Internal` wraps anything unexpected from the model
/// capabilities and keeps the cause out of caller-facing messages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unsupported channel layout at ingestion. The caller must fix the
    /// input; retrying the same bytes cannot succeed.
    #[error("unsupported image layout: {0}")]
    InvalidImage(String),

    /// The detector found nothing above threshold.
    #[error("no plate detected in the image")]
    NoPlateDetected,

    /// The detector's box degenerated after clipping against the canvas.
    #[error("plate region is invalid after clipping")]
    InvalidCrop,

    /// Cropping produced a zero-sized buffer despite a non-degenerate box.
    #[error("plate region could not be cropped")]
    EmptyCrop,

    /// Inference was requested before model initialization finished.
    /// Retryable once the service reports ready.
    #[error("models are still initializing")]
    ModelUninitialized,

    /// Unexpected failure inside the detector or recognizer. Logged with its
    /// cause; surfaced to callers as an opaque internal fault.
    #[error("internal inference failure")]
    Internal(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
