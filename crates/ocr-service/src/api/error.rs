use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::plate::ErrorBody;
use std::fmt::{self, Display};

/// Caller-facing error: an HTTP status plus a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The upload itself is unusable (missing field, undecodable bytes).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The image decoded fine but the domain rejected it.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Models are not loaded yet; the caller may retry later.
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Opaque internal fault. The cause stays in the logs.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error while running inference",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for ApiError {}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidImage(_)
            | PipelineError::NoPlateDetected
            | PipelineError::InvalidCrop
            | PipelineError::EmptyCrop => Self::unprocessable(err.to_string()),
            PipelineError::ModelUninitialized => Self::not_ready(err.to_string()),
            PipelineError::Internal(cause) => {
                tracing::error!(error = %cause, "inference failed unexpectedly");
                Self::internal()
            }
        }
    }
}

/// Metric label for a failed inference call.
pub fn outcome_label(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::InvalidImage(_) => "invalid_image",
        PipelineError::NoPlateDetected => "no_plate",
        PipelineError::InvalidCrop => "invalid_crop",
        PipelineError::EmptyCrop => "empty_crop",
        PipelineError::ModelUninitialized => "not_ready",
        PipelineError::Internal(_) => "internal_error",
    }
}
