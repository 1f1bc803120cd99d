use crate::api::error::{outcome_label, ApiError};
use crate::state::OcrServiceState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::plate::PlateOcrResponse;
use serde_json::json;

/// Run plate OCR on an uploaded image.
///
/// Expects a multipart form with a `file` field holding raw image bytes.
pub async fn plate_ocr(
    State(state): State<OcrServiceState>,
    multipart: Multipart,
) -> Result<Json<PlateOcrResponse>, ApiError> {
    let bytes = read_upload(multipart).await?;

    let image = image::load_from_memory(&bytes).map_err(|e| {
        telemetry::metrics::PLATE_OCR_REQUESTS
            .with_label_values(&["bad_upload"])
            .inc();
        ApiError::bad_request(format!("could not decode image: {e}"))
    })?;

    match state.infer(image).await {
        Ok((outcome, processing_time_ms)) => {
            telemetry::metrics::PLATE_OCR_REQUESTS
                .with_label_values(&["ok"])
                .inc();
            Ok(Json(outcome.to_response(processing_time_ms)))
        }
        Err(err) => {
            telemetry::metrics::PLATE_OCR_REQUESTS
                .with_label_values(&[outcome_label(&err)])
                .inc();
            Err(err.into())
        }
    }
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("could not read upload: {e}")))?;
            if bytes.is_empty() {
                return Err(ApiError::bad_request("uploaded file is empty"));
            }
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::bad_request("missing multipart field 'file'"))
}

/// Liveness probe.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "plate-ocr"
        })),
    )
}

/// Readiness probe: ready once model initialization has completed.
pub async fn readyz(State(state): State<OcrServiceState>) -> impl IntoResponse {
    if state.is_ready().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "instance": state.instance_id()
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "initializing",
                "instance": state.instance_id()
            })),
        )
    }
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> impl IntoResponse {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = telemetry::metrics::REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s.into_response(),
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to convert metrics",
            )
                .into_response()
        }
    }
}
