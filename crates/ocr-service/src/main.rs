use anyhow::Result;
use ocr_service::{
    api,
    capability::onnx::{OnnxPlateDetector, OnnxPlateReader, ReaderSettings},
    config::ServiceConfig,
    pipeline::PlateOcrEngine,
    state::OcrServiceState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_logging("plate-ocr");

    info!("Starting plate OCR service...");

    let config = ServiceConfig::from_env()?;
    info!(
        "Configuration: bind={}, device={}, instance={}",
        config.bind_addr, config.device, config.instance_id
    );

    let state = OcrServiceState::new(config.instance_id.clone(), config.crop_dir.clone());

    // Model weights load in the background; the service answers 503 until
    // the engine lands in the state slot.
    let init_state = state.clone();
    let init_config = config.clone();
    tokio::spawn(async move {
        match build_engine(init_config).await {
            Ok(engine) => {
                init_state.install_engine(engine).await;
                info!("Model initialization complete, service is ready");
            }
            Err(e) => {
                error!("Model initialization failed, service stays not-ready: {e:#}");
            }
        }
    });

    let app = api::router(state);

    info!("Binding to {}", config.bind_addr);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Plate OCR service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_engine(config: ServiceConfig) -> Result<PlateOcrEngine> {
    let engine_config = config.engine_config();
    let (detector, reader) = tokio::task::spawn_blocking(move || -> Result<_> {
        let detector = OnnxPlateDetector::load(&config.detector_model, config.device)?;
        let reader = OnnxPlateReader::load(
            &config.recognizer_model,
            config.device,
            ReaderSettings::default(),
        )?;
        Ok((detector, reader))
    })
    .await??;

    Ok(PlateOcrEngine::new(
        Arc::new(detector),
        Arc::new(reader),
        engine_config,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
