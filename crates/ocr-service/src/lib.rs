pub mod api;
pub mod capability;
pub mod config;
pub mod pipeline;
pub mod state;

pub use config::ServiceConfig;
pub use pipeline::{EngineConfig, PipelineError, PlateOcrEngine, PlateOcrOutcome};
pub use state::OcrServiceState;
