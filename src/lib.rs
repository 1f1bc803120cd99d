//! Workspace meta-crate: re-exports the member crates so the integration
//! suites under `tests/` can reach every service surface from one place.

pub use common;
pub use ocr_service;
pub use telemetry;
