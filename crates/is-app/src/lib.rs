//! Shared application service layer for istep.
//!
//! This crate centralizes protocol file handling, offline host execution,
//! run caching and trace queries for the CLI.

pub mod error;
pub mod host_loop;
pub mod progress;
pub mod protocol_service;
pub mod query;
pub mod run_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use host_loop::{HostLoop, PauseWindow};
pub use progress::{RunProgressEvent, RunStage, SimulationProgress};
pub use protocol_service::{
    ParameterSummary, ProtocolSummary, load_protocol, save_protocol, summarize_protocol,
    validate_protocol,
};
pub use is_results::{RunManifest, TraceRecord};
pub use query::{RunSummary, extract_series, get_run_summary};
pub use run_service::{
    GENERATOR_VERSION, RunMode, RunOptions, RunRequest, RunResponse, RunTimingSummary, ensure_run,
    ensure_run_with_progress, list_runs, load_run, simulate,
};
