//! Error types for the generator's non-real-time surfaces.

use thiserror::Error;

/// Result type for generator configuration operations.
pub type StimResult<T> = Result<T, StimError>;

/// Errors raised while building timesteps or exchanging parameters.
///
/// The per-timestep path never produces these.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StimError {
    /// Parameter name not present in the registry.
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    /// Numeric failure from the shared core.
    #[error(transparent)]
    Core(#[from] is_core::CoreError),
}
