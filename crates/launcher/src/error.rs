//! Error types for fleet launching.

use fleetsim_model::ModelError;
use thiserror::Error;

/// Errors during launcher configuration or process spawning.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// The target URL does not use an accepted scheme.
    #[error("invalid target URL {url:?}: must start with http:// or https://")]
    InvalidUrl { url: String },

    /// A count option was zero.
    #[error("{name} must be a positive integer")]
    InvalidCount { name: &'static str },

    /// The serial range would not fit the fixed-width serial encoding.
    #[error("serial range {offset}..+{total} exceeds the {digits}-digit serial space")]
    SerialOverflow {
        offset: u64,
        total: u64,
        digits: usize,
    },

    /// A propagated configuration variable was absent.
    #[error("missing environment variable {name}")]
    MissingEnv { name: &'static str },

    /// A propagated configuration variable failed to parse.
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    /// Spawning a worker process failed.
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),

    /// Device model loading failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}
