//! Error types for device model loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during device model parsing or construction.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("failed to read device model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tabular header does not name a `Parameter` column.
    #[error("tabular device model header is missing the Parameter column")]
    MissingParameterColumn,

    /// A data row has no parameter path.
    #[error("data row {row}: missing parameter path")]
    MissingPath { row: usize },

    /// The pre-structured model file is not valid JSON of the expected shape.
    #[error("invalid device model JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The model contains no parameters at all.
    #[error("device model contains no parameters")]
    Empty,

    /// An entry's object/leaf shape disagrees with its path form.
    #[error("parameter {path:?}: entry shape does not match object/leaf path form")]
    ShapeMismatch { path: String },
}
