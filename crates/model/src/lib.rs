//! Device parameter model for simulated endpoints.
//!
//! A device model is the full set of parameter paths and their metadata
//! describing one simulated endpoint's capability surface. It is built once
//! per worker process from a tabular (CSV) or pre-structured (JSON) source
//! file, validated, and then shared read-only by every worker in that
//! process.

mod error;
mod model;
mod parser;

pub use error::ModelError;
pub use model::{DeviceModel, ParameterEntry};
pub use parser::{parse_rows, ParameterRow};
