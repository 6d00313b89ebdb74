//! Domain errors raised while loading, validating and scoring the datasets.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("malformed input file {}: {message}", .path.display())]
    MalformedInput { path: PathBuf, message: String },

    #[error("{} is missing required column `{column}`", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("sub-score weights must sum to 1.0, got {0}")]
    InvalidWeights(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
